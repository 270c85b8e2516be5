//! `LapinMessageBus`: the publishing half of §4.5. Every message is
//! persistent, carries a stable `messageId` and `{MessageType, Timestamp}`
//! headers, and gets a per-message TTL so the broker's dead-letter
//! exchange reclaims anything a consumer never acks.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::try_join_all;
use imago_contracts::message_bus::{MessageBus, Priority};
use imago_model::messages::BusMessage;
use lapin::options::BasicPublishOptions;
use lapin::types::{AMQPValue, FieldTable};
use lapin::{BasicProperties, Channel};

use crate::bus::topology::EXCHANGE;
use crate::error::{lapin_err, CoreError, Result};

pub struct LapinMessageBus {
    channel: Channel,
    default_ttl: Duration,
}

impl std::fmt::Debug for LapinMessageBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LapinMessageBus").finish()
    }
}

impl LapinMessageBus {
    pub fn new(channel: Channel, default_ttl: Duration) -> Self {
        LapinMessageBus {
            channel,
            default_ttl,
        }
    }

    async fn publish_with(
        &self,
        message: &BusMessage,
        ttl: Duration,
        priority: Option<Priority>,
    ) -> Result<()> {
        let body = serde_json::to_vec(message)
            .map_err(|e| CoreError::Internal(format!("message encode failed: {e}")))?;
        let message_id = uuid::Uuid::new_v4().to_string();

        let mut headers = FieldTable::default();
        headers.insert(
            "MessageType".into(),
            AMQPValue::LongString(message.routing_key().into()),
        );
        headers.insert(
            "Timestamp".into(),
            AMQPValue::LongString(chrono::Utc::now().to_rfc3339().into()),
        );

        let mut properties = BasicProperties::default()
            .with_delivery_mode(2) // persistent
            .with_message_id(message_id.into())
            .with_content_type("application/json".into())
            .with_expiration(ttl.as_millis().to_string().into())
            .with_headers(headers);
        if let Some(priority) = priority {
            properties = properties.with_priority(priority.as_header_value());
        }

        self.channel
            .basic_publish(
                EXCHANGE,
                message.routing_key(),
                BasicPublishOptions::default(),
                &body,
                properties,
            )
            .await
            .map_err(lapin_err)?
            .await
            .map_err(lapin_err)?;
        Ok(())
    }
}

#[async_trait]
impl MessageBus for LapinMessageBus {
    async fn publish(&self, message: BusMessage) -> Result<()> {
        self.publish_with(&message, self.default_ttl, None).await
    }

    async fn publish_batch(&self, messages: Vec<BusMessage>) -> Result<()> {
        let futures = messages
            .iter()
            .map(|message| self.publish_with(message, self.default_ttl, None));
        try_join_all(futures).await?;
        Ok(())
    }

    async fn publish_delayed(&self, message: BusMessage, delay: Duration) -> Result<()> {
        self.publish_with(&message, delay, None).await
    }

    async fn publish_with_priority(&self, message: BusMessage, priority: Priority) -> Result<()> {
        self.publish_with(&message, self.default_ttl, Some(priority))
            .await
    }
}
