//! Exchange/queue declaration (§4.5) — a single `setup` responsibility,
//! safe to invoke repeatedly. Every queue binds to `imago.exchange` under
//! its routing key and dead-letters into `imago.dlx` → `dlq`.

use async_trait::async_trait;
use imago_contracts::message_bus::{BrokerTopology, QueueName};
use lapin::options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions};
use lapin::types::{AMQPValue, FieldTable};
use lapin::{Channel, ExchangeKind};

use crate::error::{lapin_err, Result};

pub const EXCHANGE: &str = "imago.exchange";
pub const DLX: &str = "imago.dlx";

const MAX_QUEUE_LENGTH: i64 = 100_000;

pub struct LapinTopology {
    channel: Channel,
    message_ttl_ms: u64,
}

impl std::fmt::Debug for LapinTopology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LapinTopology").finish()
    }
}

impl LapinTopology {
    pub fn new(channel: Channel, message_ttl_ms: u64) -> Self {
        LapinTopology {
            channel,
            message_ttl_ms,
        }
    }

    fn queue_args(&self, routing_key: &str) -> FieldTable {
        let mut args = FieldTable::default();
        args.insert("x-max-length".into(), AMQPValue::LongLongInt(MAX_QUEUE_LENGTH));
        args.insert(
            "x-message-ttl".into(),
            AMQPValue::LongLongInt(self.message_ttl_ms as i64),
        );
        if !routing_key.is_empty() {
            args.insert(
                "x-dead-letter-exchange".into(),
                AMQPValue::LongString(DLX.into()),
            );
        }
        args
    }
}

#[async_trait]
impl BrokerTopology for LapinTopology {
    async fn declare_topology(&self) -> Result<()> {
        self.channel
            .exchange_declare(
                EXCHANGE,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(lapin_err)?;

        self.channel
            .exchange_declare(
                DLX,
                ExchangeKind::Fanout,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(lapin_err)?;

        for queue in QueueName::ALL {
            let args = if matches!(queue, QueueName::Dlq) {
                FieldTable::default()
            } else {
                self.queue_args(queue.routing_key())
            };

            self.channel
                .queue_declare(
                    queue.queue_name(),
                    QueueDeclareOptions {
                        durable: true,
                        ..Default::default()
                    },
                    args,
                )
                .await
                .map_err(lapin_err)?;

            let exchange = if matches!(queue, QueueName::Dlq) {
                DLX
            } else {
                EXCHANGE
            };
            self.channel
                .queue_bind(
                    queue.queue_name(),
                    exchange,
                    queue.routing_key(),
                    QueueBindOptions::default(),
                    FieldTable::default(),
                )
                .await
                .map_err(lapin_err)?;
        }

        Ok(())
    }
}
