use std::time::Duration;

use async_trait::async_trait;
use imago_model::messages::BusMessage;

use crate::error::Result;

/// Queues declared by the `setup` responsibility (§4.5, §6). Routing keys
/// match [`imago_model::messages::BusMessage::routing_key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueName {
    CollectionScan,
    ImageProcessing,
    ThumbnailGeneration,
    CacheGeneration,
    CollectionCreation,
    BulkOperation,
    LibraryScan,
    Dlq,
}

impl QueueName {
    pub const ALL: [QueueName; 8] = [
        QueueName::CollectionScan,
        QueueName::ImageProcessing,
        QueueName::ThumbnailGeneration,
        QueueName::CacheGeneration,
        QueueName::CollectionCreation,
        QueueName::BulkOperation,
        QueueName::LibraryScan,
        QueueName::Dlq,
    ];

    pub fn queue_name(&self) -> &'static str {
        match self {
            QueueName::CollectionScan => "collection_scan",
            QueueName::ImageProcessing => "image_processing",
            QueueName::ThumbnailGeneration => "thumbnail_generation",
            QueueName::CacheGeneration => "cache_generation",
            QueueName::CollectionCreation => "collection_creation",
            QueueName::BulkOperation => "bulk_operation",
            QueueName::LibraryScan => "library_scan",
            QueueName::Dlq => "dlq",
        }
    }

    pub fn routing_key(&self) -> &'static str {
        match self {
            QueueName::CollectionScan => "collection.scan",
            QueueName::ImageProcessing => "image.processing",
            QueueName::ThumbnailGeneration => "thumbnail.generation",
            QueueName::CacheGeneration => "cache.generation",
            QueueName::CollectionCreation => "collection.creation",
            QueueName::BulkOperation => "bulk.operation",
            QueueName::LibraryScan => "library_scan_queue",
            QueueName::Dlq => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl Priority {
    pub fn as_header_value(&self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Normal => 5,
            Priority::High => 9,
        }
    }
}

/// Durable broker binding: topic exchange, per-queue DLX/TTL, batch publish
/// (§4.5). Implementations own per-message TTL, stable `messageId`, and
/// header propagation; callers only deal in [`BusMessage`]s.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn publish(&self, message: BusMessage) -> Result<()>;

    /// Fans out concurrently; completion is only observed after every
    /// publish ack.
    async fn publish_batch(&self, messages: Vec<BusMessage>) -> Result<()>;

    /// Implemented via per-message TTL.
    async fn publish_delayed(
        &self,
        message: BusMessage,
        delay: Duration,
    ) -> Result<()>;

    async fn publish_with_priority(
        &self,
        message: BusMessage,
        priority: Priority,
    ) -> Result<()>;
}

/// Declares exchanges/queues with canonical arguments
/// (`x-max-length`, `x-dead-letter-exchange`, `x-message-ttl`). Owned by a
/// single `setup` responsibility; safe to invoke repeatedly (§4.5, §6).
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait BrokerTopology: Send + Sync {
    async fn declare_topology(&self) -> Result<()>;
}
