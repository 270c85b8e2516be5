use std::path::PathBuf;

use chrono::{DateTime, Utc};
use crate::ids::{CollectionId, ImageId};

/// Stable header fields every broker message carries (§6, wire format):
/// `id`, `messageType`, `timestamp`, `correlationId`, plus the payload's own
/// fields flattened alongside them.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MessageEnvelope<T> {
    pub id: String,
    pub message_type: String,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<String>,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub payload: T,
}

impl<T> MessageEnvelope<T> {
    pub fn new(message_type: impl Into<String>, payload: T) -> Self {
        MessageEnvelope {
            id: uuid::Uuid::new_v4().to_string(),
            message_type: message_type.into(),
            timestamp: Utc::now(),
            correlation_id: None,
            payload,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }
}

/// Published once per discovered file by the `ScanOrchestrator` onto
/// `image.processing` (§4.5, §4.6 step 2b).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImageProcessingMessage {
    pub collection_id: CollectionId,
    pub source_path: PathBuf,
    pub filename: String,
    pub relative_path: String,
    pub force_regenerate: bool,
}

/// Published by the image-processing consumer once `AtomicAddImage` reports
/// `added = true` (§4.6 step 3), once per configured thumbnail rendition.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThumbnailGenerationMessage {
    pub collection_id: CollectionId,
    pub image_id: ImageId,
    pub source_path: PathBuf,
    pub thumbnail_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub quality: u8,
    pub force_regenerate: bool,
}

/// Published alongside [`ThumbnailGenerationMessage`] for each configured
/// cache tier (§4.6 step 3).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CacheGenerationMessage {
    pub collection_id: CollectionId,
    pub image_id: ImageId,
    pub source_path: PathBuf,
    pub cache_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub force_regenerate: bool,
}

/// Published onto `collection.scan` to kick off enumeration for a single
/// collection (§4.5, §4.6 step 1).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollectionScanMessage {
    pub collection_id: CollectionId,
    pub overwrite_existing: bool,
    pub force_regenerate: bool,
}

/// Published onto `library_scan_queue` by the scheduler's `library-scan`
/// handler (§4.10); workers expand this into one `CollectionScanMessage`
/// per contained collection.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LibraryScanMessage {
    pub library_id: crate::ids::LibraryId,
}

/// A durable marker written to `collection.creation` whenever
/// `CollectionStore::Create` succeeds, so out-of-process listeners (e.g. the
/// navigation index's write-through path) can react without polling.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollectionCreatedMessage {
    pub collection_id: CollectionId,
}

/// Tagged union over every message body the bus carries, keyed on
/// `messageType`. Unknown tags are routed straight to the dead-letter queue
/// by the setup/dispatch layer rather than causing a deserialization panic
/// (§9, "dynamic message deserialization by name").
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "messageType"))]
pub enum BusMessage {
    #[cfg_attr(feature = "serde", serde(rename = "collection.scan"))]
    CollectionScan(CollectionScanMessage),
    #[cfg_attr(feature = "serde", serde(rename = "image.processing"))]
    ImageProcessing(ImageProcessingMessage),
    #[cfg_attr(feature = "serde", serde(rename = "thumbnail.generation"))]
    ThumbnailGeneration(ThumbnailGenerationMessage),
    #[cfg_attr(feature = "serde", serde(rename = "cache.generation"))]
    CacheGeneration(CacheGenerationMessage),
    #[cfg_attr(feature = "serde", serde(rename = "collection.creation"))]
    CollectionCreated(CollectionCreatedMessage),
    #[cfg_attr(feature = "serde", serde(rename = "library_scan_queue"))]
    LibraryScan(LibraryScanMessage),
}

impl BusMessage {
    /// The routing key this message is published under (§4.5).
    pub fn routing_key(&self) -> &'static str {
        match self {
            BusMessage::CollectionScan(_) => "collection.scan",
            BusMessage::ImageProcessing(_) => "image.processing",
            BusMessage::ThumbnailGeneration(_) => "thumbnail.generation",
            BusMessage::CacheGeneration(_) => "cache.generation",
            BusMessage::CollectionCreated(_) => "collection.creation",
            BusMessage::LibraryScan(_) => "library_scan_queue",
        }
    }
}
