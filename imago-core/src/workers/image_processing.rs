//! `image.processing` consumer (§4.6 step 3): probes the source file, calls
//! `AtomicAddImage`, and on `added = true` publishes one
//! `thumbnail.generation` and one `cache.generation` message using the
//! configured rendition defaults.

use std::path::PathBuf;
use std::sync::Arc;

use imago_config::ImageDefaults;
use imago_contracts::collection_store::CollectionStore;
use imago_contracts::image_codec::ImageCodec;
use imago_model::collection::ImageEmbedded;
use imago_model::ids::ImageId;
use imago_model::messages::{
    BusMessage, CacheGenerationMessage, ImageProcessingMessage, ThumbnailGenerationMessage,
};

use crate::error::Result;
use crate::workers::outcome::ProcessOutcome;
use imago_contracts::message_bus::MessageBus;

pub struct ImageProcessingWorker {
    store: Arc<dyn CollectionStore>,
    codec: Arc<dyn ImageCodec>,
    bus: Arc<dyn MessageBus>,
    defaults: ImageDefaults,
}

impl std::fmt::Debug for ImageProcessingWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageProcessingWorker").finish()
    }
}

impl ImageProcessingWorker {
    pub fn new(
        store: Arc<dyn CollectionStore>,
        codec: Arc<dyn ImageCodec>,
        bus: Arc<dyn MessageBus>,
        defaults: ImageDefaults,
    ) -> Self {
        ImageProcessingWorker {
            store,
            codec,
            bus,
            defaults,
        }
    }

    pub async fn process(&self, message: &ImageProcessingMessage) -> Result<ProcessOutcome> {
        let bytes = match tokio::fs::read(&message.source_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                return Ok(ProcessOutcome::NackRequeue {
                    reason: e.to_string(),
                })
            }
        };

        let probe = match self.codec.probe_bytes(&bytes).await {
            Ok(probe) => probe,
            Err(e) => {
                return Ok(ProcessOutcome::AckFailed {
                    reason: e.to_string(),
                })
            }
        };
        let metadata = self.codec.extract_metadata(&bytes).await.ok();

        let image_id = ImageId::new();
        let outcome = self
            .store
            .atomic_add_image(
                message.collection_id,
                ImageEmbedded {
                    id: image_id,
                    filename: message.filename.clone(),
                    relative_path: message.relative_path.clone(),
                    file_size: bytes.len() as u64,
                    width: probe.width,
                    height: probe.height,
                    format: probe.format.extension().to_string(),
                    created_at: chrono::Utc::now(),
                    metadata,
                    view_count: 0,
                },
            )
            .await?;

        if !outcome.added {
            return Ok(ProcessOutcome::Ack);
        }

        let image_id = outcome.existing.id;
        self.publish_renditions(message, image_id).await;
        Ok(ProcessOutcome::Ack)
    }

    async fn publish_renditions(&self, message: &ImageProcessingMessage, image_id: ImageId) {
        let thumbnail_path = rendition_path(
            "thumbnails",
            message.collection_id.to_string(),
            image_id,
            self.defaults.thumbnail_width,
            self.defaults.thumbnail_height,
        );
        let cache_path = rendition_path(
            "cache",
            message.collection_id.to_string(),
            image_id,
            self.defaults.thumbnail_width,
            self.defaults.thumbnail_height,
        );

        let thumbnail = BusMessage::ThumbnailGeneration(ThumbnailGenerationMessage {
            collection_id: message.collection_id,
            image_id,
            source_path: message.source_path.clone(),
            thumbnail_path,
            width: self.defaults.thumbnail_width,
            height: self.defaults.thumbnail_height,
            format: "jpg".to_string(),
            quality: self.defaults.thumbnail_quality,
            force_regenerate: message.force_regenerate,
        });
        let cache = BusMessage::CacheGeneration(CacheGenerationMessage {
            collection_id: message.collection_id,
            image_id,
            source_path: message.source_path.clone(),
            cache_path,
            width: self.defaults.thumbnail_width * 2,
            height: self.defaults.thumbnail_height * 2,
            quality: self.defaults.default_quality,
            force_regenerate: message.force_regenerate,
        });

        let _ = self.bus.publish(thumbnail).await;
        let _ = self.bus.publish(cache).await;
    }
}

fn rendition_path(
    root: &str,
    collection_id: String,
    image_id: ImageId,
    width: u32,
    height: u32,
) -> PathBuf {
    PathBuf::from(root)
        .join(collection_id)
        .join(format!("{image_id}_{width}x{height}.jpg"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use imago_contracts::collection_store::AppendOutcome;
    use imago_contracts::image_codec::{MockImageCodec, ProbeResult};
    use imago_contracts::message_bus::MockMessageBus;
    use imago_model::ids::CollectionId;

    use super::*;
    use crate::test_support::StubCollectionStore;

    fn defaults() -> ImageDefaults {
        ImageDefaults {
            default_quality: 85,
            thumbnail_width: 256,
            thumbnail_height: 256,
            thumbnail_quality: 90,
        }
    }

    fn message(collection_id: CollectionId, source_path: PathBuf) -> ImageProcessingMessage {
        ImageProcessingMessage {
            collection_id,
            source_path,
            filename: "a.jpg".to_string(),
            relative_path: "a.jpg".to_string(),
            force_regenerate: false,
        }
    }

    #[tokio::test]
    async fn new_image_publishes_thumbnail_and_cache_messages() {
        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("a.jpg");
        tokio::fs::write(&source_path, b"not a real image, codec is mocked")
            .await
            .unwrap();

        let collection_id = CollectionId::new();
        let image_id = ImageId::new();
        let store = Arc::new(StubCollectionStore::default());
        *store.add_image_result.lock() = Some(AppendOutcome {
            added: true,
            existing: ImageEmbedded {
                id: image_id,
                filename: "a.jpg".to_string(),
                relative_path: "a.jpg".to_string(),
                file_size: 10,
                width: 800,
                height: 600,
                format: "jpg".to_string(),
                created_at: chrono::Utc::now(),
                metadata: None,
                view_count: 0,
            },
        });

        let mut codec = MockImageCodec::new();
        codec.expect_probe_bytes().returning(|_| {
            Ok(ProbeResult {
                width: 800,
                height: 600,
                format: imago_contracts::image_codec::ImageFormat::Jpeg,
            })
        });
        codec
            .expect_extract_metadata()
            .returning(|_| Ok(Default::default()));

        let mut bus = MockMessageBus::new();
        bus.expect_publish()
            .times(2)
            .returning(|_| Ok(()));

        let worker = ImageProcessingWorker::new(store, Arc::new(codec), Arc::new(bus), defaults());
        let outcome = worker
            .process(&message(collection_id, source_path))
            .await
            .unwrap();
        assert!(matches!(outcome, ProcessOutcome::Ack));
    }

    #[tokio::test]
    async fn duplicate_image_does_not_publish_renditions() {
        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("a.jpg");
        tokio::fs::write(&source_path, b"bytes").await.unwrap();

        let collection_id = CollectionId::new();
        let store = Arc::new(StubCollectionStore::default());
        *store.add_image_result.lock() = Some(AppendOutcome {
            added: false,
            existing: ImageEmbedded {
                id: ImageId::new(),
                filename: "a.jpg".to_string(),
                relative_path: "a.jpg".to_string(),
                file_size: 10,
                width: 800,
                height: 600,
                format: "jpg".to_string(),
                created_at: chrono::Utc::now(),
                metadata: None,
                view_count: 0,
            },
        });

        let mut codec = MockImageCodec::new();
        codec.expect_probe_bytes().returning(|_| {
            Ok(ProbeResult {
                width: 800,
                height: 600,
                format: imago_contracts::image_codec::ImageFormat::Jpeg,
            })
        });
        codec
            .expect_extract_metadata()
            .returning(|_| Ok(Default::default()));

        // publish must never be called; a default MockMessageBus panics if it is.
        let bus = MockMessageBus::new();

        let worker = ImageProcessingWorker::new(store, Arc::new(codec), Arc::new(bus), defaults());
        let outcome = worker
            .process(&message(collection_id, source_path))
            .await
            .unwrap();
        assert!(matches!(outcome, ProcessOutcome::Ack));
    }

    #[tokio::test]
    async fn missing_source_file_requeues() {
        let collection_id = CollectionId::new();
        let store = Arc::new(StubCollectionStore::default());
        let codec = MockImageCodec::new();
        let bus = MockMessageBus::new();

        let worker = ImageProcessingWorker::new(store, Arc::new(codec), Arc::new(bus), defaults());
        let outcome = worker
            .process(&message(collection_id, PathBuf::from("/nonexistent/a.jpg")))
            .await
            .unwrap();
        assert!(matches!(outcome, ProcessOutcome::NackRequeue { .. }));
    }
}
