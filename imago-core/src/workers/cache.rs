//! `CacheWorker` (§4.8): identical algorithm to [`crate::workers::thumbnail`]
//! against `CacheImages[]`.

use std::sync::Arc;

use imago_contracts::collection_store::CollectionStore;
use imago_contracts::image_codec::{ImageCodec, ImageFormat};
use imago_model::collection::CacheEmbedded;
use imago_model::messages::CacheGenerationMessage;
use tracing::{error, warn};

use crate::error::Result;
use crate::workers::atomic_write::write_atomic;
use crate::workers::outcome::ProcessOutcome;

pub struct CacheWorker {
    store: Arc<dyn CollectionStore>,
    codec: Arc<dyn ImageCodec>,
}

impl std::fmt::Debug for CacheWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheWorker").finish()
    }
}

impl CacheWorker {
    pub fn new(store: Arc<dyn CollectionStore>, codec: Arc<dyn ImageCodec>) -> Self {
        CacheWorker { store, codec }
    }

    pub async fn process(&self, message: &CacheGenerationMessage) -> Result<ProcessOutcome> {
        let Some(collection) = self.store.get(message.collection_id).await? else {
            return Ok(ProcessOutcome::AckFailed {
                reason: "collection not found".to_string(),
            });
        };

        if !message.force_regenerate && message.cache_path.exists() {
            if collection
                .find_cache(message.image_id, message.width, message.height)
                .is_some()
            {
                return Ok(ProcessOutcome::Ack);
            }
        }

        let source = match tokio::fs::read(&message.source_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %message.source_path.display(), error = %e, "source read failed");
                return Ok(ProcessOutcome::NackRequeue {
                    reason: e.to_string(),
                });
            }
        };

        let format = ImageFormat::from_extension(
            message
                .cache_path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("jpg"),
        )
        .unwrap_or(ImageFormat::Jpeg);

        let resized = match self
            .codec
            .resize(&source, message.width, message.height, format, message.quality)
            .await
        {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(image_id = %message.image_id, error = %e, "cache resize failed");
                return Ok(ProcessOutcome::AckFailed {
                    reason: e.to_string(),
                });
            }
        };

        if let Err(e) = write_atomic(&message.cache_path, &resized).await {
            warn!(path = %message.cache_path.display(), error = %e, "cache write failed");
            return Ok(ProcessOutcome::NackRequeue {
                reason: e.to_string(),
            });
        }

        self.store
            .atomic_add_cache(
                message.collection_id,
                CacheEmbedded {
                    image_id: message.image_id,
                    width: message.width,
                    height: message.height,
                    quality: message.quality,
                    cache_path: message.cache_path.to_string_lossy().into_owned(),
                    bytes: resized.len() as u64,
                    created_at: chrono::Utc::now(),
                },
                true,
            )
            .await?;

        Ok(ProcessOutcome::Ack)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use imago_contracts::collection_store::AppendOutcome;
    use imago_contracts::image_codec::MockImageCodec;
    use imago_model::collection::{Collection, CollectionType};
    use imago_model::ids::{CollectionId, ImageId};

    use super::*;
    use crate::test_support::StubCollectionStore;

    fn message(
        collection_id: CollectionId,
        image_id: ImageId,
        source_path: PathBuf,
        cache_path: PathBuf,
    ) -> CacheGenerationMessage {
        CacheGenerationMessage {
            collection_id,
            image_id,
            source_path,
            cache_path,
            width: 512,
            height: 512,
            quality: 85,
            force_regenerate: false,
        }
    }

    #[tokio::test]
    async fn missing_collection_acks_without_requeue() {
        let store = Arc::new(StubCollectionStore::default());
        let codec = MockImageCodec::new();
        let worker = CacheWorker::new(store, Arc::new(codec));

        let outcome = worker
            .process(&message(
                CollectionId::new(),
                ImageId::new(),
                PathBuf::from("/a.jpg"),
                PathBuf::from("/cache.jpg"),
            ))
            .await
            .unwrap();
        assert!(matches!(outcome, ProcessOutcome::AckFailed { .. }));
    }

    #[tokio::test]
    async fn generates_and_writes_cache_image() {
        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("a.jpg");
        let cache_path = dir.path().join("cache.jpg");
        tokio::fs::write(&source_path, b"source bytes").await.unwrap();

        let collection_id = CollectionId::new();
        let image_id = ImageId::new();
        let store = Arc::new(StubCollectionStore::default());
        *store.get_result.lock() = Some(Collection::new(
            "c".to_string(),
            PathBuf::from("/library/c"),
            CollectionType::Folder,
            None,
        ));
        *store.add_cache_result.lock() = Some(AppendOutcome {
            added: true,
            existing: CacheEmbedded {
                image_id,
                width: 512,
                height: 512,
                quality: 85,
                cache_path: cache_path.to_string_lossy().into_owned(),
                bytes: 5,
                created_at: chrono::Utc::now(),
            },
        });

        let mut codec = MockImageCodec::new();
        codec
            .expect_resize()
            .returning(|_, _, _, _, _| Ok(vec![1, 2, 3, 4, 5]));

        let worker = CacheWorker::new(store, Arc::new(codec));
        let outcome = worker
            .process(&message(collection_id, image_id, source_path, cache_path.clone()))
            .await
            .unwrap();
        assert!(matches!(outcome, ProcessOutcome::Ack));
        assert!(cache_path.exists());
    }

    #[tokio::test]
    async fn existing_cache_on_disk_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("a.jpg");
        let cache_path = dir.path().join("cache.jpg");
        tokio::fs::write(&source_path, b"source bytes").await.unwrap();
        tokio::fs::write(&cache_path, b"cached bytes").await.unwrap();

        let collection_id = CollectionId::new();
        let image_id = ImageId::new();
        let mut collection = Collection::new(
            "c".to_string(),
            PathBuf::from("/library/c"),
            CollectionType::Folder,
            None,
        );
        collection.cache_images.push(CacheEmbedded {
            image_id,
            width: 512,
            height: 512,
            quality: 85,
            cache_path: cache_path.to_string_lossy().into_owned(),
            bytes: 12,
            created_at: chrono::Utc::now(),
        });
        let store = Arc::new(StubCollectionStore::default());
        *store.get_result.lock() = Some(collection);

        // codec must never be invoked; a default MockImageCodec panics if it is.
        let codec = MockImageCodec::new();

        let worker = CacheWorker::new(store, Arc::new(codec));
        let outcome = worker
            .process(&message(collection_id, image_id, source_path, cache_path))
            .await
            .unwrap();
        assert!(matches!(outcome, ProcessOutcome::Ack));
    }
}
