//! `ThumbnailWorker` (§4.7): idempotent lookup-then-generate-then-atomic-write
//! against `Thumbnails[]`.

use std::path::Path;
use std::sync::Arc;

use imago_contracts::collection_store::CollectionStore;
use imago_contracts::image_codec::{ImageCodec, ImageFormat};
use imago_model::collection::ThumbnailEmbedded;
use imago_model::messages::ThumbnailGenerationMessage;
use tracing::{error, warn};

use crate::error::Result;
use crate::workers::atomic_write::write_atomic;
use crate::workers::outcome::ProcessOutcome;

pub struct ThumbnailWorker {
    store: Arc<dyn CollectionStore>,
    codec: Arc<dyn ImageCodec>,
}

impl std::fmt::Debug for ThumbnailWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThumbnailWorker").finish()
    }
}

impl ThumbnailWorker {
    pub fn new(store: Arc<dyn CollectionStore>, codec: Arc<dyn ImageCodec>) -> Self {
        ThumbnailWorker { store, codec }
    }

    pub async fn process(&self, message: &ThumbnailGenerationMessage) -> Result<ProcessOutcome> {
        let Some(collection) = self.store.get(message.collection_id).await? else {
            return Ok(ProcessOutcome::AckFailed {
                reason: "collection not found".to_string(),
            });
        };

        let existing_on_disk = message.thumbnail_path.exists();
        if !message.force_regenerate {
            if let Some(existing) =
                collection.find_thumbnail(message.image_id, message.width, message.height)
            {
                if existing_on_disk
                    && Path::new(&existing.thumbnail_path) == message.thumbnail_path
                {
                    return Ok(ProcessOutcome::Ack);
                }
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

        let format = ImageFormat::from_extension(&message.format).unwrap_or(ImageFormat::Jpeg);
        let thumbnail = match self
            .codec
            .thumbnail(&source, message.width, message.height, format, message.quality)
            .await
        {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(image_id = %message.image_id, error = %e, "thumbnail decode failed");
                return Ok(ProcessOutcome::AckFailed {
                    reason: e.to_string(),
                });
            }
        };

        if let Err(e) = write_atomic(&message.thumbnail_path, &thumbnail).await {
            warn!(path = %message.thumbnail_path.display(), error = %e, "thumbnail write failed");
            return Ok(ProcessOutcome::NackRequeue {
                reason: e.to_string(),
            });
        }

        let (width, height) = actual_dimensions(&thumbnail, &self.codec, message).await;

        self.store
            .atomic_add_thumbnail(
                message.collection_id,
                ThumbnailEmbedded {
                    image_id: message.image_id,
                    width,
                    height,
                    thumbnail_path: message.thumbnail_path.to_string_lossy().into_owned(),
                    bytes: thumbnail.len() as u64,
                    created_at: chrono::Utc::now(),
                },
                existing_file_present(&message.thumbnail_path),
            )
            .await?;

        Ok(ProcessOutcome::Ack)
    }
}

fn existing_file_present(path: &Path) -> bool {
    path.exists()
}

async fn actual_dimensions(
    bytes: &[u8],
    codec: &Arc<dyn ImageCodec>,
    message: &ThumbnailGenerationMessage,
) -> (u32, u32) {
    match codec.probe_bytes(bytes).await {
        Ok(probe) => (probe.width, probe.height),
        Err(_) => (message.width, message.height),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use imago_contracts::collection_store::AppendOutcome;
    use imago_contracts::image_codec::{MockImageCodec, ProbeResult};
    use imago_model::collection::{Collection, CollectionType};
    use imago_model::ids::{CollectionId, ImageId};

    use super::*;
    use crate::test_support::StubCollectionStore;

    fn message(
        collection_id: CollectionId,
        image_id: ImageId,
        source_path: PathBuf,
        thumbnail_path: PathBuf,
    ) -> ThumbnailGenerationMessage {
        ThumbnailGenerationMessage {
            collection_id,
            image_id,
            source_path,
            thumbnail_path,
            width: 256,
            height: 256,
            format: "jpg".to_string(),
            quality: 90,
            force_regenerate: false,
        }
    }

    #[tokio::test]
    async fn missing_collection_acks_without_requeue() {
        let store = Arc::new(StubCollectionStore::default());
        let codec = MockImageCodec::new();
        let worker = ThumbnailWorker::new(store, Arc::new(codec));

        let outcome = worker
            .process(&message(
                CollectionId::new(),
                ImageId::new(),
                PathBuf::from("/a.jpg"),
                PathBuf::from("/thumb.jpg"),
            ))
            .await
            .unwrap();
        assert!(matches!(outcome, ProcessOutcome::AckFailed { .. }));
    }

    #[tokio::test]
    async fn generates_and_writes_thumbnail() {
        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("a.jpg");
        let thumbnail_path = dir.path().join("thumb.jpg");
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
        *store.add_thumbnail_result.lock() = Some(AppendOutcome {
            added: true,
            existing: ThumbnailEmbedded {
                image_id,
                width: 256,
                height: 256,
                thumbnail_path: thumbnail_path.to_string_lossy().into_owned(),
                bytes: 5,
                created_at: chrono::Utc::now(),
            },
        });

        let mut codec = MockImageCodec::new();
        codec
            .expect_thumbnail()
            .returning(|_, _, _, _, _| Ok(vec![1, 2, 3, 4, 5]));
        codec.expect_probe_bytes().returning(|_| {
            Ok(ProbeResult {
                width: 256,
                height: 256,
                format: imago_contracts::image_codec::ImageFormat::Jpeg,
            })
        });

        let worker = ThumbnailWorker::new(store, Arc::new(codec));
        let outcome = worker
            .process(&message(collection_id, image_id, source_path, thumbnail_path.clone()))
            .await
            .unwrap();
        assert!(matches!(outcome, ProcessOutcome::Ack));
        assert!(thumbnail_path.exists());
    }

    #[tokio::test]
    async fn existing_thumbnail_on_disk_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("a.jpg");
        let thumbnail_path = dir.path().join("thumb.jpg");
        tokio::fs::write(&source_path, b"source bytes").await.unwrap();
        tokio::fs::write(&thumbnail_path, b"cached thumb").await.unwrap();

        let collection_id = CollectionId::new();
        let image_id = ImageId::new();
        let mut collection = Collection::new(
            "c".to_string(),
            PathBuf::from("/library/c"),
            CollectionType::Folder,
            None,
        );
        collection.thumbnails.push(ThumbnailEmbedded {
            image_id,
            width: 256,
            height: 256,
            thumbnail_path: thumbnail_path.to_string_lossy().into_owned(),
            bytes: 12,
            created_at: chrono::Utc::now(),
        });
        let store = Arc::new(StubCollectionStore::default());
        *store.get_result.lock() = Some(collection);

        // codec must never be invoked; a default MockImageCodec panics if it is.
        let codec = MockImageCodec::new();

        let worker = ThumbnailWorker::new(store, Arc::new(codec));
        let outcome = worker
            .process(&message(collection_id, image_id, source_path, thumbnail_path))
            .await
            .unwrap();
        assert!(matches!(outcome, ProcessOutcome::Ack));
    }
}
