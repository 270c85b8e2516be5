//! `ScanOrchestrator` (§4.6): turns a `ScanRequest` into per-collection
//! enumeration and `image.processing` publishes, with bounded exponential
//! backoff around every broker publish.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use imago_contracts::collection_store::CollectionStore;
use imago_contracts::message_bus::MessageBus;
use imago_contracts::scanner::FileScanner;
use imago_model::filter::{CollectionFilter, Pagination};
use imago_model::ids::{CollectionId, LibraryId};
use imago_model::messages::{BusMessage, CollectionScanMessage, ImageProcessingMessage};
use imago_model::navigation::{SortDirection, SortField};
use imago_model::scan::{BulkResult, ScanOutcome, ScanRequest};
use tracing::warn;

use crate::error::Result;

const MAX_PUBLISH_RETRIES: u32 = 5;
const BASE_BACKOFF_MS: u64 = 100;

pub struct ScanOrchestrator {
    store: Arc<dyn CollectionStore>,
    scanner: Arc<dyn FileScanner>,
    bus: Arc<dyn MessageBus>,
}

impl std::fmt::Debug for ScanOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanOrchestrator").finish()
    }
}

impl ScanOrchestrator {
    pub fn new(
        store: Arc<dyn CollectionStore>,
        scanner: Arc<dyn FileScanner>,
        bus: Arc<dyn MessageBus>,
    ) -> Self {
        ScanOrchestrator {
            store,
            scanner,
            bus,
        }
    }

    /// Entry point for a `collection.scan` / `library_scan_queue` consumer.
    pub async fn handle(&self, request: ScanRequest) -> Result<BulkResult> {
        let targets = self.resolve_targets(&request).await?;
        let mut result = BulkResult::default();
        for collection_id in targets {
            let outcome = self.scan_one(collection_id, &request).await;
            result.record(&outcome);
        }
        Ok(result)
    }

    async fn resolve_targets(&self, request: &ScanRequest) -> Result<Vec<CollectionId>> {
        if let Some(collection_id) = request.collection_id {
            return Ok(vec![collection_id]);
        }
        let Some(library_id) = request.library_id else {
            return Ok(Vec::new());
        };
        self.collections_in_library(library_id).await
    }

    async fn collections_in_library(&self, library_id: LibraryId) -> Result<Vec<CollectionId>> {
        let filter = CollectionFilter {
            library_id: Some(library_id),
            collection_type: None,
            include_deleted: false,
        };
        let pagination = Pagination {
            page: 1,
            page_size: u64::MAX,
            sort_by: SortField::CreatedAt,
            sort_direction: SortDirection::Asc,
        };
        let mut stream = self.store.query(filter, pagination);
        let mut ids = Vec::new();
        while let Some(item) = stream.next().await {
            ids.push(item?.id);
        }
        Ok(ids)
    }

    async fn scan_one(&self, collection_id: CollectionId, request: &ScanRequest) -> ScanOutcome {
        let collection = match self.store.get(collection_id).await {
            Ok(Some(c)) => c,
            Ok(None) => {
                return ScanOutcome::Failed {
                    path: collection_id.to_string(),
                    message: "collection not found".to_string(),
                }
            }
            Err(e) => {
                return ScanOutcome::Failed {
                    path: collection_id.to_string(),
                    message: e.to_string(),
                }
            }
        };

        if !collection.images.is_empty() && !request.overwrite_existing {
            return ScanOutcome::Skipped { collection_id };
        }

        let descriptors = match collection.collection_type {
            imago_model::collection::CollectionType::Folder => {
                self.scanner.scan_folder(&collection.path).await
            }
            archive_type => {
                self.scanner
                    .scan_archive(&collection.path, archive_type)
                    .await
            }
        };

        let descriptors = match descriptors {
            Ok(d) => d,
            Err(e) => {
                return ScanOutcome::Failed {
                    path: collection.path.display().to_string(),
                    message: e.to_string(),
                }
            }
        };

        let mut published = 0u64;
        for descriptor in &descriptors {
            let message = BusMessage::ImageProcessing(ImageProcessingMessage {
                collection_id,
                source_path: descriptor.source_path.clone(),
                filename: descriptor.filename.clone(),
                relative_path: descriptor.relative_path.clone(),
                force_regenerate: request.force_regenerate,
            });
            if let Err(e) = self.publish_with_backoff(message).await {
                warn!(
                    collection_id = %collection_id,
                    error = %e,
                    "giving up publishing image.processing after retries"
                );
                continue;
            }
            published += 1;
        }

        ScanOutcome::Scanned {
            collection_id,
            images_found: published,
        }
    }

    /// Publishes `collection.scan` for a single collection; used by API
    /// handlers that want to enqueue rather than scan inline.
    pub async fn enqueue(&self, request: ScanRequest) -> Result<()> {
        if let Some(collection_id) = request.collection_id {
            let message = BusMessage::CollectionScan(CollectionScanMessage {
                collection_id,
                overwrite_existing: request.overwrite_existing,
                force_regenerate: request.force_regenerate,
            });
            self.publish_with_backoff(message).await?;
        }
        Ok(())
    }

    async fn publish_with_backoff(&self, message: BusMessage) -> Result<()> {
        let mut attempt = 0;
        loop {
            match self.bus.publish(message.clone()).await {
                Ok(()) => return Ok(()),
                Err(err) if attempt + 1 >= MAX_PUBLISH_RETRIES => return Err(err),
                Err(err) => {
                    warn!(attempt, error = %err, "retrying publish after backoff");
                    let backoff = BASE_BACKOFF_MS * 2u64.pow(attempt);
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use imago_contracts::message_bus::MockMessageBus;
    use imago_contracts::scanner::{ImageDescriptor, MockFileScanner};
    use imago_model::collection::{Collection, CollectionType};
    use imago_model::ids::LibraryId;

    use super::*;
    use crate::test_support::StubCollectionStore;

    fn descriptor(relative_path: &str) -> ImageDescriptor {
        ImageDescriptor {
            source_path: PathBuf::from(relative_path),
            filename: relative_path.to_string(),
            relative_path: relative_path.to_string(),
            file_size: 10,
            width: 100,
            height: 100,
            format: "jpg".to_string(),
            metadata: None,
        }
    }

    #[tokio::test]
    async fn handle_single_collection_publishes_one_message_per_descriptor() {
        let collection = Collection::new(
            "c".to_string(),
            PathBuf::from("/library/c"),
            CollectionType::Folder,
            None,
        );
        let collection_id = collection.id;
        let store = Arc::new(StubCollectionStore::default());
        *store.get_result.lock() = Some(collection);

        let mut scanner = MockFileScanner::new();
        scanner
            .expect_scan_folder()
            .returning(|_| Ok(vec![descriptor("a.jpg"), descriptor("b.jpg")]));

        let mut bus = MockMessageBus::new();
        bus.expect_publish().times(2).returning(|_| Ok(()));

        let orchestrator = ScanOrchestrator::new(store, Arc::new(scanner), Arc::new(bus));
        let result = orchestrator
            .handle(ScanRequest {
                collection_id: Some(collection_id),
                library_id: None,
                overwrite_existing: false,
                force_regenerate: false,
            })
            .await
            .unwrap();

        assert_eq!(result.total, 1);
        assert_eq!(result.succeeded, 1);
        assert!(result.failed.is_empty());
    }

    #[tokio::test]
    async fn handle_skips_already_populated_collection_without_overwrite() {
        let mut collection = Collection::new(
            "c".to_string(),
            PathBuf::from("/library/c"),
            CollectionType::Folder,
            None,
        );
        collection.images.push(ImageEmbedded {
            id: imago_model::ids::ImageId::new(),
            filename: "a.jpg".to_string(),
            relative_path: "a.jpg".to_string(),
            file_size: 10,
            width: 100,
            height: 100,
            format: "jpg".to_string(),
            created_at: chrono::Utc::now(),
            metadata: None,
            view_count: 0,
        });
        let collection_id = collection.id;
        let store = Arc::new(StubCollectionStore::default());
        *store.get_result.lock() = Some(collection);

        // neither must be called; default mocks panic on an unexpected call.
        let scanner = MockFileScanner::new();
        let bus = MockMessageBus::new();

        let orchestrator = ScanOrchestrator::new(store, Arc::new(scanner), Arc::new(bus));
        let result = orchestrator
            .handle(ScanRequest {
                collection_id: Some(collection_id),
                library_id: None,
                overwrite_existing: false,
                force_regenerate: false,
            })
            .await
            .unwrap();

        assert_eq!(result.total, 1);
        assert_eq!(result.succeeded, 1);
    }

    #[tokio::test]
    async fn handle_for_library_scans_every_collection_returned_by_query() {
        let library_id = LibraryId::new();
        let collection_a = Collection::new(
            "a".to_string(),
            PathBuf::from("/library/a"),
            CollectionType::Folder,
            Some(library_id),
        );
        let collection_b = Collection::new(
            "b".to_string(),
            PathBuf::from("/library/b"),
            CollectionType::Folder,
            Some(library_id),
        );
        let store = Arc::new(StubCollectionStore::default());
        *store.query_results.lock() = vec![collection_a.clone(), collection_b.clone()];
        *store.get_result.lock() = Some(collection_a);

        let mut scanner = MockFileScanner::new();
        scanner.expect_scan_folder().returning(|_| Ok(vec![]));

        let bus = MockMessageBus::new();

        let orchestrator = ScanOrchestrator::new(store, Arc::new(scanner), Arc::new(bus));
        let result = orchestrator
            .handle(ScanRequest {
                collection_id: None,
                library_id: Some(library_id),
                overwrite_existing: false,
                force_regenerate: false,
            })
            .await
            .unwrap();

        // StubCollectionStore::get always returns collection_a, so both
        // resolved targets are "scanned" against the same stand-in document.
        assert_eq!(result.total, 2);
        assert_eq!(result.succeeded, 2);
    }
}
