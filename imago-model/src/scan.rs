use crate::ids::{CollectionId, LibraryId};

/// A scan request originating from the API or the scheduler (§4.6).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanRequest {
    pub collection_id: Option<CollectionId>,
    pub library_id: Option<LibraryId>,
    pub overwrite_existing: bool,
    pub force_regenerate: bool,
}

impl ScanRequest {
    pub fn for_collection(collection_id: CollectionId) -> Self {
        ScanRequest {
            collection_id: Some(collection_id),
            library_id: None,
            overwrite_existing: false,
            force_regenerate: false,
        }
    }

    pub fn for_library(library_id: LibraryId) -> Self {
        ScanRequest {
            collection_id: None,
            library_id: Some(library_id),
            overwrite_existing: false,
            force_regenerate: false,
        }
    }
}

/// Per-collection outcome of running a [`ScanRequest`] (§7, scenario 4).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "status"))]
pub enum ScanOutcome {
    Scanned { collection_id: CollectionId, images_found: u64 },
    Skipped { collection_id: CollectionId },
    Failed { path: String, message: String },
}

/// Partial-success envelope returned by bulk scan/scheduler operations
/// (§7): `total, succeeded, failed[], errors[]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BulkResult {
    pub total: u64,
    pub succeeded: u64,
    pub failed: Vec<String>,
    pub errors: Vec<String>,
}

impl BulkResult {
    pub fn record(&mut self, outcome: &ScanOutcome) {
        self.total += 1;
        match outcome {
            ScanOutcome::Scanned { .. } | ScanOutcome::Skipped { .. } => {
                self.succeeded += 1;
            }
            ScanOutcome::Failed { path, message } => {
                self.failed.push(path.clone());
                self.errors.push(message.clone());
            }
        }
    }
}
