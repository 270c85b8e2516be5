use std::path::{Path, PathBuf};

use async_trait::async_trait;
use imago_model::collection::{CollectionType, ImageMetadata};

use crate::error::Result;

/// One file discovered by a scan, carrying everything `AtomicAddImage`
/// needs (§4.3).
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDescriptor {
    pub source_path: PathBuf,
    pub filename: String,
    pub relative_path: String,
    pub file_size: u64,
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub metadata: Option<ImageMetadata>,
}

/// Walks folders or archives, producing [`ImageDescriptor`]s. Unreadable
/// entries and corrupted images are skipped with a warning, never fatal for
/// the batch (§4.3).
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait FileScanner: Send + Sync {
    /// Depth-first walk of a folder, filtered to supported extensions.
    async fn scan_folder(&self, root: &Path) -> Result<Vec<ImageDescriptor>>;

    /// Streaming walk of an archive via `ArchiveReader`.
    async fn scan_archive(
        &self,
        archive_path: &Path,
        collection_type: CollectionType,
    ) -> Result<Vec<ImageDescriptor>>;

    /// Classify `path` as folder vs. archive extension.
    fn detect_type(&self, path: &Path) -> Option<CollectionType> {
        CollectionType::detect(path)
    }

    /// Whether `path` is a usable scan root (exists, readable, non-empty
    /// extension for archive forms).
    fn is_valid_collection_path(&self, path: &Path) -> bool;
}
