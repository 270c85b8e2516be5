//! `ArchiveReader` implementations for every archive `CollectionType` (§4.2).

mod rar_reader;
mod sevenz_reader;
mod tar_reader;
mod zip_reader;

pub use rar_reader::RarArchiveReader;
pub use sevenz_reader::SevenZipArchiveReader;
pub use tar_reader::TarArchiveReader;
pub use zip_reader::ZipArchiveReader;

use std::path::Path;

use async_trait::async_trait;
use imago_contracts::archive::{ArchiveEntry, ArchiveReader};

use crate::error::{CoreError, Result};

/// Dispatches to the first reader that recognizes the archive's extension.
/// This is the `ArchiveReader` a [`crate::scan::WalkingFileScanner`] actually
/// holds; the per-format readers above stay independently testable.
pub struct CompositeArchiveReader {
    readers: Vec<Box<dyn ArchiveReader>>,
}

impl std::fmt::Debug for CompositeArchiveReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeArchiveReader")
            .field("readers", &self.readers.len())
            .finish()
    }
}

impl Default for CompositeArchiveReader {
    fn default() -> Self {
        CompositeArchiveReader {
            readers: vec![
                Box::new(ZipArchiveReader::new()),
                Box::new(TarArchiveReader::new()),
                Box::new(SevenZipArchiveReader::new()),
                Box::new(RarArchiveReader::new()),
            ],
        }
    }
}

impl CompositeArchiveReader {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArchiveReader for CompositeArchiveReader {
    async fn entries(&self, archive_path: &Path) -> Result<Vec<ArchiveEntry>> {
        let reader = self
            .readers
            .iter()
            .find(|r| r.can_read(archive_path))
            .ok_or_else(|| {
                CoreError::UnsupportedFormat(archive_path.display().to_string())
            })?;
        reader.entries(archive_path).await
    }

    fn can_read(&self, archive_path: &Path) -> bool {
        self.readers.iter().any(|r| r.can_read(archive_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_by_extension_case_insensitively() {
        let reader = CompositeArchiveReader::new();
        assert!(reader.can_read(Path::new("photos.ZIP")));
        assert!(reader.can_read(Path::new("photos.tar.gz")));
        assert!(reader.can_read(Path::new("photos.7z")));
        assert!(reader.can_read(Path::new("photos.rar")));
    }

    #[test]
    fn rejects_unrecognized_extension() {
        let reader = CompositeArchiveReader::new();
        assert!(!reader.can_read(Path::new("photos.png")));
        assert!(!reader.can_read(Path::new("photos")));
    }
}
