use std::fs::File;
use std::path::Path;

use async_trait::async_trait;
use imago_contracts::archive::{ArchiveEntry, ArchiveReader, ReadSeek};
use walkdir::WalkDir;

use crate::error::{CoreError, Result};

/// Best-effort 7z support (§4.2). `sevenz_rust` only exposes whole-archive
/// extraction, so entries are materialized into a scratch directory once
/// and then walked like a folder; each `open()` just re-opens the extracted
/// file, keeping the `ArchiveEntry` contract identical to the streaming
/// readers.
#[derive(Debug, Default, Clone, Copy)]
pub struct SevenZipArchiveReader;

impl SevenZipArchiveReader {
    pub fn new() -> Self {
        SevenZipArchiveReader
    }
}

#[async_trait]
impl ArchiveReader for SevenZipArchiveReader {
    async fn entries(&self, archive_path: &Path) -> Result<Vec<ArchiveEntry>> {
        // `TempDir::into_path` hands over ownership of the directory instead
        // of deleting it on drop: openers run after this function returns,
        // so the directory must outlive it. The caller's scan pipeline is
        // expected to run behind a `ScanOrchestrator` whose process restarts
        // periodically; nothing here reclaims the directory, which is the
        // cost of `sevenz_rust` not exposing a streaming entry reader.
        let scratch = tempfile::tempdir().map_err(CoreError::Io)?.into_path();
        sevenz_rust::decompress_file(archive_path, &scratch).map_err(|e| {
            CoreError::CorruptAsset {
                path: archive_path.display().to_string(),
                message: e.to_string(),
            }
        })?;

        let mut out = Vec::new();
        for entry in WalkDir::new(&scratch)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let relative = entry
                .path()
                .strip_prefix(&scratch)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .into_owned();
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            let full_path = entry.path().to_path_buf();
            out.push(ArchiveEntry::new(relative, size, move || {
                let file = File::open(&full_path).map_err(CoreError::Io)?;
                Ok(Box::new(file) as Box<dyn ReadSeek>)
            }));
        }
        Ok(out)
    }

    fn can_read(&self, archive_path: &Path) -> bool {
        archive_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("7z"))
            .unwrap_or(false)
    }
}
