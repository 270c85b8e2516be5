use std::path::Path;

use async_trait::async_trait;
use imago_contracts::archive::{ArchiveEntry, ArchiveReader};

use crate::error::{CoreError, Result};

/// RAR is recognized but not decodable: no maintained pure-Rust RAR decoder
/// exists in the dependency set this workspace otherwise draws from, and
/// the proprietary RAR format has no stable C library binding in the
/// pack's ecosystem either. `can_read` still returns `true` so collections
/// are classified correctly; `entries` fails with `UnsupportedFormat` so
/// scans report the file as a skipped, logged item rather than silently
/// dropping it (§4.2, §4.3).
#[derive(Debug, Default, Clone, Copy)]
pub struct RarArchiveReader;

impl RarArchiveReader {
    pub fn new() -> Self {
        RarArchiveReader
    }
}

#[async_trait]
impl ArchiveReader for RarArchiveReader {
    async fn entries(&self, archive_path: &Path) -> Result<Vec<ArchiveEntry>> {
        Err(CoreError::UnsupportedFormat(format!(
            "rar archives are not decodable: {}",
            archive_path.display()
        )))
    }

    fn can_read(&self, archive_path: &Path) -> bool {
        archive_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("rar"))
            .unwrap_or(false)
    }
}
