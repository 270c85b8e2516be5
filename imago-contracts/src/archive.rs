use std::io::{Read, Seek};
use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

/// One entry inside an archive, as yielded by `ArchiveReader::entries`
/// (§4.2). Directory entries are never yielded.
pub struct ArchiveEntry {
    pub name: String,
    pub size: u64,
    opener: Box<dyn FnOnce() -> Result<Box<dyn ReadSeek>> + Send>,
}

impl ArchiveEntry {
    pub fn new(
        name: String,
        size: u64,
        opener: impl FnOnce() -> Result<Box<dyn ReadSeek>> + Send + 'static,
    ) -> Self {
        ArchiveEntry {
            name,
            size,
            opener: Box::new(opener),
        }
    }

    pub fn open(self) -> Result<Box<dyn ReadSeek>> {
        (self.opener)()
    }
}

/// A combined `Read + Seek` object handed back for streaming an entry's
/// bytes without requiring full extraction up front.
pub trait ReadSeek: Read + Seek + Send {}
impl<T: Read + Seek + Send> ReadSeek for T {}

/// Streaming enumeration over zip (mandatory), 7z, rar, tar/tar.gz/tar.bz2
/// (best-effort) archives. Must tolerate long paths and non-ASCII names
/// (§4.2).
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait ArchiveReader: Send + Sync {
    /// List entries without opening them; directory entries are skipped.
    async fn entries(&self, archive_path: &Path) -> Result<Vec<ArchiveEntry>>;

    /// Whether this reader recognizes the archive by extension/magic.
    fn can_read(&self, archive_path: &Path) -> bool;
}
