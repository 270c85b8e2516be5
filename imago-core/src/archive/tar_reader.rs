use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

use async_trait::async_trait;
use imago_contracts::archive::{ArchiveEntry, ArchiveReader, ReadSeek};

use crate::error::{CoreError, Result};

/// Best-effort support for `tar`, `tar.gz`/`tgz`, and `tar.bz2`/`tbz2`
/// (§4.2). `tar::Archive` is a forward-only reader, so entries are
/// materialized eagerly here rather than re-opened lazily per entry like
/// the zip reader: a second streaming pass per entry would mean decoding
/// the whole gzip/bzip2 stream again for every single image.
#[derive(Debug, Default, Clone, Copy)]
pub struct TarArchiveReader;

impl TarArchiveReader {
    pub fn new() -> Self {
        TarArchiveReader
    }

    fn decode_reader(path: &Path) -> Result<Box<dyn Read>> {
        let file = File::open(path).map_err(CoreError::Io)?;
        let name = path.to_string_lossy().to_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Ok(Box::new(flate2::read::GzDecoder::new(file)))
        } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
            Ok(Box::new(bzip2::read::BzDecoder::new(file)))
        } else {
            Ok(Box::new(file))
        }
    }
}

#[async_trait]
impl ArchiveReader for TarArchiveReader {
    async fn entries(&self, archive_path: &Path) -> Result<Vec<ArchiveEntry>> {
        let reader = Self::decode_reader(archive_path)?;
        let mut archive = tar::Archive::new(reader);
        let mut out = Vec::new();

        let tar_entries = archive.entries().map_err(CoreError::Io)?;
        for entry in tar_entries {
            let mut entry = entry.map_err(CoreError::Io)?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let name = entry.path().map_err(CoreError::Io)?.to_string_lossy().into_owned();
            let size = entry.header().size().unwrap_or(0);
            let mut buf = Vec::with_capacity(size as usize);
            entry.read_to_end(&mut buf).map_err(CoreError::Io)?;
            out.push(ArchiveEntry::new(name, size, move || {
                Ok(Box::new(Cursor::new(buf)) as Box<dyn ReadSeek>)
            }));
        }
        Ok(out)
    }

    fn can_read(&self, archive_path: &Path) -> bool {
        let name = archive_path.to_string_lossy().to_lowercase();
        name.ends_with(".tar")
            || name.ends_with(".tar.gz")
            || name.ends_with(".tgz")
            || name.ends_with(".tar.bz2")
            || name.ends_with(".tbz2")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tar(path: &Path) {
        let file = File::create(path).unwrap();
        let mut builder = tar::Builder::new(file);
        let data = b"hello tar";
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_cksum();
        builder.append_data(&mut header, "a.jpg", &data[..]).unwrap();
        builder.finish().unwrap();
    }

    #[tokio::test]
    async fn entries_reads_plain_tar() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("photos.tar");
        sample_tar(&archive_path);

        let reader = TarArchiveReader::new();
        let entries = reader.entries(&archive_path).await.unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "a.jpg");
        assert_eq!(entries[0].size, 9);
    }

    #[test]
    fn can_read_matches_every_supported_suffix() {
        let reader = TarArchiveReader::new();
        for name in ["a.tar", "a.tar.gz", "a.tgz", "a.tar.bz2", "a.tbz2"] {
            assert!(reader.can_read(Path::new(name)), "{name} should match");
        }
        assert!(!reader.can_read(Path::new("a.zip")));
    }
}
