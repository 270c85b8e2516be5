use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

use async_trait::async_trait;
use imago_contracts::archive::{ArchiveEntry, ArchiveReader, ReadSeek};

use crate::error::{CoreError, Result};

/// Mandatory archive format (§4.2). Entries are materialized into an
/// in-memory buffer on `open()`: `zip::ZipArchive` needs `&mut self` to seek
/// between entries, so the opener re-opens the archive and seeks straight to
/// this entry's data rather than holding the whole archive's lock open.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipArchiveReader;

impl ZipArchiveReader {
    pub fn new() -> Self {
        ZipArchiveReader
    }
}

#[async_trait]
impl ArchiveReader for ZipArchiveReader {
    async fn entries(&self, archive_path: &Path) -> Result<Vec<ArchiveEntry>> {
        let path = archive_path.to_path_buf();
        let file = File::open(&path).map_err(CoreError::Io)?;
        let mut zip = zip::ZipArchive::new(file)
            .map_err(|e| CoreError::CorruptAsset {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        let mut out = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let entry = zip
                .by_index(i)
                .map_err(|e| CoreError::CorruptAsset {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let size = entry.size();
            let archive_path = path.clone();
            out.push(ArchiveEntry::new(name.clone(), size, move || {
                open_entry(&archive_path, &name)
            }));
        }
        Ok(out)
    }

    fn can_read(&self, archive_path: &Path) -> bool {
        archive_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("zip"))
            .unwrap_or(false)
    }
}

fn open_entry(archive_path: &Path, name: &str) -> Result<Box<dyn ReadSeek>> {
    let file = File::open(archive_path).map_err(CoreError::Io)?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| CoreError::CorruptAsset {
        path: archive_path.display().to_string(),
        message: e.to_string(),
    })?;
    let mut entry = zip.by_name(name).map_err(|e| CoreError::CorruptAsset {
        path: archive_path.display().to_string(),
        message: e.to_string(),
    })?;
    let mut buf = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut buf).map_err(CoreError::Io)?;
    Ok(Box::new(Cursor::new(buf)))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    use super::*;

    fn sample_zip(path: &Path) {
        let file = File::create(path).unwrap();
        let mut writer = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        writer.start_file("a.jpg", options).unwrap();
        writer.write_all(b"hello").unwrap();
        writer.add_directory("subdir/", options).unwrap();
        writer.start_file("subdir/b.jpg", options).unwrap();
        writer.write_all(b"world!").unwrap();
        writer.finish().unwrap();
    }

    #[tokio::test]
    async fn entries_skips_directories_and_reports_size() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("photos.zip");
        sample_zip(&archive_path);

        let reader = ZipArchiveReader::new();
        let entries = reader.entries(&archive_path).await.unwrap();

        assert_eq!(entries.len(), 2);
        let a = entries.iter().find(|e| e.name == "a.jpg").unwrap();
        assert_eq!(a.size, 5);
    }

    #[tokio::test]
    async fn entry_open_yields_exact_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("photos.zip");
        sample_zip(&archive_path);

        let reader = ZipArchiveReader::new();
        let entries = reader.entries(&archive_path).await.unwrap();
        let entry = entries.into_iter().find(|e| e.name == "subdir/b.jpg").unwrap();

        let mut opened = entry.open().unwrap();
        let mut buf = Vec::new();
        opened.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"world!");
    }

    #[test]
    fn can_read_is_case_insensitive_by_extension() {
        let reader = ZipArchiveReader::new();
        assert!(reader.can_read(Path::new("a.zip")));
        assert!(reader.can_read(Path::new("a.ZIP")));
        assert!(!reader.can_read(Path::new("a.tar")));
    }
}
