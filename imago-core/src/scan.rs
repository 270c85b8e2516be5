//! `FileScanner` over folders and archives (§4.3).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use imago_contracts::archive::ArchiveReader;
use imago_contracts::image_codec::{ImageCodec, SUPPORTED_EXTENSIONS};
use imago_contracts::scanner::{FileScanner, ImageDescriptor};
use imago_model::collection::CollectionType;
use tracing::warn;
use walkdir::WalkDir;

use crate::error::Result;

pub struct WalkingFileScanner {
    codec: Arc<dyn ImageCodec>,
    archives: Arc<dyn ArchiveReader>,
}

impl WalkingFileScanner {
    pub fn new(codec: Arc<dyn ImageCodec>, archives: Arc<dyn ArchiveReader>) -> Self {
        WalkingFileScanner { codec, archives }
    }

    fn has_supported_extension(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                SUPPORTED_EXTENSIONS
                    .iter()
                    .any(|ext| ext.eq_ignore_ascii_case(e))
            })
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for WalkingFileScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalkingFileScanner").finish()
    }
}

#[async_trait]
impl FileScanner for WalkingFileScanner {
    async fn scan_folder(&self, root: &Path) -> Result<Vec<ImageDescriptor>> {
        let mut out = Vec::new();

        for entry in WalkDir::new(root)
            .into_iter()
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!("skipping unreadable entry during scan: {err}");
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if !Self::has_supported_extension(path) {
                continue;
            }

            let probe = match self.codec.probe(path).await {
                Ok(probe) => probe,
                Err(err) => {
                    warn!("skipping corrupt image {}: {err}", path.display());
                    continue;
                }
            };

            let bytes = match tokio::fs::read(path).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!("skipping unreadable file {}: {err}", path.display());
                    continue;
                }
            };
            let file_size = bytes.len() as u64;
            let metadata = self.codec.extract_metadata(&bytes).await.ok();

            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let relative_path = path
                .strip_prefix(root)
                .unwrap_or(path)
                .to_string_lossy()
                .into_owned();

            out.push(ImageDescriptor {
                source_path: path.to_path_buf(),
                filename,
                relative_path,
                file_size,
                width: probe.width,
                height: probe.height,
                format: probe.format.extension().to_string(),
                metadata,
            });
        }

        Ok(out)
    }

    async fn scan_archive(
        &self,
        archive_path: &Path,
        _collection_type: CollectionType,
    ) -> Result<Vec<ImageDescriptor>> {
        let mut out = Vec::new();
        let entries = self.archives.entries(archive_path).await?;

        for entry in entries {
            let name = entry.name.clone();
            if !Self::has_supported_extension(Path::new(&name)) {
                continue;
            }

            let mut reader = match entry.open() {
                Ok(reader) => reader,
                Err(err) => {
                    warn!("skipping unreadable archive entry {name}: {err}");
                    continue;
                }
            };
            let mut bytes = Vec::new();
            if let Err(err) = std::io::Read::read_to_end(&mut reader, &mut bytes) {
                warn!("skipping unreadable archive entry {name}: {err}");
                continue;
            }

            let probe = match self.codec.probe_bytes(&bytes).await {
                Ok(probe) => probe,
                Err(err) => {
                    warn!("skipping corrupt image {name} in archive: {err}");
                    continue;
                }
            };
            let metadata = self.codec.extract_metadata(&bytes).await.ok();

            let rel_path = PathBuf::from(&name);
            let filename = rel_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| name.clone());

            out.push(ImageDescriptor {
                source_path: archive_path.join(&name),
                filename,
                relative_path: name,
                file_size: bytes.len() as u64,
                width: probe.width,
                height: probe.height,
                format: probe.format.extension().to_string(),
                metadata,
            });
        }

        Ok(out)
    }

    fn is_valid_collection_path(&self, path: &Path) -> bool {
        if path.is_dir() {
            return true;
        }
        self.archives.can_read(path)
    }
}
