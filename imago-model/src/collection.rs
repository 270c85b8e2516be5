use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use crate::ids::{CollectionId, ImageId, LibraryId};

/// The physical shape of a collection's source on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "PascalCase"))]
pub enum CollectionType {
    Folder,
    Zip,
    SevenZip,
    Rar,
    Tar,
}

impl CollectionType {
    /// Best-effort classification from a path: directories are `Folder`,
    /// otherwise the extension (including the `tar.*` compound forms) picks
    /// the archive kind. Returns `None` for anything else.
    pub fn detect(path: &std::path::Path) -> Option<Self> {
        if path.is_dir() {
            return Some(CollectionType::Folder);
        }
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        if name.ends_with(".zip") {
            Some(CollectionType::Zip)
        } else if name.ends_with(".7z") {
            Some(CollectionType::SevenZip)
        } else if name.ends_with(".rar") {
            Some(CollectionType::Rar)
        } else if name.ends_with(".tar")
            || name.ends_with(".tar.gz")
            || name.ends_with(".tgz")
            || name.ends_with(".tar.bz2")
            || name.ends_with(".tbz2")
        {
            Some(CollectionType::Tar)
        } else {
            None
        }
    }
}

impl std::fmt::Display for CollectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectionType::Folder => write!(f, "Folder"),
            CollectionType::Zip => write!(f, "Zip"),
            CollectionType::SevenZip => write!(f, "SevenZip"),
            CollectionType::Rar => write!(f, "Rar"),
            CollectionType::Tar => write!(f, "Tar"),
        }
    }
}

/// Aggregate statistics, recomputed from the embedded arrays by
/// [`Collection::recompute_statistics`] whenever `Images[]` changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Statistics {
    pub total_items: u64,
    pub total_size: u64,
}

/// Best-effort, per-image technical metadata. Every field is optional: an
/// extraction failure on one field must never fail the whole probe.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ImageMetadata {
    pub quality: Option<u8>,
    pub color_space: Option<String>,
    pub compression: Option<String>,
    pub created_date: Option<DateTime<Utc>>,
    pub modified_date: Option<DateTime<Utc>>,
    pub camera: Option<String>,
    pub software: Option<String>,
    pub additional: HashMap<String, String>,
}

/// An image embedded inside its parent [`Collection`]. Has no identity
/// outside the document that owns it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImageEmbedded {
    pub id: ImageId,
    pub filename: String,
    pub relative_path: String,
    pub file_size: u64,
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub created_at: DateTime<Utc>,
    pub metadata: Option<ImageMetadata>,
    pub view_count: u64,
}

impl ImageEmbedded {
    /// The uniqueness key enforced by `CollectionStore::AtomicAddImage`:
    /// `(filename, relativePath)`.
    pub fn identity_key(&self) -> (&str, &str) {
        (&self.filename, &self.relative_path)
    }
}

/// A pre-computed thumbnail rendition embedded inside its parent
/// [`Collection`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThumbnailEmbedded {
    pub image_id: ImageId,
    pub width: u32,
    pub height: u32,
    pub thumbnail_path: String,
    pub bytes: u64,
    pub created_at: DateTime<Utc>,
}

impl ThumbnailEmbedded {
    /// Uniqueness key: `(imageId, width, height)`.
    pub fn identity_key(&self) -> (ImageId, u32, u32) {
        (self.image_id, self.width, self.height)
    }
}

/// A resized cache rendition embedded inside its parent [`Collection`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CacheEmbedded {
    pub image_id: ImageId,
    pub width: u32,
    pub height: u32,
    pub cache_path: String,
    pub quality: u8,
    pub bytes: u64,
    pub created_at: DateTime<Utc>,
}

impl CacheEmbedded {
    /// Uniqueness key: `(imageId, width, height)`.
    pub fn identity_key(&self) -> (ImageId, u32, u32) {
        (self.image_id, self.width, self.height)
    }
}

/// The primary aggregate: a folder or archive materialized as a document
/// with three embedded, exclusively-owned arrays. See `§3 DATA MODEL`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
    pub path: PathBuf,
    pub collection_type: CollectionType,
    pub library_id: Option<LibraryId>,
    pub description: Option<String>,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub statistics: Statistics,
    pub images: Vec<ImageEmbedded>,
    pub thumbnails: Vec<ThumbnailEmbedded>,
    pub cache_images: Vec<CacheEmbedded>,
}

impl Collection {
    pub fn new(
        name: String,
        path: PathBuf,
        collection_type: CollectionType,
        library_id: Option<LibraryId>,
    ) -> Self {
        let now = Utc::now();
        Collection {
            id: CollectionId::new(),
            name,
            path,
            collection_type,
            library_id,
            description: None,
            deleted: false,
            created_at: now,
            updated_at: now,
            statistics: Statistics::default(),
            images: Vec::new(),
            thumbnails: Vec::new(),
            cache_images: Vec::new(),
        }
    }

    /// Find an existing image by its `(filename, relativePath)` identity.
    pub fn find_image(
        &self,
        filename: &str,
        relative_path: &str,
    ) -> Option<&ImageEmbedded> {
        self.images
            .iter()
            .find(|i| i.identity_key() == (filename, relative_path))
    }

    pub fn find_thumbnail(
        &self,
        image_id: ImageId,
        width: u32,
        height: u32,
    ) -> Option<&ThumbnailEmbedded> {
        self.thumbnails
            .iter()
            .find(|t| t.identity_key() == (image_id, width, height))
    }

    pub fn find_cache(
        &self,
        image_id: ImageId,
        width: u32,
        height: u32,
    ) -> Option<&CacheEmbedded> {
        self.cache_images
            .iter()
            .find(|c| c.identity_key() == (image_id, width, height))
    }

    /// Recompute `Statistics` from `Images[]`. Must be called after every
    /// mutation of the images array.
    pub fn recompute_statistics(&mut self) {
        self.statistics.total_items = self.images.len() as u64;
        self.statistics.total_size =
            self.images.iter().map(|i| i.file_size).sum();
    }
}
