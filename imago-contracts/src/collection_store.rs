use async_trait::async_trait;
use futures::stream::BoxStream;
use imago_model::collection::{
    CacheEmbedded, Collection, CollectionType, ImageEmbedded, ThumbnailEmbedded,
};
use imago_model::filter::{CollectionFilter, Pagination};
use imago_model::ids::{CollectionId, LibraryId};

use crate::error::Result;

/// A new collection document as submitted by `Create` (§4.4).
#[derive(Debug, Clone)]
pub struct NewCollection {
    pub name: String,
    pub path: std::path::PathBuf,
    pub collection_type: CollectionType,
    pub library_id: Option<LibraryId>,
    pub description: Option<String>,
}

/// Structural, top-level-only patch honored by `Update` (§4.4): metadata,
/// settings. Embedded arrays are never touched here — only the atomic
/// append operations mutate them.
#[derive(Debug, Clone, Default)]
pub struct CollectionPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub library_id: Option<Option<LibraryId>>,
}

/// Outcome of a CAS-style append: whether a new entry was inserted, and the
/// entry that now exists at that identity key either way.
#[derive(Debug, Clone)]
pub struct AppendOutcome<T> {
    pub added: bool,
    pub existing: T,
}

/// The single source of truth for collection documents: atomic CRUD with
/// CAS-append embedded arrays (§4.4). All operations are idempotent; race-free
/// array appends are mandatory even under concurrent workers.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Insert-only. Conflicts on `path` return `CoreError::Conflict` when the
    /// caller did not request overwrite.
    async fn create(&self, spec: NewCollection) -> Result<CollectionId>;

    /// `None` if absent or soft-deleted.
    async fn get(&self, id: CollectionId) -> Result<Option<Collection>>;

    /// Optimistic structural patch; bumps `updatedAt`.
    async fn update(&self, id: CollectionId, patch: CollectionPatch) -> Result<()>;

    /// Sets the soft-delete flag, bumps `updatedAt`, and removes the
    /// collection from the navigation index.
    async fn soft_delete(&self, id: CollectionId) -> Result<()>;

    /// CAS append keyed on `(filename, relativePath)`. Never produces
    /// duplicates even under concurrent workers.
    async fn atomic_add_image(
        &self,
        id: CollectionId,
        image: ImageEmbedded,
    ) -> Result<AppendOutcome<ImageEmbedded>>;

    /// CAS append keyed on `(imageId, width, height)`. If an existing entry
    /// points at a file still present on disk, returns it unchanged.
    async fn atomic_add_thumbnail(
        &self,
        id: CollectionId,
        thumbnail: ThumbnailEmbedded,
        existing_file_present: bool,
    ) -> Result<AppendOutcome<ThumbnailEmbedded>>;

    /// Same contract as `atomic_add_thumbnail`, against `CacheImages[]`.
    async fn atomic_add_cache(
        &self,
        id: CollectionId,
        cache: CacheEmbedded,
        existing_file_present: bool,
    ) -> Result<AppendOutcome<CacheEmbedded>>;

    /// Recompute `Statistics` from `Images[]`.
    async fn update_statistics(&self, id: CollectionId) -> Result<()>;

    /// Lazy sequence over collections matching `filter`, in `pagination`
    /// order. Used by rebuilders and listings.
    fn query<'a>(
        &'a self,
        filter: CollectionFilter,
        pagination: Pagination,
    ) -> BoxStream<'a, Result<Collection>>;
}
