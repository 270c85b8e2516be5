use async_trait::async_trait;
use imago_model::collection::CollectionType;
use imago_model::ids::{CollectionId, LibraryId};
use imago_model::navigation::{
    CollectionSummary, NavigationResult, SiblingsPage, SortDirection, SortField,
};

use crate::error::Result;

/// Sub-millisecond pagination, neighbor lookup, and filtering across the
/// full collection corpus, backed by sorted sets + summary hashes + a
/// thumbnail blob cache (§4.9). Best-effort: a miss means "fall back to
/// direct database reads, then reconcile on the next rebuild".
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait NavigationIndex: Send + Sync {
    /// Enumerate non-deleted collections from the store, clear
    /// `collection_index:sorted:*`/`collection_index:data:*` (blob cache
    /// persists), and issue batched writes. Records `last_rebuild` + total.
    async fn rebuild(&self) -> Result<u64>;

    async fn upsert(&self, summary: &CollectionSummary) -> Result<()>;

    async fn remove(&self, id: CollectionId) -> Result<()>;

    async fn get_navigation(
        &self,
        id: CollectionId,
        sort_by: SortField,
        direction: SortDirection,
    ) -> Result<Option<NavigationResult>>;

    async fn get_siblings(
        &self,
        id: CollectionId,
        page: u64,
        page_size: u64,
        sort_by: SortField,
        direction: SortDirection,
    ) -> Result<Option<SiblingsPage>>;

    async fn get_page(
        &self,
        page: u64,
        page_size: u64,
        sort_by: SortField,
        direction: SortDirection,
    ) -> Result<Vec<CollectionSummary>>;

    async fn get_by_library(
        &self,
        library_id: LibraryId,
        page: u64,
        page_size: u64,
        sort_by: SortField,
        direction: SortDirection,
    ) -> Result<Vec<CollectionSummary>>;

    async fn get_by_type(
        &self,
        collection_type: CollectionType,
        page: u64,
        page_size: u64,
        sort_by: SortField,
        direction: SortDirection,
    ) -> Result<Vec<CollectionSummary>>;

    async fn count(&self, sort_by: SortField) -> Result<u64>;

    async fn count_by_library(
        &self,
        library_id: LibraryId,
        sort_by: SortField,
    ) -> Result<u64>;

    async fn count_by_type(
        &self,
        collection_type: CollectionType,
        sort_by: SortField,
    ) -> Result<u64>;

    async fn get_cached_thumbnail(
        &self,
        collection_id: CollectionId,
    ) -> Result<Option<Vec<u8>>>;

    async fn set_cached_thumbnail(
        &self,
        collection_id: CollectionId,
        bytes: Vec<u8>,
    ) -> Result<()>;

    async fn batch_cache(
        &self,
        entries: Vec<(CollectionId, Vec<u8>)>,
    ) -> Result<()>;
}
