use crate::collection::CollectionType;
use crate::ids::LibraryId;
use crate::navigation::{SortDirection, SortField};

/// Filter + pagination parameters shared by `CollectionStore::Query` and the
/// navigation index's `GetByLibrary`/`GetByType` paths (§4.4, §4.9).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollectionFilter {
    pub library_id: Option<LibraryId>,
    pub collection_type: Option<CollectionType>,
    pub include_deleted: bool,
}

impl Default for CollectionFilter {
    fn default() -> Self {
        CollectionFilter {
            library_id: None,
            collection_type: None,
            include_deleted: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
    pub sort_by: SortField,
    pub sort_direction: SortDirection,
}

impl Pagination {
    pub fn skip(&self) -> u64 {
        self.page.saturating_sub(1) * self.page_size
    }
}
