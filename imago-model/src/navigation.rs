use chrono::{DateTime, Utc};
use crate::collection::CollectionType;
use crate::ids::{CollectionId, ImageId, LibraryId};

/// The fields a primary or secondary sorted set can be keyed by (§3, §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum SortField {
    UpdatedAt,
    CreatedAt,
    Name,
    ImageCount,
    TotalSize,
}

impl SortField {
    pub const ALL: [SortField; 5] = [
        SortField::UpdatedAt,
        SortField::CreatedAt,
        SortField::Name,
        SortField::ImageCount,
        SortField::TotalSize,
    ];

    pub fn as_key_fragment(&self) -> &'static str {
        match self {
            SortField::UpdatedAt => "updated_at",
            SortField::CreatedAt => "created_at",
            SortField::Name => "name",
            SortField::ImageCount => "image_count",
            SortField::TotalSize => "total_size",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_key_fragment(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    /// Descending direction is implemented by negating the score so a
    /// single ascending `ZRANGEBYSCORE`/`ZRANK` always serves rank 0 =
    /// first element to display (§4.9, "Scoring").
    pub fn sign(&self) -> f64 {
        match self {
            SortDirection::Asc => 1.0,
            SortDirection::Desc => -1.0,
        }
    }
}

/// A denormalized, filterable projection of a [`crate::collection::Collection`],
/// stored one-per-collection in the summary hash (§3, §4.9).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollectionSummary {
    pub id: CollectionId,
    pub name: String,
    pub path: String,
    pub collection_type: CollectionType,
    pub library_id: Option<LibraryId>,
    pub first_image_id: Option<ImageId>,
    pub image_count: u64,
    pub thumbnail_count: u64,
    pub cache_count: u64,
    pub total_size: u64,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CollectionSummary {
    pub fn from_collection(collection: &crate::collection::Collection) -> Self {
        CollectionSummary {
            id: collection.id,
            name: collection.name.clone(),
            path: collection.path.to_string_lossy().into_owned(),
            collection_type: collection.collection_type,
            library_id: collection.library_id,
            first_image_id: collection.images.first().map(|i| i.id),
            image_count: collection.images.len() as u64,
            thumbnail_count: collection.thumbnails.len() as u64,
            cache_count: collection.cache_images.len() as u64,
            total_size: collection.statistics.total_size,
            tags: Vec::new(),
            created_at: collection.created_at,
            updated_at: collection.updated_at,
        }
    }

    /// The sort score for `field`, unsigned; callers apply
    /// `direction.sign()` themselves so the same score can serve either
    /// direction.
    pub fn score_for(&self, field: SortField) -> f64 {
        match field {
            SortField::UpdatedAt => self.updated_at.timestamp_millis() as f64,
            SortField::CreatedAt => self.created_at.timestamp_millis() as f64,
            SortField::Name => name_hash_score(&self.name),
            SortField::ImageCount => self.image_count as f64,
            SortField::TotalSize => self.total_size as f64,
        }
    }
}

/// A stable, order-preserving score for name sorts: the normalized name's
/// bytes packed into an f64-safe integer range so lexicographic byte order
/// matches numeric score order for names up to 7 bytes of discriminating
/// prefix (collisions beyond that still sort correctly relative to ties
/// because Redis breaks ties within a sorted set by member, not score).
pub fn name_hash_score(name: &str) -> f64 {
    let normalized = name.trim().to_lowercase();
    let mut acc: u64 = 0;
    for (i, byte) in normalized.bytes().take(7).enumerate() {
        acc |= (byte as u64) << (8 * (6 - i));
    }
    acc as f64
}

/// Result of `GetNavigation` (§4.9, boundary behaviors): prev/next ids,
/// 1-based position, and total count.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NavigationResult {
    pub prev: Option<CollectionId>,
    pub next: Option<CollectionId>,
    pub position: u64,
    pub total: u64,
    pub has_previous: bool,
    pub has_next: bool,
}

/// Result of `GetSiblings`/`GetPage` (§4.9): the page containing (or
/// requested around) a collection.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SiblingsPage {
    pub summaries: Vec<CollectionSummary>,
    pub current_position: u64,
    pub current_page: u64,
    pub page_size: u64,
    pub total: u64,
    pub total_pages: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_hash_score_orders_like_the_strings() {
        let a = name_hash_score("alpha");
        let b = name_hash_score("beta");
        let z = name_hash_score("zulu");
        assert!(a < b);
        assert!(b < z);
    }

    #[test]
    fn sort_direction_sign() {
        assert_eq!(SortDirection::Asc.sign(), 1.0);
        assert_eq!(SortDirection::Desc.sign(), -1.0);
    }
}
