//! Key-space layout for the Redis-backed `NavigationIndex` (§4.9).

use imago_model::collection::CollectionType;
use imago_model::ids::{CollectionId, LibraryId};
use imago_model::navigation::{SortDirection, SortField};

pub const SORTED_PREFIX: &str = "collection_index:sorted";
pub const DATA_PREFIX: &str = "collection_index:data";
pub const THUMB_PREFIX: &str = "collection_index:thumb";
pub const META_LAST_REBUILD: &str = "collection_index:meta:last_rebuild";
pub const META_TOTAL: &str = "collection_index:meta:total";

pub fn primary_key(field: SortField, direction: SortDirection) -> String {
    format!(
        "{SORTED_PREFIX}:{}:{}",
        field.as_key_fragment(),
        direction.as_key_fragment()
    )
}

pub fn by_library_key(
    library_id: LibraryId,
    field: SortField,
    direction: SortDirection,
) -> String {
    format!(
        "{SORTED_PREFIX}:by_library:{}:{}:{}",
        library_id,
        field.as_key_fragment(),
        direction.as_key_fragment()
    )
}

pub fn by_type_key(
    collection_type: CollectionType,
    field: SortField,
    direction: SortDirection,
) -> String {
    format!(
        "{SORTED_PREFIX}:by_type:{}:{}:{}",
        collection_type,
        field.as_key_fragment(),
        direction.as_key_fragment()
    )
}

pub fn summary_key(id: CollectionId) -> String {
    format!("{DATA_PREFIX}:{id}")
}

pub fn thumb_key(id: CollectionId) -> String {
    format!("{THUMB_PREFIX}:{id}")
}

pub fn all_primary_keys() -> Vec<(SortField, SortDirection, String)> {
    let mut out = Vec::with_capacity(10);
    for field in SortField::ALL {
        for direction in [SortDirection::Asc, SortDirection::Desc] {
            out.push((field, direction, primary_key(field, direction)));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use imago_model::ids::{CollectionId, LibraryId};

    #[test]
    fn primary_key_encodes_field_and_direction() {
        assert_eq!(
            primary_key(SortField::UpdatedAt, SortDirection::Desc),
            "collection_index:sorted:updated_at:desc"
        );
        assert_eq!(
            primary_key(SortField::Name, SortDirection::Asc),
            "collection_index:sorted:name:asc"
        );
    }

    #[test]
    fn by_library_key_includes_id() {
        let library_id = LibraryId::new();
        let key = by_library_key(library_id, SortField::ImageCount, SortDirection::Asc);
        assert!(key.starts_with("collection_index:sorted:by_library:"));
        assert!(key.contains(&library_id.to_string()));
        assert!(key.ends_with(":image_count:asc"));
    }

    #[test]
    fn summary_and_thumb_keys_are_distinct_per_id() {
        let id = CollectionId::new();
        assert_ne!(summary_key(id), thumb_key(id));
        assert!(summary_key(id).starts_with(DATA_PREFIX));
        assert!(thumb_key(id).starts_with(THUMB_PREFIX));
    }

    #[test]
    fn all_primary_keys_covers_every_field_and_direction() {
        let keys = all_primary_keys();
        assert_eq!(keys.len(), SortField::ALL.len() * 2);
        for field in SortField::ALL {
            assert!(keys.iter().any(|(f, d, _)| *f == field && *d == SortDirection::Asc));
            assert!(keys.iter().any(|(f, d, _)| *f == field && *d == SortDirection::Desc));
        }
    }
}
