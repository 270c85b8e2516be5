use std::path::PathBuf;

use chrono::{DateTime, Utc};
use crate::ids::LibraryId;

/// A user-defined grouping of collections. A library never owns its
/// collections — the relationship is a weak back-reference
/// (`Collection.library_id`), never cascaded on library mutation except for
/// the paired scheduled job (§4.10).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Library {
    pub id: LibraryId,
    pub name: String,
    pub path: PathBuf,
    pub description: Option<String>,
    pub settings: LibrarySettings,
    pub statistics: LibraryStatistics,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LibrarySettings {
    pub auto_scan: bool,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        LibrarySettings { auto_scan: false }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LibraryStatistics {
    pub total_collections: u64,
    pub total_media_items: u64,
    pub total_size: u64,
}

impl Library {
    pub fn new(name: String, path: PathBuf) -> Self {
        let now = Utc::now();
        Library {
            id: LibraryId::new(),
            name,
            path,
            description: None,
            settings: LibrarySettings::default(),
            statistics: LibraryStatistics::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Cron pattern rendered into a human-readable label. Unrecognized patterns
/// fall through to the pattern itself (§4.10).
pub fn describe_cron(expression: &str) -> String {
    match expression.trim() {
        "0 2 * * *" => "Daily at 2:00 AM".to_string(),
        "0 * * * *" => "Every hour".to_string(),
        "*/30 * * * *" => "Every 30 minutes".to_string(),
        other => other.to_string(),
    }
}

/// The cron expression materialized for a library with `settings.auto_scan
/// == true`.
pub const DEFAULT_AUTO_SCAN_CRON: &str = "0 2 * * *";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_cron_known_patterns() {
        assert_eq!(describe_cron("0 2 * * *"), "Daily at 2:00 AM");
        assert_eq!(describe_cron("0 * * * *"), "Every hour");
        assert_eq!(describe_cron("*/30 * * * *"), "Every 30 minutes");
    }

    #[test]
    fn describe_cron_unknown_pattern_is_verbatim() {
        assert_eq!(describe_cron("15 4 1 * *"), "15 4 1 * *");
    }
}
