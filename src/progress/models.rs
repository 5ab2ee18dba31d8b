use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Flags for a single item, derived from the read and favorite sets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressFlags {
    pub read: bool,
    pub favorite: bool,
}

/// The most recently opened item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastOpened {
    pub item_id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub at: DateTime<Utc>,
}

impl LastOpened {
    pub fn new(item_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            item_id: item_id.into(),
            at,
        }
    }
}

/// Progress state as seen by one side of a sync pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSnapshot {
    pub read: BTreeSet<String>,
    pub favorites: BTreeSet<String>,
    pub last_opened: Option<LastOpened>,
}

impl SyncSnapshot {
    pub fn is_empty(&self) -> bool {
        self.read.is_empty() && self.favorites.is_empty() && self.last_opened.is_none()
    }

    pub fn flags(&self, item_id: &str) -> ProgressFlags {
        ProgressFlags {
            read: self.read.contains(item_id),
            favorite: self.favorites.contains(item_id),
        }
    }
}
