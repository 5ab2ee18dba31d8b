//! Remote progress store contract
//!
//! One record per identity. `replace` overwrites the whole record and the
//! server never merges, so callers must always send already-merged sets.
//! `upsert` changes a single field of a single item.

mod http;
mod memory;

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::progress::{LastOpened, SyncSnapshot};
use crate::session::Identity;

pub use http::HttpRemoteStore;
pub use memory::MemoryRemoteStore;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Authentication failed")]
    AuthFailed,
    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },
    #[error("Malformed remote data: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Remote unavailable: {0}")]
    Unavailable(String),
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Server-side progress record for one identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub read_slugs: BTreeSet<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fav_slugs: BTreeSet<String>,
    #[serde(default)]
    pub last_opened_slug: Option<String>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_opened_at: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    pub fn into_snapshot(self) -> SyncSnapshot {
        // A slug without a timestamp loses to any timestamped pointer
        let last_opened = self
            .last_opened_slug
            .map(|slug| LastOpened::new(slug, self.last_opened_at.unwrap_or_default()));
        SyncSnapshot {
            read: self.read_slugs,
            favorites: self.fav_slugs,
            last_opened,
        }
    }
}

impl From<&SyncSnapshot> for ProgressRecord {
    fn from(snapshot: &SyncSnapshot) -> Self {
        Self {
            read_slugs: snapshot.read.clone(),
            fav_slugs: snapshot.favorites.clone(),
            last_opened_slug: snapshot.last_opened.as_ref().map(|p| p.item_id.clone()),
            last_opened_at: snapshot.last_opened.as_ref().map(|p| p.at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagUpdate {
    pub item_id: String,
    pub value: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenedUpdate {
    pub item_id: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub at: Option<DateTime<Utc>>,
}

/// Single-field, idempotent change to one item's remote record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldUpdate {
    Read(FlagUpdate),
    Favorite(FlagUpdate),
    Opened(OpenedUpdate),
}

impl FieldUpdate {
    pub fn read(item_id: impl Into<String>, value: bool) -> Self {
        Self::Read(FlagUpdate {
            item_id: item_id.into(),
            value,
        })
    }

    pub fn favorite(item_id: impl Into<String>, value: bool) -> Self {
        Self::Favorite(FlagUpdate {
            item_id: item_id.into(),
            value,
        })
    }

    pub fn opened(item_id: impl Into<String>, at: Option<DateTime<Utc>>) -> Self {
        Self::Opened(OpenedUpdate {
            item_id: item_id.into(),
            at,
        })
    }

    pub fn item_id(&self) -> &str {
        match self {
            Self::Read(u) | Self::Favorite(u) => &u.item_id,
            Self::Opened(u) => &u.item_id,
        }
    }
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Read the record for `identity`
    async fn fetch(&self, identity: &Identity) -> Result<ProgressRecord, RemoteError>;

    /// Overwrite the record for `identity`
    async fn replace(&self, identity: &Identity, record: &ProgressRecord) -> Result<(), RemoteError>;

    /// Apply a single-field update
    async fn upsert(&self, identity: &Identity, update: &FieldUpdate) -> Result<(), RemoteError>;
}
