//! Data models for the review scheduler

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ReviewError;

/// Lower bound for the ease multiplier
pub const MIN_EASE: f64 = 1.3;
/// Upper bound for the ease multiplier
pub const MAX_EASE: f64 = 2.8;
/// Ease given to an item the first time it enters review
pub const DEFAULT_EASE: f64 = 2.0;

/// Outcome of one review attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Grade {
    /// Recalled correctly
    Ok,
    /// Failed to recall
    Bad,
    /// Deferred without an answer
    Skip,
}

impl Grade {
    pub const ALL: [Grade; 3] = [Grade::Ok, Grade::Bad, Grade::Skip];

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::Ok => "ok",
            Grade::Bad => "bad",
            Grade::Skip => "skip",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ok" => Ok(Grade::Ok),
            "bad" => Ok(Grade::Bad),
            "skip" => Ok(Grade::Skip),
            _ => Err(ReviewError::InvalidGrade(s.to_string())),
        }
    }
}

/// Per-grade tallies for one item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    #[serde(default)]
    pub ok: u32,
    #[serde(default)]
    pub bad: u32,
    #[serde(default)]
    pub skip: u32,
}

/// Scheduling state of one content item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewState {
    /// Interval growth multiplier, kept within [MIN_EASE, MAX_EASE]
    #[serde(default = "default_ease")]
    pub ease: f64,
    /// Current interval in days
    #[serde(default)]
    pub interval_days: u32,
    /// Next review time; `None` means never scheduled (due immediately)
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub due_at: Option<DateTime<Utc>>,
    /// Last time the item was graded
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    pub counters: Counters,
    #[serde(default)]
    pub last_grade: Option<Grade>,
}

fn default_ease() -> f64 {
    DEFAULT_EASE
}

impl Default for ReviewState {
    fn default() -> Self {
        Self {
            ease: DEFAULT_EASE,
            interval_days: 0,
            due_at: None,
            last_seen: None,
            counters: Counters::default(),
            last_grade: None,
        }
    }
}

impl ReviewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the item has been graded at least once
    pub fn is_seen(&self) -> bool {
        self.last_seen.is_some()
    }
}

/// A tracked item paired with its scheduling state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEntry {
    pub item_id: String,
    pub state: ReviewState,
}

/// An entry of the externally supplied content listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub item_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub topic: String,
}

/// Review statistics for a content pool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub pool_size: usize,
    pub tracked: usize,
    pub due: usize,
    pub unseen: usize,
    pub ok_total: u32,
    pub bad_total: u32,
    pub skip_total: u32,
}
