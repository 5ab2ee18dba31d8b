use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Remote endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the progress API (e.g., "https://learn.example.com").
    /// Without one, the engine runs against an in-memory store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// What started a full sync pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncTrigger {
    /// Transition into the authenticated state
    SignIn,
    /// A read or favorite flag changed locally
    FlagChanged,
    /// The window or application regained focus
    Focus,
    /// An item was opened
    Opened,
    /// Explicit request (CLI)
    Manual,
}

impl SyncTrigger {
    /// Whether this trigger is a no-op once the session is already synced
    pub fn honors_synced_marker(&self) -> bool {
        matches!(self, SyncTrigger::SignIn)
    }
}

/// Why a pass did not run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    NotAuthenticated,
    /// Another pass was in flight; the trigger is dropped
    InFlight,
    AlreadySynced,
}

/// Outcome of one full sync trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SyncOutcome {
    Skipped {
        reason: SkipReason,
    },
    #[serde(rename_all = "camelCase")]
    Completed {
        /// False when the remote could not be read and local data was used alone
        remote_fetched: bool,
        /// False when the merged snapshot could not be written back
        pushed: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub trigger: SyncTrigger,
    pub outcome: SyncOutcome,
    /// Sizes of the merged sets (zero when skipped)
    pub read_count: usize,
    pub favorite_count: usize,
    pub duration_ms: u64,
}

impl SyncReport {
    pub fn skipped(trigger: SyncTrigger, reason: SkipReason) -> Self {
        Self {
            trigger,
            outcome: SyncOutcome::Skipped { reason },
            read_count: 0,
            favorite_count: 0,
            duration_ms: 0,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, SyncOutcome::Completed { .. })
    }
}

/// Engine status for display
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub in_flight: bool,
    pub synced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_report: Option<SyncReport>,
}
