pub mod config;
pub mod merge;
pub mod remote;

mod manager;

pub use config::{RemoteConfig, SkipReason, SyncOutcome, SyncReport, SyncStatus, SyncTrigger};
pub use manager::{SyncError, SyncManager};
pub use remote::{
    FieldUpdate, HttpRemoteStore, MemoryRemoteStore, ProgressRecord, RemoteError, RemoteStore,
};
