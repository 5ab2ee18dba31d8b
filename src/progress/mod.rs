//! Per-item progress flags (read, favorite) and the last-opened pointer

pub mod models;
mod storage;

pub use models::{LastOpened, ProgressFlags, SyncSnapshot};
pub use storage::{default_aliases, ProgressStore, PROGRESS_NAMESPACE};
