pub mod config;
pub mod context;
pub mod events;
pub mod progress;
pub mod review;
pub mod session;
pub mod storage;
pub mod sync;

pub use config::Config;
pub use context::AppContext;
pub use events::{Event, EventBus};
pub use progress::ProgressStore;
pub use review::{Grade, Scheduler};
pub use session::{AuthState, Identity, Session};
pub use sync::SyncManager;
