use std::sync::Arc;

use crate::config::Config;
use crate::events::{Event, EventBus};
use crate::progress::default_aliases;
use crate::session::{AuthState, Identity, Session};
use crate::storage::{LegacyWritePolicy, LocalStore};

/// Shared handles used by the scheduler, the progress store and the sync engine
#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<LocalStore>,
    pub events: Arc<EventBus>,
    pub session: Arc<Session>,
}

impl AppContext {
    /// Open the durable store under the configured data directory. Without a
    /// usable directory the store runs memory-only.
    pub fn open(config: &Config) -> Self {
        let events = Arc::new(EventBus::new());
        let aliases = default_aliases(config.aliases.legacy_write_policy);
        let store = match config.data_dir() {
            Some(dir) => LocalStore::open(&dir, aliases, Arc::clone(&events)),
            None => {
                log::warn!("No data directory available, progress will not persist");
                LocalStore::in_memory(aliases, Arc::clone(&events))
            }
        };
        Self::with_store(Arc::new(store), events)
    }

    pub fn in_memory() -> Self {
        let events = Arc::new(EventBus::new());
        let store = LocalStore::in_memory(
            default_aliases(LegacyWritePolicy::Collapse),
            Arc::clone(&events),
        );
        Self::with_store(Arc::new(store), events)
    }

    fn with_store(store: Arc<LocalStore>, events: Arc<EventBus>) -> Self {
        Self {
            store,
            events,
            session: Arc::new(Session::new()),
        }
    }

    pub fn sign_in(&self, identity: Identity) {
        log::info!("Signed in as {}", identity.user_id);
        self.session.sign_in(identity);
        self.events.emit(&Event::AuthChanged(AuthState::Authenticated));
    }

    pub fn sign_out(&self) {
        self.session.sign_out();
        self.events
            .emit(&Event::AuthChanged(AuthState::Unauthenticated));
    }
}
