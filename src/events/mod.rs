//! In-process change notifications
//!
//! Dispatch is synchronous: `emit` calls every listener registered at that
//! moment before returning. Nothing is queued and late subscribers never see
//! earlier events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::session::AuthState;

/// A state change observed by the core
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ReadToggled { item_id: String, value: bool },
    FavoriteToggled { item_id: String, value: bool },
    ItemOpened { item_id: String, at: DateTime<Utc> },
    ReviewChanged { item_id: String },
    AuthChanged(AuthState),
    /// A merged sync snapshot was written into the local store
    SnapshotApplied,
    /// Low-level notification for every local store write
    StoreChanged { namespace: String, key: String },
}

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Default)]
pub struct EventBus {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap()
            .push((id, Arc::new(listener)));
        id
    }

    /// Returns false if the subscription was already gone
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock().unwrap();
        let before = listeners.len();
        listeners.retain(|(sid, _)| *sid != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    pub fn emit(&self, event: &Event) {
        // Snapshot the registry so listeners may subscribe, unsubscribe or
        // emit without deadlocking.
        let current: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        log::trace!("events: {:?} -> {} listener(s)", event, current.len());

        for listener in current {
            listener(event);
        }
    }
}
