//! Review state persistence
//!
//! One entry per tracked item in the `review` namespace of the local store,
//! keyed by item id.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::algorithm;
use super::models::{Grade, ReviewEntry, ReviewState};
use crate::events::Event;
use crate::storage::LocalStore;

pub const REVIEW_NAMESPACE: &str = "review";

pub struct ReviewStorage {
    store: Arc<LocalStore>,
}

impl ReviewStorage {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self { store }
    }

    fn notify(&self, item_id: &str) {
        self.store.events().emit(&Event::ReviewChanged {
            item_id: item_id.to_string(),
        });
    }

    pub fn get_state(&self, item_id: &str) -> Option<ReviewState> {
        self.store.try_get(REVIEW_NAMESPACE, item_id)
    }

    pub fn is_tracked(&self, item_id: &str) -> bool {
        self.get_state(item_id).is_some()
    }

    /// All tracked items, ordered by item id
    pub fn list(&self) -> Vec<ReviewEntry> {
        self.store
            .keys(REVIEW_NAMESPACE)
            .into_iter()
            .filter_map(|item_id| {
                self.get_state(&item_id)
                    .map(|state| ReviewEntry { item_id, state })
            })
            .collect()
    }

    /// Start tracking an item. An already tracked item keeps its state.
    pub fn add(&self, item_id: &str) -> ReviewState {
        if let Some(state) = self.get_state(item_id) {
            return state;
        }
        let state = ReviewState::new();
        self.store.set(REVIEW_NAMESPACE, item_id, &state);
        self.notify(item_id);
        state
    }

    /// Stop tracking an item. Returns false if it was not tracked.
    pub fn remove(&self, item_id: &str) -> bool {
        if !self.is_tracked(item_id) {
            return false;
        }
        self.store.remove(REVIEW_NAMESPACE, item_id);
        self.notify(item_id);
        true
    }

    /// Grade an item, creating its state on first grade
    pub fn submit_grade(&self, item_id: &str, outcome: Grade, now: DateTime<Utc>) -> ReviewState {
        let state = self.get_state(item_id).unwrap_or_default();
        let next = algorithm::grade(&state, outcome, now);

        self.store.set(REVIEW_NAMESPACE, item_id, &next);
        log::debug!(
            "Review: {} graded {} -> interval {}d, ease {:.2}",
            item_id,
            outcome,
            next.interval_days,
            next.ease
        );
        self.notify(item_id);

        next
    }
}
