use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::algorithm;
use super::models::{ContentItem, Grade, ReviewEntry, ReviewState, ReviewStats};
use super::storage::ReviewStorage;
use super::ReviewError;
use crate::context::AppContext;

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Picks what to review next from a content pool and records grades
pub struct Scheduler<R: Rng = StdRng> {
    storage: ReviewStorage,
    rng: R,
    clock: Clock,
}

impl Scheduler<StdRng> {
    pub fn new(ctx: &AppContext) -> Self {
        Self::with_rng(ctx, StdRng::from_entropy())
    }
}

impl<R: Rng> Scheduler<R> {
    pub fn with_rng(ctx: &AppContext, rng: R) -> Self {
        Self {
            storage: ReviewStorage::new(ctx.store.clone()),
            rng,
            clock: Box::new(Utc::now),
        }
    }

    /// Replace the wall clock, mostly for tests
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    pub fn storage(&self) -> &ReviewStorage {
        &self.storage
    }

    /// Tracked items of the pool, in pool order, without duplicates
    pub fn candidates(&self, pool: &[ContentItem]) -> Vec<ReviewEntry> {
        let mut seen = HashSet::new();
        pool.iter()
            .filter(|item| seen.insert(item.item_id.as_str()))
            .filter_map(|item| {
                self.storage.get_state(&item.item_id).map(|state| ReviewEntry {
                    item_id: item.item_id.clone(),
                    state,
                })
            })
            .collect()
    }

    /// Due tracked items, highest priority first
    pub fn due(&self, pool: &[ContentItem]) -> Vec<ReviewEntry> {
        let now = self.now();
        let candidates = self.candidates(pool);
        algorithm::rank(&candidates, now)
            .into_iter()
            .filter(|entry| algorithm::is_due(&entry.state, now))
            .cloned()
            .collect()
    }

    /// The item to present next, or `None` when nothing in the pool is tracked
    pub fn next<'a>(&mut self, pool: &'a [ContentItem]) -> Option<&'a ContentItem> {
        let now = self.now();
        let candidates = self.candidates(pool);
        let picked = algorithm::select_next(&candidates, &mut self.rng, now)?;
        pool.iter().find(|item| item.item_id == picked.item_id)
    }

    pub fn add(&self, item_id: &str) -> ReviewState {
        self.storage.add(item_id)
    }

    pub fn remove(&self, item_id: &str) -> bool {
        self.storage.remove(item_id)
    }

    pub fn grade(&self, item_id: &str, outcome: Grade) -> ReviewState {
        self.storage.submit_grade(item_id, outcome, self.now())
    }

    /// Grade from user-supplied text; unknown outcomes are rejected
    pub fn grade_str(&self, item_id: &str, outcome: &str) -> Result<ReviewState, ReviewError> {
        let outcome: Grade = outcome.parse()?;
        Ok(self.grade(item_id, outcome))
    }

    /// Intervals OK, BAD and SKIP would give this item
    pub fn preview(&self, item_id: &str) -> [u32; 3] {
        let state = self.storage.get_state(item_id).unwrap_or_default();
        algorithm::preview_intervals(&state, self.now())
    }

    pub fn stats(&self, pool: &[ContentItem]) -> ReviewStats {
        let now = self.now();
        let candidates = self.candidates(pool);

        let mut stats = ReviewStats {
            pool_size: pool.len(),
            tracked: candidates.len(),
            ..ReviewStats::default()
        };

        for entry in &candidates {
            if algorithm::is_due(&entry.state, now) {
                stats.due += 1;
            }
            if !entry.state.is_seen() {
                stats.unseen += 1;
            }
            stats.ok_total = stats.ok_total.saturating_add(entry.state.counters.ok);
            stats.bad_total = stats.bad_total.saturating_add(entry.state.counters.bad);
            stats.skip_total = stats.skip_total.saturating_add(entry.state.counters.skip);
        }

        stats
    }
}
