use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::context::AppContext;
use crate::events::{Event, EventBus, SubscriptionId};
use crate::progress::{ProgressStore, SyncSnapshot};
use crate::session::{AuthState, Identity, Session};

use super::config::{SkipReason, SyncOutcome, SyncReport, SyncStatus, SyncTrigger};
use super::merge::merge_snapshots;
use super::remote::{FieldUpdate, ProgressRecord, RemoteError, RemoteStore};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),
    #[error("Not authenticated")]
    NotAuthenticated,
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// Holds the in-flight flag for the duration of one pass
struct PassGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> PassGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Work derived from one bus event
#[derive(Debug, Default, PartialEq)]
struct Plan {
    update: Option<FieldUpdate>,
    trigger: Option<SyncTrigger>,
}

#[derive(Default)]
struct StatusInner {
    last_sync: Option<DateTime<Utc>>,
    last_report: Option<SyncReport>,
}

/// Keeps local progress and the remote record converged.
///
/// Full passes merge local and remote snapshots (union for the flag sets,
/// newest wins for last-opened) and write the result to both sides. Single
/// flag changes are also pushed immediately as fire-and-forget upserts.
pub struct SyncManager {
    session: Arc<Session>,
    progress: ProgressStore,
    remote: Arc<dyn RemoteStore>,
    in_flight: AtomicBool,
    /// Bumped on every sign-out
    generation: AtomicU64,
    /// Generation and user of the last completed pass
    synced: Mutex<Option<(u64, String)>>,
    status: Mutex<StatusInner>,
}

impl SyncManager {
    pub fn new(ctx: &AppContext, remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            session: Arc::clone(&ctx.session),
            progress: ProgressStore::new(Arc::clone(&ctx.store)),
            remote,
            in_flight: AtomicBool::new(false),
            generation: AtomicU64::new(1),
            synced: Mutex::new(None),
            status: Mutex::new(StatusInner::default()),
        }
    }

    /// Whether a pass completed for the current user since the last sign-out
    pub fn is_synced(&self) -> bool {
        match self.session.identity() {
            Some(identity) => self.is_synced_as(&identity.user_id),
            None => false,
        }
    }

    fn is_synced_as(&self, user_id: &str) -> bool {
        let generation = self.generation.load(Ordering::Acquire);
        matches!(
            &*self.synced.lock().unwrap(),
            Some((synced_generation, synced_user))
                if *synced_generation == generation && synced_user == user_id
        )
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn last_report(&self) -> Option<SyncReport> {
        self.status.lock().unwrap().last_report.clone()
    }

    pub fn status(&self) -> SyncStatus {
        let inner = self.status.lock().unwrap();
        SyncStatus {
            in_flight: self.is_in_flight(),
            synced: self.is_synced(),
            last_sync: inner.last_sync,
            last_report: inner.last_report.clone(),
        }
    }

    /// Forget that this session was synced. Data already merged stays put.
    pub fn clear_synced_marker(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        log::debug!("Sync: synced marker cleared");
    }

    fn identity(&self) -> Result<Identity> {
        self.session.identity().ok_or(SyncError::NotAuthenticated)
    }

    /// Run one full merge pass
    pub async fn full_sync(&self, trigger: SyncTrigger) -> SyncReport {
        let report = self.run_pass(trigger).await;
        let mut inner = self.status.lock().unwrap();
        if report.is_completed() {
            inner.last_sync = Some(Utc::now());
        }
        inner.last_report = Some(report.clone());
        report
    }

    async fn run_pass(&self, trigger: SyncTrigger) -> SyncReport {
        let identity = match self.identity() {
            Ok(identity) => identity,
            Err(_) => return SyncReport::skipped(trigger, SkipReason::NotAuthenticated),
        };

        let generation = self.generation.load(Ordering::Acquire);
        if trigger.honors_synced_marker() && self.is_synced_as(&identity.user_id) {
            log::debug!("Sync: {:?} ignored, session already synced", trigger);
            return SyncReport::skipped(trigger, SkipReason::AlreadySynced);
        }

        let _guard = match PassGuard::acquire(&self.in_flight) {
            Some(guard) => guard,
            None => {
                log::debug!("Sync: {:?} dropped, pass already in flight", trigger);
                return SyncReport::skipped(trigger, SkipReason::InFlight);
            }
        };

        let started = Instant::now();
        log::info!("Sync: starting pass for {} ({:?})", identity.user_id, trigger);

        let local = self.progress.snapshot();
        let (remote, remote_fetched) = match self.remote.fetch(&identity).await {
            Ok(record) => (record.into_snapshot(), true),
            Err(e) => {
                log::warn!("Sync: remote fetch failed, merging local only: {}", e);
                (SyncSnapshot::default(), false)
            }
        };

        let merged = merge_snapshots(&local, &remote);
        if merged != local {
            self.progress.apply_snapshot(&merged);
        }
        *self.synced.lock().unwrap() = Some((generation, identity.user_id.clone()));

        let pushed = match self.push(&identity, &merged).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Sync: push failed, keeping local state: {}", e);
                false
            }
        };

        log::info!(
            "Sync: pass done ({} read, {} favorites, fetched={}, pushed={})",
            merged.read.len(),
            merged.favorites.len(),
            remote_fetched,
            pushed
        );

        SyncReport {
            trigger,
            outcome: SyncOutcome::Completed {
                remote_fetched,
                pushed,
            },
            read_count: merged.read.len(),
            favorite_count: merged.favorites.len(),
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    async fn push(&self, identity: &Identity, merged: &SyncSnapshot) -> Result<()> {
        let record = ProgressRecord::from(merged);
        self.remote.replace(identity, &record).await?;
        Ok(())
    }

    /// Send a single-field update. Failures are logged and dropped; the next
    /// full pass reconciles.
    pub async fn push_update(&self, update: &FieldUpdate) {
        let identity = match self.identity() {
            Ok(identity) => identity,
            Err(_) => return,
        };
        if let Err(e) = self.remote.upsert(&identity, update).await {
            log::debug!("Sync: upsert for {} failed: {}", update.item_id(), e);
        }
    }

    /// Window or application regained focus
    pub async fn focus(&self) -> SyncReport {
        self.full_sync(SyncTrigger::Focus).await
    }

    fn plan(event: &Event) -> Plan {
        match event {
            Event::AuthChanged(AuthState::Authenticated) => Plan {
                update: None,
                trigger: Some(SyncTrigger::SignIn),
            },
            Event::ReadToggled { item_id, value } => Plan {
                update: Some(FieldUpdate::read(item_id.as_str(), *value)),
                trigger: Some(SyncTrigger::FlagChanged),
            },
            Event::FavoriteToggled { item_id, value } => Plan {
                update: Some(FieldUpdate::favorite(item_id.as_str(), *value)),
                trigger: Some(SyncTrigger::FlagChanged),
            },
            Event::ItemOpened { item_id, at } => Plan {
                update: Some(FieldUpdate::opened(item_id.as_str(), Some(*at))),
                trigger: Some(SyncTrigger::Opened),
            },
            _ => Plan::default(),
        }
    }

    fn on_event(self: &Arc<Self>, event: &Event) {
        if let Event::AuthChanged(AuthState::Unauthenticated) = event {
            self.clear_synced_marker();
            return;
        }

        let plan = Self::plan(event);
        if plan == Plan::default() || !self.session.is_authenticated() {
            return;
        }

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                log::debug!("Sync: no async runtime, skipping work for {:?}", event);
                return;
            }
        };

        let manager = Arc::clone(self);
        handle.spawn(async move {
            if let Some(update) = plan.update {
                manager.push_update(&update).await;
            }
            if let Some(trigger) = plan.trigger {
                manager.full_sync(trigger).await;
            }
        });
    }

    /// Subscribe to auth transitions and progress events on `bus`.
    ///
    /// The listener only holds a weak reference, so dropping the last
    /// `Arc<SyncManager>` turns it into a no-op.
    pub fn attach(self: &Arc<Self>, bus: &EventBus) -> SubscriptionId {
        let weak = Arc::downgrade(self);
        bus.subscribe(move |event| {
            if let Some(manager) = weak.upgrade() {
                manager.on_event(event);
            }
        })
    }
}
