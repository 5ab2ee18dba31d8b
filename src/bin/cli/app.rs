use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::runtime::Runtime;

use recall_lib::progress::ProgressStore;
use recall_lib::review::{ContentItem, Scheduler};
use recall_lib::sync::{
    FieldUpdate, HttpRemoteStore, MemoryRemoteStore, RemoteStore, SyncManager, SyncReport,
    SyncTrigger,
};
use recall_lib::{AppContext, Config, Identity};

/// ANSI color codes
pub struct Color;

impl Color {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const GRAY: &str = "\x1b[90m";
}

pub fn paint(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("{}{}{}", color, text, Color::RESET)
    } else {
        text.to_string()
    }
}

pub struct Options {
    pub config_path: Option<PathBuf>,
    pub user: Option<String>,
    pub token: Option<String>,
    pub offline: bool,
}

/// Shared application state for CLI commands
pub struct App {
    pub ctx: AppContext,
    pub scheduler: Scheduler,
    pub progress: ProgressStore,
    pub sync: Arc<SyncManager>,
    runtime: Runtime,
}

impl App {
    pub fn new(options: Options) -> Result<Self> {
        let config_path = match options.config_path {
            Some(path) => path,
            None => Config::default_path().context("Failed to locate config directory")?,
        };
        let config = Config::load(&config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

        let ctx = AppContext::open(&config);

        let remote: Arc<dyn RemoteStore> = match (&config.remote.base_url, options.offline) {
            (Some(url), false) => Arc::new(
                HttpRemoteStore::new(url, &config.remote)
                    .context("Failed to create remote client")?,
            ),
            _ => {
                log::info!("Using in-memory remote store");
                Arc::new(MemoryRemoteStore::new())
            }
        };
        let sync = Arc::new(SyncManager::new(&ctx, remote));

        if let Some(user) = options.user {
            let identity = match options.token {
                Some(token) => Identity::new(user).with_token(token),
                None => Identity::new(user),
            };
            ctx.sign_in(identity);
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start async runtime")?;

        Ok(Self {
            scheduler: Scheduler::new(&ctx),
            progress: ProgressStore::new(Arc::clone(&ctx.store)),
            sync,
            ctx,
            runtime,
        })
    }

    /// Content listing from a JSON file, or every tracked item without one
    pub fn load_pool(&self, path: Option<&Path>) -> Result<Vec<ContentItem>> {
        match path {
            Some(path) => {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read pool {}", path.display()))?;
                serde_json::from_str(&content)
                    .with_context(|| format!("Invalid content pool in {}", path.display()))
            }
            None => Ok(self
                .scheduler
                .storage()
                .list()
                .into_iter()
                .map(|entry| ContentItem {
                    item_id: entry.item_id,
                    title: String::new(),
                    status: String::new(),
                    topic: String::new(),
                })
                .collect()),
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.ctx.session.is_authenticated()
    }

    /// Push one field change, then reconcile with a full pass
    pub fn sync_change(&self, update: FieldUpdate, trigger: SyncTrigger) -> Option<SyncReport> {
        if !self.is_signed_in() {
            return None;
        }
        let sync = Arc::clone(&self.sync);
        Some(self.runtime.block_on(async move {
            sync.push_update(&update).await;
            sync.full_sync(trigger).await
        }))
    }

    pub fn full_sync(&self, trigger: SyncTrigger) -> SyncReport {
        let sync = Arc::clone(&self.sync);
        self.runtime
            .block_on(async move { sync.full_sync(trigger).await })
    }
}
