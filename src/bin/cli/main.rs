mod app;
mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "recall-cli", about = "Spaced-repetition review and progress sync", version)]
struct Cli {
    /// Config file (default: <config dir>/recall/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Act as this learner; enables sync with the remote store
    #[arg(long, global = true)]
    user: Option<String>,

    /// Bearer token sent along with --user
    #[arg(long, global = true, requires = "user")]
    token: Option<String>,

    /// Use an in-memory remote instead of the configured server
    #[arg(long, global = true)]
    offline: bool,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Start tracking items for review
    Add {
        #[arg(required = true)]
        item_ids: Vec<String>,
    },

    /// Stop tracking an item
    Remove { item_id: String },

    /// List due items, highest priority first
    Due {
        /// JSON file with the content listing (default: every tracked item)
        #[arg(long)]
        pool: Option<PathBuf>,
        /// Maximum results
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Pick the next item to review
    Next {
        #[arg(long)]
        pool: Option<PathBuf>,
    },

    /// Record a review outcome (ok, bad or skip)
    Grade { item_id: String, outcome: String },

    /// Show the intervals each outcome would give an item
    Preview { item_id: String },

    /// Review statistics
    Stats {
        #[arg(long)]
        pool: Option<PathBuf>,
    },

    /// Mark an item read
    Read {
        item_id: String,
        /// Mark unread instead
        #[arg(long)]
        unset: bool,
    },

    /// Mark an item favorite
    Fav {
        item_id: String,
        /// Remove from favorites instead
        #[arg(long)]
        unset: bool,
    },

    /// Record that an item was opened
    Open { item_id: String },

    /// Show local progress flags
    Progress,

    /// Run a full sync pass now
    Sync,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let use_color = !cli.no_color && atty_check();

    let mut app = app::App::new(app::Options {
        config_path: cli.config,
        user: cli.user,
        token: cli.token,
        offline: cli.offline,
    })?;

    match cli.command {
        Command::Add { item_ids } => {
            commands::review::run_add(&app, &item_ids, &cli.format)?;
        }
        Command::Remove { item_id } => {
            commands::review::run_remove(&app, &item_id, &cli.format)?;
        }
        Command::Due { pool, limit } => {
            commands::review::run_due(&app, pool.as_deref(), limit, &cli.format, use_color)?;
        }
        Command::Next { pool } => {
            commands::review::run_next(&mut app, pool.as_deref(), &cli.format, use_color)?;
        }
        Command::Grade { item_id, outcome } => {
            commands::review::run_grade(&app, &item_id, &outcome, &cli.format)?;
        }
        Command::Preview { item_id } => {
            commands::review::run_preview(&app, &item_id, &cli.format)?;
        }
        Command::Stats { pool } => {
            commands::review::run_stats(&app, pool.as_deref(), &cli.format)?;
        }
        Command::Read { item_id, unset } => {
            commands::progress::run_read(&app, &item_id, !unset, &cli.format)?;
        }
        Command::Fav { item_id, unset } => {
            commands::progress::run_favorite(&app, &item_id, !unset, &cli.format)?;
        }
        Command::Open { item_id } => {
            commands::progress::run_open(&app, &item_id, &cli.format)?;
        }
        Command::Progress => {
            commands::progress::run_show(&app, &cli.format, use_color)?;
        }
        Command::Sync => {
            commands::sync::run(&app, &cli.format, use_color)?;
        }
    }

    Ok(())
}

/// Check if stdout is a terminal (for color support)
fn atty_check() -> bool {
    use std::io::IsTerminal;
    std::io::stdout().is_terminal()
}
