use anyhow::{bail, Result};

use recall_lib::sync::{SyncOutcome, SyncReport, SyncTrigger};

use crate::app::{paint, App, Color};
use crate::OutputFormat;

pub fn summarize(report: &SyncReport) -> String {
    match &report.outcome {
        SyncOutcome::Skipped { reason } => format!("skipped ({:?})", reason),
        SyncOutcome::Completed {
            remote_fetched,
            pushed,
        } => {
            let mut text = format!(
                "{} read, {} favorites in {} ms",
                report.read_count, report.favorite_count, report.duration_ms
            );
            if !remote_fetched {
                text.push_str(", remote unreachable");
            }
            if !pushed {
                text.push_str(", push failed");
            }
            text
        }
    }
}

pub fn run(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    if !app.is_signed_in() {
        bail!("Sync needs an identity; pass --user");
    }

    let report = app.full_sync(SyncTrigger::Manual);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Plain => {
            let label = if report.is_completed() {
                paint("Synced", Color::GREEN, use_color)
            } else {
                paint("Not synced", Color::YELLOW, use_color)
            };
            println!("{}: {}", label, summarize(&report));
        }
    }
    Ok(())
}
