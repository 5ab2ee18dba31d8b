use anyhow::Result;
use chrono::Utc;

use recall_lib::sync::{FieldUpdate, SyncReport, SyncTrigger};

use crate::app::{paint, App, Color};
use crate::OutputFormat;

fn print_change(
    item_id: &str,
    what: &str,
    value: bool,
    report: Option<SyncReport>,
    format: &OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "itemId": item_id,
                what: value,
                "sync": report,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("{}: {} = {}", item_id, what, value);
            if let Some(report) = report {
                println!("  sync: {}", super::sync::summarize(&report));
            }
        }
    }
    Ok(())
}

pub fn run_read(app: &App, item_id: &str, value: bool, format: &OutputFormat) -> Result<()> {
    app.progress.set_read(item_id, value);
    let report = app.sync_change(FieldUpdate::read(item_id, value), SyncTrigger::FlagChanged);
    print_change(item_id, "read", value, report, format)
}

pub fn run_favorite(app: &App, item_id: &str, value: bool, format: &OutputFormat) -> Result<()> {
    app.progress.set_favorite(item_id, value);
    let report = app.sync_change(
        FieldUpdate::favorite(item_id, value),
        SyncTrigger::FlagChanged,
    );
    print_change(item_id, "favorite", value, report, format)
}

pub fn run_open(app: &App, item_id: &str, format: &OutputFormat) -> Result<()> {
    let now = Utc::now();
    app.progress.mark_opened(item_id, now);
    let report = app.sync_change(FieldUpdate::opened(item_id, Some(now)), SyncTrigger::Opened);

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "itemId": item_id,
                "at": now.to_rfc3339(),
                "sync": report,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Opened {}", item_id);
            if let Some(report) = report {
                println!("  sync: {}", super::sync::summarize(&report));
            }
        }
    }
    Ok(())
}

pub fn run_show(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let snapshot = app.progress.snapshot();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        OutputFormat::Plain => {
            println!("{}", paint("Read", Color::BOLD, use_color));
            for id in &snapshot.read {
                println!("  {}", id);
            }
            println!("{}", paint("Favorites", Color::BOLD, use_color));
            for id in &snapshot.favorites {
                println!("  {}", id);
            }
            if let Some(pointer) = &snapshot.last_opened {
                println!(
                    "Last opened: {} {}",
                    pointer.item_id,
                    paint(&pointer.at.to_rfc3339(), Color::GRAY, use_color)
                );
            }
        }
    }
    Ok(())
}
