use std::path::Path;

use anyhow::{Context, Result};

use recall_lib::review::algorithm::format_interval;
use recall_lib::review::{Grade, ReviewState};

use crate::app::{paint, App, Color};
use crate::OutputFormat;

fn describe(state: &ReviewState) -> String {
    let due = match state.due_at {
        Some(at) => at.format("%Y-%m-%d %H:%M").to_string(),
        None => "now".to_string(),
    };
    format!(
        "ease {:.2}, interval {}, due {}",
        state.ease,
        format_interval(state.interval_days),
        due
    )
}

pub fn run_add(app: &App, item_ids: &[String], format: &OutputFormat) -> Result<()> {
    let added: Vec<_> = item_ids
        .iter()
        .map(|id| (id, app.scheduler.add(id)))
        .collect();

    match format {
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = added
                .iter()
                .map(|(id, state)| serde_json::json!({ "itemId": id, "state": state }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            for (id, _) in &added {
                println!("Tracking {}", id);
            }
        }
    }
    Ok(())
}

pub fn run_remove(app: &App, item_id: &str, format: &OutputFormat) -> Result<()> {
    let removed = app.scheduler.remove(item_id);
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "itemId": item_id, "removed": removed }));
        }
        OutputFormat::Plain if removed => println!("Stopped tracking {}", item_id),
        OutputFormat::Plain => println!("{} was not tracked", item_id),
    }
    Ok(())
}

pub fn run_due(
    app: &App,
    pool: Option<&Path>,
    limit: usize,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let pool = app.load_pool(pool)?;
    let due = app.scheduler.due(&pool);
    let shown = &due[..due.len().min(limit)];

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(shown)?);
        }
        OutputFormat::Plain => {
            if shown.is_empty() {
                println!("Nothing due");
            }
            for entry in shown {
                let marker = if entry.state.is_seen() {
                    paint("due", Color::YELLOW, use_color)
                } else {
                    paint("new", Color::GREEN, use_color)
                };
                println!(
                    "{:<5} {}  {}",
                    marker,
                    entry.item_id,
                    paint(&describe(&entry.state), Color::GRAY, use_color)
                );
            }
            if due.len() > shown.len() {
                println!("... and {} more", due.len() - shown.len());
            }
        }
    }
    Ok(())
}

pub fn run_next(
    app: &mut App,
    pool: Option<&Path>,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let pool = app.load_pool(pool)?;
    let next = app.scheduler.next(&pool).cloned();

    match (format, next) {
        (OutputFormat::Json, next) => {
            println!("{}", serde_json::to_string_pretty(&next)?);
        }
        (OutputFormat::Plain, None) => println!("Nothing to review"),
        (OutputFormat::Plain, Some(item)) => {
            let title = if item.title.is_empty() { &item.item_id } else { &item.title };
            println!("{}", paint(title, Color::BOLD, use_color));
            println!("  ID: {}", item.item_id);
            if !item.topic.is_empty() {
                println!("  Topic: {}", item.topic);
            }
        }
    }
    Ok(())
}

pub fn run_grade(app: &App, item_id: &str, outcome: &str, format: &OutputFormat) -> Result<()> {
    let state = app
        .scheduler
        .grade_str(item_id, outcome)
        .context("Expected one of: ok, bad, skip")?;

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({ "itemId": item_id, "state": state }))?
            );
        }
        OutputFormat::Plain => println!("{}: {}", item_id, describe(&state)),
    }
    Ok(())
}

pub fn run_preview(app: &App, item_id: &str, format: &OutputFormat) -> Result<()> {
    let intervals = app.scheduler.preview(item_id);

    match format {
        OutputFormat::Json => {
            let output: serde_json::Map<String, serde_json::Value> = Grade::ALL
                .iter()
                .zip(intervals)
                .map(|(grade, days)| (grade.as_str().to_string(), days.into()))
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            for (grade, days) in Grade::ALL.iter().zip(intervals) {
                println!("{:<5} {}", grade.as_str(), format_interval(days));
            }
        }
    }
    Ok(())
}

pub fn run_stats(app: &App, pool: Option<&Path>, format: &OutputFormat) -> Result<()> {
    let pool = app.load_pool(pool)?;
    let stats = app.scheduler.stats(&pool);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Plain => {
            println!("Pool:    {}", stats.pool_size);
            println!("Tracked: {}", stats.tracked);
            println!("Due:     {}", stats.due);
            println!("Unseen:  {}", stats.unseen);
            println!(
                "Grades:  {} ok, {} bad, {} skip",
                stats.ok_total, stats.bad_total, stats.skip_total
            );
        }
    }
    Ok(())
}
