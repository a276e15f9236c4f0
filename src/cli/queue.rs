//! Offline queue commands

use std::collections::BTreeMap;
use std::sync::Arc;

use colored::Colorize;
use tabled::Tabled;

use crate::cli::OutputFormat;
use crate::cli::context::CommandContext;
use crate::error::{Error, Result};
use crate::outbox::Delivery;
use crate::output::formatters::{format_local, truncate};
use crate::output::{print_json, table::format_table};
use crate::worker::{HeadlessPlatform, OfflineQueue, QueueKind, QueuedTask, SyncReport};

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "QUEUE")]
    kind: String,
    #[tabled(rename = "URL")]
    url: String,
    #[tabled(rename = "PAYLOAD")]
    payload: String,
    #[tabled(rename = "QUEUED")]
    queued: String,
}

impl From<&QueuedTask> for TaskRow {
    fn from(task: &QueuedTask) -> Self {
        Self {
            id: task.id,
            kind: task.kind.to_string(),
            url: task.url.clone(),
            payload: truncate(&task.payload_text(), 40),
            queued: format_local(task.created_at),
        }
    }
}

fn kinds(kind: Option<QueueKind>) -> Vec<QueueKind> {
    match kind {
        Some(kind) => vec![kind],
        None => QueueKind::ALL.to_vec(),
    }
}

/// Parse repeated `NAME:VALUE` header arguments.
fn parse_headers(raw: &[String]) -> Result<BTreeMap<String, String>> {
    raw.iter()
        .map(|h| {
            let (name, value) = h
                .split_once(':')
                .ok_or_else(|| Error::Other(format!("header {:?} is not NAME:VALUE", h)))?;
            Ok((name.trim().to_lowercase(), value.trim().to_string()))
        })
        .collect()
}

/// List queued tasks, oldest first per queue
pub async fn list(ctx: &CommandContext, kind: Option<QueueKind>) -> Result<()> {
    let queue = OfflineQueue::new(Arc::new(ctx.open_queue()?), Arc::new(HeadlessPlatform));

    let mut tasks = Vec::new();
    for kind in kinds(kind) {
        tasks.extend(queue.pending(kind).await);
    }

    match ctx.format {
        OutputFormat::Json => print_json(&tasks)?,
        _ => {
            let rows: Vec<TaskRow> = tasks.iter().map(TaskRow::from).collect();
            println!("{}", format_table(&rows, "Queue is empty."));
        }
    }
    Ok(())
}

fn print_delivery(ctx: &CommandContext, delivery: &Delivery) -> Result<()> {
    match ctx.format {
        OutputFormat::Json => print_json(delivery)?,
        _ => match delivery {
            Delivery::Sent { status } => println!("{} Sent ({})", "✓".green(), status),
            Delivery::Queued { id } => println!("{} Queued as task {}", "•".yellow(), id),
            Delivery::Lost => println!("{} Could not send or queue", "✗".red()),
        },
    }
    Ok(())
}

/// Queue a form submission, or try it now with `send`
pub async fn add_form(
    ctx: &CommandContext,
    url: &str,
    body: &str,
    headers: &[String],
    send: bool,
) -> Result<()> {
    let headers = parse_headers(headers)?;
    let outbox = ctx.outbox()?;
    outbox.set_online(send);

    let delivery = outbox.submit_form(url, body.as_bytes().to_vec(), headers).await;
    print_delivery(ctx, &delivery)?;

    if delivery == Delivery::Lost {
        return Err(Error::Other("form submission was neither sent nor queued".into()));
    }
    Ok(())
}

/// Queue an analytics event, or try it now with `send`
pub async fn add_event(
    ctx: &CommandContext,
    event: &str,
    data: Option<&str>,
    send: bool,
) -> Result<()> {
    let data = match data {
        Some(raw) => serde_json::from_str(raw)?,
        None => serde_json::Value::Null,
    };
    let outbox = ctx.outbox()?;
    outbox.set_online(send);

    let delivery = outbox.track_event(event, data).await;
    print_delivery(ctx, &delivery)?;

    if delivery == Delivery::Lost {
        return Err(Error::Other("analytics event was neither sent nor queued".into()));
    }
    Ok(())
}

/// Replay queued tasks through the active worker
pub async fn sync(ctx: &CommandContext, kind: Option<QueueKind>) -> Result<()> {
    let worker = ctx.active_worker()?;

    let mut reports: BTreeMap<&'static str, SyncReport> = BTreeMap::new();
    for kind in kinds(kind) {
        let report = worker.sync(kind.sync_tag()).await;
        reports.insert(kind.as_str(), report);
    }
    worker.settle().await;

    match ctx.format {
        OutputFormat::Json => print_json(&reports)?,
        _ => {
            for (kind, report) in &reports {
                println!(
                    "{}: {} delivered, {} rejected, {} retained",
                    kind.bold(),
                    report.delivered.to_string().green(),
                    report.rejected.to_string().red(),
                    report.retained.to_string().yellow()
                );
            }
        }
    }
    Ok(())
}

/// Drop queued tasks without sending them
pub fn clear(ctx: &CommandContext, kind: Option<QueueKind>) -> Result<()> {
    let queue = ctx.open_queue()?;

    let mut removed: BTreeMap<&'static str, usize> = BTreeMap::new();
    for kind in kinds(kind) {
        removed.insert(kind.as_str(), queue.clear(kind)?);
    }

    match ctx.format {
        OutputFormat::Json => print_json(&removed)?,
        _ => {
            let total: usize = removed.values().sum();
            if total > 0 {
                println!("Removed {} queued tasks", total);
            } else {
                println!("Queue was already empty");
            }
        }
    }
    Ok(())
}
