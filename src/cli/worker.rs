//! Worker lifecycle and event commands

use colored::Colorize;
use reqwest::Method;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::cli::context::CommandContext;
use crate::error::{ConfigError, Error, Result};
use crate::output::print_json;
use crate::worker::{Dispatch, Request};

/// Install: open namespaces and pre-cache.
pub async fn install(ctx: &CommandContext) -> Result<()> {
    let worker = ctx.fresh_worker()?;
    let report = worker.install().await?;
    worker.settle().await;

    match ctx.format {
        OutputFormat::Json => print_json(&report)?,
        _ => {
            println!(
                "{} Pre-cached {} assets, worker is {}",
                "✓".green(),
                report.cached,
                report.state.to_string().bold()
            );
            for failure in &report.failed {
                println!(
                    "  {} {} ({}): {}",
                    "✗".red(),
                    failure.path,
                    failure.namespace,
                    failure.reason
                );
            }
        }
    }
    Ok(())
}

/// Activate: evict old namespaces and claim clients.
pub async fn activate(ctx: &CommandContext) -> Result<()> {
    let worker = ctx.installed_worker()?;
    let report = worker.activate().await?;
    worker.settle().await;

    match ctx.format {
        OutputFormat::Json => print_json(&report)?,
        _ => {
            println!("{} Worker is {}", "✓".green(), worker.state().to_string().bold());
            if report.deleted.is_empty() {
                println!("  No stale namespaces");
            }
            for name in &report.deleted {
                println!("  {} deleted {}", "•".dimmed(), name);
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct FetchOutput {
    url: String,
    strategy: Option<&'static str>,
    status: u16,
    content_type: Option<String>,
    body: String,
}

/// Answer a request through the active worker.
pub async fn fetch(ctx: &CommandContext, url: &str, navigate: bool, method: &str) -> Result<()> {
    let worker = ctx.active_worker()?;
    let target = worker
        .manifest()
        .resolve(url)
        .ok_or_else(|| ConfigError::Invalid(format!("cannot resolve URL {:?}", url)))?;
    let method: Method = method
        .to_uppercase()
        .parse()
        .map_err(|_| Error::Other(format!("invalid HTTP method {:?}", method)))?;

    let mut request = if navigate {
        Request::navigate(target.clone())
    } else {
        Request::get(target.clone())
    };
    request.method = method;

    let (response, strategy) = match worker.handle_fetch(&request).await {
        Dispatch::Respond(response, strategy) => (response, Some(strategy)),
        Dispatch::Passthrough => {
            log::debug!("{} {} passed through", request.method, request.url);
            let network = ctx.ports()?.network;
            (network.fetch(&request).await?, None)
        }
    };
    worker.settle().await;

    let output = FetchOutput {
        url: target.to_string(),
        strategy: strategy.map(|s| s.as_str()),
        status: response.status,
        content_type: response.header("content-type").map(str::to_string),
        body: response.text(),
    };

    match ctx.format {
        OutputFormat::Json => print_json(&output)?,
        _ => {
            let status = if response.is_success() {
                output.status.to_string().green()
            } else {
                output.status.to_string().red()
            };
            eprintln!(
                "{} {} via {}",
                status,
                output.url,
                output.strategy.unwrap_or("network")
            );
            print!("{}", output.body);
        }
    }
    Ok(())
}

/// Post a control message to the worker.
pub async fn message(ctx: &CommandContext, json: &str) -> Result<()> {
    let message: serde_json::Value = serde_json::from_str(json)?;
    let worker = ctx.installed_worker()?;
    let reply = worker.handle_message(&message).await?;
    worker.settle().await;

    match ctx.format {
        OutputFormat::Json => print_json(&reply)?,
        _ => println!("{}", serde_json::to_string(&reply)?),
    }
    Ok(())
}

/// Render a push payload as the notification the worker would show.
pub async fn push(ctx: &CommandContext, payload: Option<&str>) -> Result<()> {
    let worker = ctx.active_worker()?;
    let notification = worker.handle_push(payload.map(str::as_bytes)).await?;

    match ctx.format {
        OutputFormat::Json => print_json(&notification)?,
        _ => {
            println!("{}", notification.title.bold());
            println!("{}", notification.body);
            println!("{} {}", "→".dimmed(), notification.data.url);
        }
    }
    Ok(())
}
