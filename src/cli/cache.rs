//! Response cache management commands

use tabled::Tabled;

use crate::cli::OutputFormat;
use crate::cli::context::CommandContext;
use crate::error::Result;
use crate::output::formatters::{format_size, format_unix_seconds, truncate};
use crate::output::{print_json, table::format_table};
use crate::store::SqliteResponseCache;
use crate::worker::CacheNamespaces;

#[derive(Tabled)]
struct NamespaceRow {
    #[tabled(rename = "NAMESPACE")]
    name: String,
    #[tabled(rename = "ENTRIES")]
    entries: usize,
    #[tabled(rename = "SIZE")]
    size: String,
    #[tabled(rename = "CREATED")]
    created: String,
    #[tabled(rename = "CURRENT")]
    current: String,
}

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "NAMESPACE")]
    namespace: String,
    #[tabled(rename = "REQUEST")]
    request: String,
    #[tabled(rename = "STATUS")]
    status: u16,
    #[tabled(rename = "SIZE")]
    size: String,
    #[tabled(rename = "STORED")]
    stored: String,
}

/// Show cache status/statistics
pub fn status(ctx: &CommandContext) -> Result<()> {
    let cache = ctx.open_cache()?;
    let stats = cache.stats()?;
    let namespaces = cache.namespace_stats()?;
    let current = CacheNamespaces::from_config(&ctx.config.worker.cache);

    match ctx.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "path": cache.root().display().to_string(),
                "namespaces": namespaces,
                "total_entries": stats.total_entries,
                "blob_entries": stats.blob_entries,
                "total_size_bytes": stats.total_size_bytes,
                "total_size_human": format_size(stats.total_size_bytes),
                "oldest_entry_timestamp": stats.oldest_entry,
                "newest_entry_timestamp": stats.newest_entry,
            });
            print_json(&json)?;
        }
        OutputFormat::Table => {
            let rows: Vec<NamespaceRow> = namespaces
                .into_iter()
                .map(|ns| NamespaceRow {
                    current: if current.is_current(&ns.name) { "yes" } else { "no" }.to_string(),
                    name: ns.name,
                    entries: ns.entries,
                    size: format_size(ns.size_bytes),
                    created: format_unix_seconds(ns.created_at),
                })
                .collect();
            println!("{}", format_table(&rows, "Cache is empty."));
        }
        OutputFormat::Pretty => {
            println!("Cache Status");
            println!("────────────────────────────────────────");
            println!("Location:       {}", cache.root().display());
            println!("Namespaces:     {}", stats.namespaces);
            println!("Entries:        {}", stats.total_entries);
            println!("Blob entries:   {}", stats.blob_entries);
            println!("Total size:     {}", format_size(stats.total_size_bytes));

            if let Some(oldest) = stats.oldest_entry {
                println!("Oldest entry:   {}", format_unix_seconds(oldest));
            }
            if let Some(newest) = stats.newest_entry {
                println!("Newest entry:   {}", format_unix_seconds(newest));
            }

            for ns in &namespaces {
                let marker = if current.is_current(&ns.name) { "" } else { " (stale)" };
                println!(
                    "  {}{}: {} entries, {}",
                    ns.name,
                    marker,
                    ns.entries,
                    format_size(ns.size_bytes)
                );
            }
        }
    }

    Ok(())
}

/// List cached entries
pub fn list(ctx: &CommandContext, namespace: Option<&str>) -> Result<()> {
    let cache = ctx.open_cache()?;
    let entries = cache.entries(namespace)?;

    match ctx.format {
        OutputFormat::Json => print_json(&entries)?,
        _ => {
            let rows: Vec<EntryRow> = entries
                .into_iter()
                .map(|e| EntryRow {
                    namespace: e.namespace,
                    request: truncate(&e.request_key, 60),
                    status: e.status,
                    size: if e.is_blob {
                        format!("{} (blob)", format_size(e.size_bytes))
                    } else {
                        format_size(e.size_bytes)
                    },
                    stored: format_unix_seconds(e.created_at),
                })
                .collect();
            println!("{}", format_table(&rows, "No cached entries."));
        }
    }

    Ok(())
}

/// Clear all namespaces and entries
pub fn clear(ctx: &CommandContext) -> Result<()> {
    let cache = ctx.open_cache()?;
    let stats = cache.clear_all()?;

    match ctx.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "namespaces_removed": stats.namespaces_removed,
                "entries_removed": stats.entries_removed,
                "success": true,
            });
            print_json(&json)?;
        }
        _ => {
            if stats.namespaces_removed > 0 {
                println!(
                    "Cleared {} namespaces ({} entries)",
                    stats.namespaces_removed, stats.entries_removed
                );
            } else {
                println!("Cache was already empty");
            }
        }
    }

    Ok(())
}

/// Show cache path
pub fn path(ctx: &CommandContext) -> Result<()> {
    let path = match &ctx.config.storage.cache_dir {
        Some(dir) => dir.clone(),
        None => SqliteResponseCache::cache_dir()?,
    };
    println!("{}", path.display());
    Ok(())
}
