//! Reusable formatting utilities for CLI output

use chrono::{DateTime, Local, Utc};

/// Format Unix seconds as local `YYYY-MM-DD HH:MM`, or "unknown".
pub fn format_unix_seconds(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(format_local)
        .unwrap_or_else(|| "unknown".to_string())
}

/// Format a UTC instant as local `YYYY-MM-DD HH:MM`.
pub fn format_local(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// Format bytes as human-readable size
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;
    const GB: usize = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Shorten long values for table cells, keeping the start.
pub fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let kept: String = value.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", kept)
}
