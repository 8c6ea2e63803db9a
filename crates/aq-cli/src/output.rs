// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

use clap::ValueEnum;
use serde::Serialize;

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Format a timestamp (epoch ms) as relative time (e.g., "5s", "2m", "1h", "3d").
pub fn format_time_ago(epoch_ms: i64) -> String {
    if epoch_ms <= 0 {
        return "-".to_string();
    }
    let now_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64;
    let elapsed_secs = now_ms.saturating_sub(epoch_ms).max(0) / 1000;
    format_elapsed(elapsed_secs)
}

fn format_elapsed(secs: i64) -> String {
    match secs {
        s if s < 60 => format!("{s}s"),
        s if s < 3600 => format!("{}m", s / 60),
        s if s < 86_400 => format!("{}h", s / 3600),
        s => format!("{}d", s / 86_400),
    }
}

/// Info about items that were truncated by [`apply_limit`].
pub struct Truncation {
    pub remaining: usize,
}

/// Apply limit/no_limit to a vec, return truncation info if items were removed.
pub fn apply_limit<T>(items: &mut Vec<T>, limit: usize, no_limit: bool) -> Option<Truncation> {
    let total = items.len();
    let effective = if no_limit { total } else { limit };
    if total > effective {
        items.truncate(effective);
        Some(Truncation { remaining: total - effective })
    } else {
        None
    }
}

/// Render a list as text table or JSON. Handles empty check + format branch.
pub fn handle_list<T: Serialize>(
    format: OutputFormat,
    items: &[T],
    empty_msg: &str,
    render_text: impl FnOnce(&[T], &mut dyn Write),
) -> anyhow::Result<()> {
    handle_list_with_limit(format, items, empty_msg, None, render_text)
}

/// Like [`handle_list`] but prints a truncation message when items were limited.
pub fn handle_list_with_limit<T: Serialize>(
    format: OutputFormat,
    items: &[T],
    empty_msg: &str,
    truncation: Option<Truncation>,
    render_text: impl FnOnce(&[T], &mut dyn Write),
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items)?);
        }
        OutputFormat::Text => {
            if items.is_empty() {
                println!("{}", empty_msg);
            } else {
                render_text(items, &mut std::io::stdout());
            }
            if let Some(trunc) = truncation {
                if trunc.remaining > 0 {
                    println!(
                        "\n... {} more not shown. Use --no-limit or -n N to see more.",
                        trunc.remaining
                    );
                }
            }
        }
    }
    Ok(())
}

/// Format-branch helper for non-list commands (show, status, etc.).
///
/// Renders as JSON when `format` is `Json`, otherwise calls `text_fn`.
pub fn format_or_json<T: Serialize>(
    format: OutputFormat,
    data: &T,
    text_fn: impl FnOnce(),
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(data)?);
        }
        OutputFormat::Text => {
            text_fn();
        }
    }
    Ok(())
}
