// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Logging setup: `tracing` + `tracing-subscriber`, with structured fields
//! rather than interpolated strings (spec.md §6), and optional file-rotated
//! output through `tracing-appender` when `log_dir` is configured.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Returns a [`WorkerGuard`] when file logging is enabled — it must be kept
/// alive for the lifetime of the process, or the non-blocking writer drops
/// buffered lines on exit.
pub fn init(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "aqd.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(non_blocking)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
    }
}
