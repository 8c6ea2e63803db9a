// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `aq heartbeat` — the manual-trigger entry point from spec.md §4.3:
//! runs one beat synchronously on the daemon and prints its diagnostics.

use anyhow::Result;

use crate::client::DaemonClient;
use crate::output::{format_or_json, OutputFormat};

pub async fn handle(client: &DaemonClient, output: OutputFormat) -> Result<()> {
    let report = client.trigger_heartbeat().await?;
    format_or_json(output, &report, || {
        println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
    })
}
