// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `aq status` — system status snapshot (spec.md §6 "System status").

use anyhow::Result;

use crate::client::DaemonClient;
use crate::output::{format_or_json, OutputFormat};

pub async fn handle(client: &DaemonClient, output: OutputFormat) -> Result<()> {
    let status = client.system_status().await?;
    format_or_json(output, &status, || {
        if let Some(counts) = status.get("counts").and_then(|v| v.as_object()) {
            println!("tasks by status:");
            for (status, count) in counts {
                println!("  {status:<18} {count}");
            }
        }
        match status.get("rate_limit") {
            Some(rate_limit) if !rate_limit.is_null() => {
                println!("rate limit: {}", serde_json::to_string(rate_limit).unwrap_or_default());
            }
            _ => println!("rate limit: unknown"),
        }
    })
}
