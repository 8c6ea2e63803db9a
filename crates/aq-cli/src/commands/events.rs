// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `aq events` — tail the EventBus over SSE (spec.md §6 "Event stream").
//! At-most-once: a gap dropped for this CLI's own connection is never
//! replayed (spec.md §4.8), matching the same contract the web UI lives
//! with.

use anyhow::Result;
use futures::StreamExt;

use crate::client::DaemonClient;

pub async fn handle(client: &DaemonClient) -> Result<()> {
    let mut stream = Box::pin(client.event_stream().await?);
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let text = String::from_utf8_lossy(&chunk);
        for line in text.lines() {
            if let Some(data) = line.strip_prefix("data:") {
                let data = data.trim_start();
                if !data.is_empty() {
                    println!("{data}");
                }
            }
        }
    }
    Ok(())
}
