// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations — each maps onto one HTTP façade operation
//! from spec.md §6.

pub mod events;
pub mod heartbeat;
pub mod session;
pub mod status;
pub mod task;

use anyhow::Result;
use clap::Subcommand;

use crate::client::DaemonClient;

#[derive(Subcommand)]
pub enum Command {
    /// Submit, list, and manage tasks
    #[command(subcommand)]
    Task(task::TaskCommand),
    /// Inspect sessions and stream their captured output
    #[command(subcommand)]
    Session(session::SessionCommand),
    /// Print the system status snapshot (counts by status, rate-limit)
    Status {
        #[arg(long, value_enum, default_value_t)]
        output: crate::output::OutputFormat,
    },
    /// Stream events from the EventBus as they are emitted
    Events,
    /// Trigger one heartbeat beat synchronously and print its diagnostics
    Heartbeat {
        #[arg(long, value_enum, default_value_t)]
        output: crate::output::OutputFormat,
    },
}

pub async fn dispatch(command: Command, client: &DaemonClient) -> Result<()> {
    match command {
        Command::Task(cmd) => task::handle(cmd, client).await,
        Command::Session(cmd) => session::handle(cmd, client).await,
        Command::Status { output } => status::handle(client, output).await,
        Command::Events => events::handle(client).await,
        Command::Heartbeat { output } => heartbeat::handle(client, output).await,
    }
}

/// Parse a `key=value` pair, used by `--var` flags that build a metadata patch.
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) => Ok((k.to_string(), v.to_string())),
        None => Err(format!("expected key=value, got {s:?}")),
    }
}
