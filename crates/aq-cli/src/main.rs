// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `aq` — operator entry point for the agent-queue orchestration daemon.
//!
//! A thin clap CLI that talks to `aqd` over the same HTTP façade the web
//! UI would use (spec.md §1, §6, SPEC_FULL.md §2): submit a task, inspect
//! or stream its sessions, trigger a manual heartbeat, and print status.
//! No orchestration logic lives here.

mod client;
mod color;
mod commands;
mod exit_error;
mod output;
mod table;

use clap::{CommandFactory, FromArgMatches, Parser};
use exit_error::ExitError;

#[derive(Parser)]
#[command(name = "aq", about = "Operator CLI for the agent-queue daemon")]
struct Cli {
    /// Override the daemon base URL (defaults to AQ_HOST/AQ_PORT, see aqd's config).
    #[arg(long, global = true, env = "AQ_DAEMON_URL")]
    daemon_url: Option<String>,

    #[command(subcommand)]
    command: commands::Command,
}

#[tokio::main]
async fn main() {
    let matches = Cli::command().styles(color::styles()).get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());
    let client = client::DaemonClient::new(cli.daemon_url.unwrap_or_else(client::default_base_url));

    if let Err(err) = commands::dispatch(cli.command, &client).await {
        match err.downcast::<ExitError>() {
            Ok(exit_err) => {
                eprintln!("error: {}", exit_err.message);
                std::process::exit(exit_err.code);
            }
            Err(err) => {
                eprintln!("error: {err:#}");
                std::process::exit(1);
            }
        }
    }
}
