// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `aq session` — inspect one agent-CLI invocation and stream its captured
//! output (spec.md §6 "Get session details, stream session output").

use anyhow::Result;
use clap::Subcommand;
use futures::StreamExt;

use aq_core::SessionId;

use crate::client::DaemonClient;
use crate::output::{format_or_json, OutputFormat};

#[derive(Subcommand)]
pub enum SessionCommand {
    /// Show one session's lifecycle details
    Show {
        id: String,
        #[arg(long, value_enum, default_value_t)]
        output: OutputFormat,
    },
    /// Stream a session's captured stdout as it is produced
    Logs { id: String },
}

pub async fn handle(command: SessionCommand, client: &DaemonClient) -> Result<()> {
    match command {
        SessionCommand::Show { id, output } => show(client, &id, output).await,
        SessionCommand::Logs { id } => logs(client, &id).await,
    }
}

async fn show(client: &DaemonClient, id: &str, output: OutputFormat) -> Result<()> {
    let session = client
        .get_session(&SessionId::from_string(id))
        .await?
        .ok_or_else(|| anyhow::anyhow!("no session {id}"))?;
    format_or_json(output, &session, || {
        println!("session {} (task {})", session.id, session.task_id);
        println!("  status:     {}", session.status);
        println!("  model:      {}", session.model);
        println!("  turns:      {}", session.turn_count);
        if let Some(pid) = session.process_id {
            println!("  pid:        {pid}");
        }
        if let Some(code) = session.exit_code {
            println!("  exit code:  {code}");
        }
        println!("  worktree:   {}", session.working_dir.display());
        println!("  stdout:     {}", session.stdout_path.display());
        println!("  stderr:     {}", session.stderr_path.display());
    })
}

async fn logs(client: &DaemonClient, id: &str) -> Result<()> {
    let session_id = SessionId::from_string(id);
    let mut stream = Box::pin(client.session_output_stream(&session_id).await?);
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        // SSE framing ("event: ...\ndata: ...\n\n") is opaque to this CLI
        // per spec.md §1 — only the `data:` payload is ever printed.
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
