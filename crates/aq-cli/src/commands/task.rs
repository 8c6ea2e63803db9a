// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `aq task` — submit, list, patch, cancel, reorder, and set-status on
//! tasks (spec.md §6's task operations).

use anyhow::Result;
use clap::{Subcommand, ValueEnum};
use serde_json::Value;

use aq_core::TaskId;

use crate::client::{CreateTaskInput, DaemonClient};
use crate::output::{format_or_json, format_time_ago, handle_list, OutputFormat};
use crate::table::{Column, Table};

use super::parse_key_value;

#[derive(Subcommand)]
pub enum TaskCommand {
    /// List all tasks
    List {
        #[arg(long, value_enum, default_value_t)]
        output: OutputFormat,
    },
    /// Show one task by id
    Show {
        id: String,
        #[arg(long, value_enum, default_value_t)]
        output: OutputFormat,
    },
    /// Submit a new task
    Submit {
        title: String,
        description: String,
        #[arg(long, default_value_t = 0)]
        priority: i64,
        #[arg(long, default_value_t = 0)]
        position: i64,
        #[arg(long)]
        parent: Option<String>,
        #[arg(long)]
        project: String,
        /// Gate the task for execution immediately (sets metadata.active=true)
        #[arg(long)]
        active: bool,
        /// Additional metadata entries (repeatable: --var key=value)
        #[arg(long = "var", value_parser = parse_key_value)]
        var: Vec<(String, String)>,
        #[arg(long, value_enum, default_value_t)]
        output: OutputFormat,
    },
    /// Merge a metadata patch into a task (null values delete the key)
    Patch {
        id: String,
        /// Metadata patch as a JSON object
        metadata: String,
    },
    /// Cancel a task (triggers AgentAdapter.cancel for its active session)
    Cancel { id: String },
    /// Reorder tasks: pairs of `id:position`
    Reorder {
        #[arg(required = true)]
        entries: Vec<String>,
    },
    /// Force a task's status directly (bypasses the normal state machine)
    SetStatus { id: String, status: TaskStatusArg },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum TaskStatusArg {
    Pending,
    Assessing,
    Decomposed,
    Executing,
    ReadyForReview,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatusArg {
    fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Assessing => "assessing",
            Self::Decomposed => "decomposed",
            Self::Executing => "executing",
            Self::ReadyForReview => "ready_for_review",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

pub async fn handle(command: TaskCommand, client: &DaemonClient) -> Result<()> {
    match command {
        TaskCommand::List { output } => list(client, output).await,
        TaskCommand::Show { id, output } => show(client, &id, output).await,
        TaskCommand::Submit { title, description, priority, position, parent, project, active, var, output } => {
            submit(client, title, description, priority, position, parent, project, active, var, output).await
        }
        TaskCommand::Patch { id, metadata } => patch(client, &id, &metadata).await,
        TaskCommand::Cancel { id } => cancel(client, &id).await,
        TaskCommand::Reorder { entries } => reorder(client, &entries).await,
        TaskCommand::SetStatus { id, status } => set_status(client, &id, status).await,
    }
}

async fn list(client: &DaemonClient, output: OutputFormat) -> Result<()> {
    let tasks = client.list_tasks().await?;
    handle_list(output, &tasks, "No tasks found", |tasks, out| {
        let mut table = Table::new(vec![
            Column::new("ID", 25),
            Column::new("STATUS", 16),
            Column::new("TITLE", 40),
            Column::new("AGE", 6),
        ]);
        for task in tasks {
            table.push_row(vec![
                task.id.as_str().to_string(),
                task.status.to_string(),
                task.title.clone(),
                format_time_ago(task.created_at_ms),
            ]);
        }
        table.print(out);
    })
}

async fn show(client: &DaemonClient, id: &str, output: OutputFormat) -> Result<()> {
    let tasks = client.list_tasks().await?;
    let task = tasks
        .into_iter()
        .find(|t| t.id.as_str() == id)
        .ok_or_else(|| anyhow::anyhow!("no task {id}"))?;
    format_or_json(output, &task, || {
        println!("{} [{}]", task.title, task.id);
        println!("  status:      {}", task.status);
        println!("  description: {}", task.description);
        println!("  priority:    {}", task.priority);
        println!("  position:    {}", task.position);
        if let Some(complexity) = &task.complexity {
            println!("  complexity:  {complexity}");
        }
        if let Some(model) = &task.recommended_model {
            println!("  model:       {model}");
        }
        if let Some(session) = &task.active_session_id {
            println!("  session:     {session}");
        }
        if let Some(pr_url) = task.metadata.pr_url() {
            println!("  pr:          {pr_url}");
        }
    })
}

#[allow(clippy::too_many_arguments)]
async fn submit(
    client: &DaemonClient,
    title: String,
    description: String,
    priority: i64,
    position: i64,
    parent: Option<String>,
    project: String,
    active: bool,
    var: Vec<(String, String)>,
    output: OutputFormat,
) -> Result<()> {
    let mut metadata = serde_json::Map::new();
    if active {
        metadata.insert("active".to_string(), Value::Bool(true));
    }
    for (key, value) in var {
        metadata.insert(key, Value::String(value));
    }
    let input = CreateTaskInput {
        project_id: &project,
        title: &title,
        description: &description,
        priority,
        position,
        parent_id: parent.as_deref(),
        metadata: Value::Object(metadata),
    };
    let task = client.create_task(&input).await?;
    format_or_json(output, &task, || println!("created task {} ({})", task.id, task.title))
}

async fn patch(client: &DaemonClient, id: &str, metadata: &str) -> Result<()> {
    let patch: Value = serde_json::from_str(metadata)?;
    client.patch_task_metadata(&TaskId::from_string(id), patch).await?;
    println!("patched task {id}");
    Ok(())
}

async fn cancel(client: &DaemonClient, id: &str) -> Result<()> {
    client.cancel_task(&TaskId::from_string(id)).await?;
    println!("cancelled task {id}");
    Ok(())
}

async fn reorder(client: &DaemonClient, entries: &[String]) -> Result<()> {
    let mut positions = Vec::with_capacity(entries.len());
    for entry in entries {
        let (id, pos) = entry
            .split_once(':')
            .ok_or_else(|| anyhow::anyhow!("expected id:position, got {entry:?}"))?;
        let pos: i64 = pos.parse()?;
        positions.push((TaskId::from_string(id), pos));
    }
    client.reorder_tasks(&positions).await?;
    println!("reordered {} task(s)", positions.len());
    Ok(())
}

async fn set_status(client: &DaemonClient, id: &str, status: TaskStatusArg) -> Result<()> {
    client.set_task_status(&TaskId::from_string(id), status.as_str()).await?;
    println!("task {id} status set to {}", status.as_str());
    Ok(())
}
