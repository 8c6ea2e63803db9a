// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session identifier, status, and the session entity.

use crate::task::TaskId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

crate::define_id! {
    /// Unique external identifier for one agent-CLI invocation.
    pub struct SessionId("ses-");
}

/// Lifecycle of a single agent-CLI invocation, per spec.md §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Created,
    Running,
    Completed,
    Failed,
    Cancelled,
}

crate::simple_display! {
    SessionStatus {
        Created => "created",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl SessionStatus {
    /// True while this session counts against `count_running_sessions()`
    /// and the at-most-one-active-session-per-task invariant.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Created | Self::Running)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// One invocation of the agent CLI, tied to exactly one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub task_id: TaskId,
    pub working_dir: PathBuf,
    pub model: String,
    pub status: SessionStatus,
    pub turn_count: u32,
    pub stdout_path: PathBuf,
    pub stderr_path: PathBuf,
    pub process_id: Option<u32>,
    pub exit_code: Option<i32>,
    /// Best-effort, optional; see spec.md §9 open question (i) — never
    /// consulted by the state machine itself.
    pub claude_session_id: Option<String>,
    /// Opaque session-to-session handoff data.
    #[serde(default)]
    pub artifacts: Map<String, Value>,
    pub created_at_ms: i64,
    pub started_at_ms: Option<i64>,
    pub completed_at_ms: Option<i64>,
    pub last_heartbeat_at_ms: Option<i64>,
}

crate::builder! {
    pub struct SessionBuilder => Session {
        into {
            model: String = "sonnet",
        }
        set {
            task_id: TaskId = TaskId::new(),
            working_dir: PathBuf = PathBuf::from("/tmp/test-worktree"),
            status: SessionStatus = SessionStatus::Created,
            turn_count: u32 = 0,
            stdout_path: PathBuf = PathBuf::from("/tmp/test-worktree/stdout.log"),
            stderr_path: PathBuf = PathBuf::from("/tmp/test-worktree/stderr.log"),
            artifacts: Map<String, Value> = Map::new(),
        }
        option {
            process_id: u32 = None,
            exit_code: i32 = None,
            claude_session_id: String = None,
            started_at_ms: i64 = None,
            completed_at_ms: i64 = None,
            last_heartbeat_at_ms: i64 = None,
        }
        computed {
            id: SessionId = SessionId::new(),
            created_at_ms: i64 = 1_000_000,
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
