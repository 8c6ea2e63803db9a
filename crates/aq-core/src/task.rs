// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task identifier, status, and the task entity itself.

use crate::metadata::TaskMetadata;
use crate::project::ProjectId;
use crate::session::SessionId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique external identifier for a task.
    pub struct TaskId("tsk-");
}

/// A task's position in the state machine described in spec.md §4.2.
///
/// `Pending` covers both "unassessed" (complexity is `None`) and "assessed"
/// (complexity is `Some`) — the two sub-states spec.md's table distinguishes
/// are derived from `Task::complexity`, not separate variants, so a task
/// can never be ambiguously "pending" without also being checkable for
/// whether it has been classified yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Assessing,
    Decomposed,
    Executing,
    ReadyForReview,
    Completed,
    Failed,
    Cancelled,
}

crate::simple_display! {
    TaskStatus {
        Pending => "pending",
        Assessing => "assessing",
        Decomposed => "decomposed",
        Executing => "executing",
        ReadyForReview => "ready_for_review",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl TaskStatus {
    /// True once a task can no longer be scheduled for further work.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Decomposed | Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Dotted event-type fragment for this state, e.g. `"ready_for_review"`
    /// combines with the `task.` namespace prefix per spec.md §6.
    pub fn event_fragment(&self) -> &'static str {
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

/// A user-submitted coding task tracked through the queue.
///
/// `seq` is the Store's internal monotonic insertion sequence, used only
/// for the `(position, priority, id)` scheduling tie-break described in
/// spec.md §4.2 — it is never exposed outside the Store/Scheduler pair as
/// a stand-in for identity; `id` is the only identifier every other
/// component should use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub seq: i64,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: i64,
    pub position: i64,
    pub parent_id: Option<TaskId>,
    /// Free string per spec.md §4.4 ("Complexity values ... are free strings").
    pub complexity: Option<String>,
    /// Free string hint passed to the AgentAdapter as a model label.
    pub recommended_model: Option<String>,
    pub active_session_id: Option<SessionId>,
    pub metadata: TaskMetadata,
    pub created_at_ms: i64,
    pub started_at_ms: Option<i64>,
    pub completed_at_ms: Option<i64>,
}

impl Task {
    /// The `(position, priority, id)` scheduling key from spec.md §4.2,
    /// higher priority first, position ascending, id ascending as the
    /// final tie-break.
    pub fn schedule_key(&self) -> (i64, std::cmp::Reverse<i64>, i64) {
        (self.position, std::cmp::Reverse(self.priority), self.seq)
    }

    pub fn is_unassessed(&self) -> bool {
        self.status == TaskStatus::Pending && self.complexity.is_none()
    }

    pub fn is_executable(&self) -> bool {
        self.status == TaskStatus::Pending && self.complexity.is_some() && self.metadata.active()
    }
}

crate::builder! {
    pub struct TaskBuilder => Task {
        into {
            title: String = "test task",
            description: String = "do the thing",
        }
        set {
            project_id: ProjectId = ProjectId::new(),
            seq: i64 = 0,
            status: TaskStatus = TaskStatus::Pending,
            priority: i64 = 0,
            position: i64 = 0,
            metadata: TaskMetadata = TaskMetadata::new(),
        }
        option {
            parent_id: TaskId = None,
            complexity: String = None,
            recommended_model: String = None,
            active_session_id: SessionId = None,
            started_at_ms: i64 = None,
            completed_at_ms: i64 = None,
        }
        computed {
            id: TaskId = TaskId::new(),
            created_at_ms: i64 = 1_000_000,
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
