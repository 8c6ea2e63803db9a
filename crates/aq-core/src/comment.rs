// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Comment entity: notes attached to a task, e.g. by the AssessmentEngine.

use crate::task::TaskId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique external identifier for a comment.
    pub struct CommentId("cmt-");
}

/// A comment attached to a task. Deleted cascade with the task per spec.md §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub task_id: TaskId,
    pub content: String,
    pub author: String,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

crate::builder! {
    pub struct CommentBuilder => Comment {
        into {
            content: String = "looks good",
            author: String = "assessment-engine",
        }
        set {
            task_id: TaskId = TaskId::new(),
        }
        computed {
            id: CommentId = CommentId::new(),
            created_at_ms: i64 = 1_000_000,
            updated_at_ms: i64 = 1_000_000,
        }
    }
}
