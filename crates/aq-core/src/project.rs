// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project entity: a named repository root that tasks are submitted against.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

crate::define_id! {
    /// Unique external identifier for a project.
    pub struct ProjectId("prj-");
}

/// A git repository the daemon manages tasks, worktrees, and branches for.
///
/// `name` is unique (enforced by aq-store) and is the human-facing handle
/// used in branch slugs and CLI output; `working_dir` is the canonical
/// checkout that per-task worktrees are created alongside.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub working_dir: PathBuf,
    pub vcs_origin: Option<String>,
    /// Branch `VcsAdapter::create_worktree` branches new task worktrees
    /// from, per spec.md §4.2 ("base = default branch of the task's
    /// project").
    pub default_branch: String,
    pub created_at_ms: i64,
}

crate::builder! {
    pub struct ProjectBuilder => Project {
        into {
            name: String = "demo-project",
            default_branch: String = "main",
        }
        set {
            working_dir: PathBuf = PathBuf::from("/tmp/demo-project"),
        }
        option {
            vcs_origin: String = None,
        }
        computed {
            id: ProjectId = ProjectId::new(),
            created_at_ms: i64 = 1_000_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_produces_distinct_ids() {
        let a = Project::builder().build();
        let b = Project::builder().build();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn vcs_origin_defaults_to_none() {
        let project = Project::builder().build();
        assert!(project.vcs_origin.is_none());
    }
}
