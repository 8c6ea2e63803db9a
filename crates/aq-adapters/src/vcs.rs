// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git worktree and pull-request plumbing, shelled out to `git` and `gh`.
//!
//! Every call that mutates a repo's worktree metadata is serialized per
//! repository — concurrent `git worktree add`/`remove` against the same
//! repo race on `.git/worktrees/` bookkeeping (spec.md §4.6).

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("{operation} timed out after {timeout:?}")]
    Timeout { operation: String, timeout: Duration },
    #[error("{operation} failed: {stderr}")]
    CommandFailed { operation: String, stderr: String },
    #[error("could not run {operation}: {0}", operation = .1)]
    Spawn(std::io::Error, String),
    #[error("worktree listing from git was not in the expected porcelain format: {0}")]
    UnparseableListing(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeEntry {
    pub path: PathBuf,
    pub branch: Option<String>,
    pub head: Option<String>,
}

const GIT_TIMEOUT: Duration = Duration::from_secs(30);
const PUSH_TIMEOUT: Duration = Duration::from_secs(120);
const PR_TIMEOUT: Duration = Duration::from_secs(120);

/// Git worktree lifecycle and PR creation for one task's isolated checkout.
#[async_trait]
pub trait VcsAdapter: Send + Sync {
    /// Create a worktree at `path`, branched from `base` off `repo_dir`.
    async fn create_worktree(
        &self,
        repo_dir: &Path,
        path: &Path,
        branch: &str,
        base: &str,
    ) -> Result<(), VcsError>;

    /// Stage and commit everything in the worktree, then push the branch.
    /// Returns the resulting commit sha. A no-op diff still produces an
    /// empty commit, since the caller only reaches here after confirming
    /// the agent ran (spec.md §4.2).
    async fn commit_and_push(
        &self,
        worktree: &Path,
        branch: &str,
        message: &str,
    ) -> Result<String, VcsError>;

    /// Open a pull request for `branch` against `base` via the `gh` CLI.
    /// Returns the PR URL.
    async fn create_pr(
        &self,
        repo_dir: &Path,
        branch: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<String, VcsError>;

    /// Best-effort: unregister and delete the worktree directory.
    async fn remove_worktree(&self, repo_dir: &Path, worktree: &Path) -> Result<(), VcsError>;

    /// Best-effort: delete the branch, local and (if requested) remote.
    async fn delete_branch(&self, repo_dir: &Path, branch: &str, remote_too: bool) -> Result<(), VcsError>;

    /// List worktrees currently registered against `repo_dir`, used by
    /// `Scheduler::cleanup_stale_worktrees` to reconcile disk state against
    /// the store (spec.md §4.6).
    async fn list_worktrees(&self, repo_dir: &Path) -> Result<Vec<WorktreeEntry>, VcsError>;
}

/// Shells out to `git` and `gh`, serializing mutating calls per repository.
pub struct RealVcsAdapter {
    repo_locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl Default for RealVcsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl RealVcsAdapter {
    pub fn new() -> Self {
        Self { repo_locks: Mutex::new(HashMap::new()) }
    }

    fn lock_for(&self, repo_dir: &Path) -> Arc<tokio::sync::Mutex<()>> {
        self.repo_locks
            .lock()
            .entry(repo_dir.to_path_buf())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

/// Runs `command`, killing it if it outlives `timeout`. Neither `git` nor
/// `gh` offer a built-in deadline for network-touching subcommands (push,
/// pr create), so this is the one place that guards against a hung process
/// pinning a worker slot forever.
async fn run_with_timeout(
    mut command: Command,
    timeout: Duration,
    operation: &str,
) -> Result<std::process::Output, VcsError> {
    command.kill_on_drop(true);
    let child = command.spawn().map_err(|e| VcsError::Spawn(e, operation.to_string()))?;
    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(VcsError::Spawn(e, operation.to_string())),
        Err(_) => Err(VcsError::Timeout { operation: operation.to_string(), timeout }),
    }
}

fn require_success(output: std::process::Output, operation: &str) -> Result<std::process::Output, VcsError> {
    if output.status.success() {
        Ok(output)
    } else {
        Err(VcsError::CommandFailed {
            operation: operation.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

#[async_trait]
impl VcsAdapter for RealVcsAdapter {
    async fn create_worktree(
        &self,
        repo_dir: &Path,
        path: &Path,
        branch: &str,
        base: &str,
    ) -> Result<(), VcsError> {
        let lock = self.lock_for(repo_dir);
        let _guard = lock.lock().await;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| VcsError::Spawn(e, "create worktree parent dir".to_string()))?;
        }

        let mut command = Command::new("git");
        command
            .arg("-C")
            .arg(repo_dir)
            .args(["worktree", "add", "-b", branch, &path.display().to_string(), base])
            .env_remove("GIT_DIR")
            .env_remove("GIT_WORK_TREE");
        let output = run_with_timeout(command, GIT_TIMEOUT, "git worktree add").await?;
        require_success(output, "git worktree add")?;
        Ok(())
    }

    async fn commit_and_push(
        &self,
        worktree: &Path,
        branch: &str,
        message: &str,
    ) -> Result<String, VcsError> {
        let mut add = Command::new("git");
        add.arg("-C").arg(worktree).args(["add", "-A"]);
        require_success(run_with_timeout(add, GIT_TIMEOUT, "git add").await?, "git add")?;

        let mut commit = Command::new("git");
        commit.arg("-C").arg(worktree).args(["commit", "--allow-empty", "-m", message]);
        require_success(run_with_timeout(commit, GIT_TIMEOUT, "git commit").await?, "git commit")?;

        let mut push = Command::new("git");
        push.arg("-C").arg(worktree).args(["push", "--set-upstream", "origin", branch]);
        require_success(run_with_timeout(push, PUSH_TIMEOUT, "git push").await?, "git push")?;

        let mut rev_parse = Command::new("git");
        rev_parse.arg("-C").arg(worktree).args(["rev-parse", "HEAD"]);
        let output =
            require_success(run_with_timeout(rev_parse, GIT_TIMEOUT, "git rev-parse").await?, "git rev-parse")?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn create_pr(
        &self,
        repo_dir: &Path,
        branch: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<String, VcsError> {
        let mut command = Command::new("gh");
        command
            .current_dir(repo_dir)
            .args(["pr", "create", "--head", branch, "--base", base, "--title", title, "--body", body]);
        let output = require_success(run_with_timeout(command, PR_TIMEOUT, "gh pr create").await?, "gh pr create")?;
        let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if url.is_empty() {
            return Err(VcsError::CommandFailed {
                operation: "gh pr create".to_string(),
                stderr: "gh returned no PR URL on stdout".to_string(),
            });
        }
        Ok(url)
    }

    async fn remove_worktree(&self, repo_dir: &Path, worktree: &Path) -> Result<(), VcsError> {
        let lock = self.lock_for(repo_dir);
        let _guard = lock.lock().await;

        let mut command = Command::new("git");
        command.arg("-C").arg(repo_dir).args(["worktree", "remove", "--force"]).arg(worktree);
        let output = run_with_timeout(command, GIT_TIMEOUT, "git worktree remove").await?;
        if !output.status.success() {
            tracing::warn!(
                path = %worktree.display(),
                stderr = %String::from_utf8_lossy(&output.stderr),
                "git worktree remove failed, falling back to rm -rf"
            );
        }
        if worktree.exists() {
            tokio::fs::remove_dir_all(worktree)
                .await
                .map_err(|e| VcsError::Spawn(e, "remove worktree directory".to_string()))?;
        }
        Ok(())
    }

    async fn delete_branch(&self, repo_dir: &Path, branch: &str, remote_too: bool) -> Result<(), VcsError> {
        let lock = self.lock_for(repo_dir);
        let _guard = lock.lock().await;

        let mut local = Command::new("git");
        local.arg("-C").arg(repo_dir).args(["branch", "-D", branch]);
        let output = run_with_timeout(local, GIT_TIMEOUT, "git branch -D").await?;
        if !output.status.success() {
            tracing::warn!(
                branch,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "best-effort local branch delete failed"
            );
        }

        if remote_too {
            let mut remote = Command::new("git");
            remote.arg("-C").arg(repo_dir).args(["push", "origin", "--delete", branch]);
            let output = run_with_timeout(remote, PUSH_TIMEOUT, "git push --delete").await?;
            if !output.status.success() {
                tracing::warn!(
                    branch,
                    stderr = %String::from_utf8_lossy(&output.stderr),
                    "best-effort remote branch delete failed"
                );
            }
        }
        Ok(())
    }

    async fn list_worktrees(&self, repo_dir: &Path) -> Result<Vec<WorktreeEntry>, VcsError> {
        let mut command = Command::new("git");
        command.arg("-C").arg(repo_dir).args(["worktree", "list", "--porcelain"]);
        let output = require_success(run_with_timeout(command, GIT_TIMEOUT, "git worktree list").await?, "git worktree list")?;
        parse_worktree_listing(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parses `git worktree list --porcelain` output: blank-line-separated
/// stanzas of `key value` lines, `worktree` starting each stanza.
fn parse_worktree_listing(text: &str) -> Result<Vec<WorktreeEntry>, VcsError> {
    let mut entries = Vec::new();
    let mut path: Option<PathBuf> = None;
    let mut branch: Option<String> = None;
    let mut head: Option<String> = None;

    let flush = |path: &mut Option<PathBuf>, branch: &mut Option<String>, head: &mut Option<String>, out: &mut Vec<WorktreeEntry>| {
        if let Some(p) = path.take() {
            out.push(WorktreeEntry { path: p, branch: branch.take(), head: head.take() });
        }
    };

    for line in text.lines() {
        if line.is_empty() {
            flush(&mut path, &mut branch, &mut head, &mut entries);
            continue;
        }
        if let Some(value) = line.strip_prefix("worktree ") {
            flush(&mut path, &mut branch, &mut head, &mut entries);
            path = Some(PathBuf::from(value));
        } else if let Some(value) = line.strip_prefix("branch ") {
            branch = Some(value.trim_start_matches("refs/heads/").to_string());
        } else if let Some(value) = line.strip_prefix("HEAD ") {
            head = Some(value.to_string());
        }
    }
    flush(&mut path, &mut branch, &mut head, &mut entries);

    if entries.is_empty() && !text.trim().is_empty() {
        return Err(VcsError::UnparseableListing(text.to_string()));
    }
    Ok(entries)
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeVcsAdapter;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;

    struct FakeState {
        worktrees: Vec<WorktreeEntry>,
        next_commit_sha: String,
        next_pr_url: String,
        deleted_branches: Vec<String>,
    }

    /// In-memory double: records every call, never touches disk or a
    /// subprocess.
    pub struct FakeVcsAdapter {
        state: Mutex<FakeState>,
    }

    impl Default for FakeVcsAdapter {
        fn default() -> Self {
            Self {
                state: Mutex::new(FakeState {
                    worktrees: Vec::new(),
                    next_commit_sha: "deadbeef".to_string(),
                    next_pr_url: "https://example.invalid/pr/1".to_string(),
                    deleted_branches: Vec::new(),
                }),
            }
        }
    }

    impl FakeVcsAdapter {
        pub fn set_next_commit_sha(&self, sha: impl Into<String>) {
            self.state.lock().next_commit_sha = sha.into();
        }

        pub fn set_next_pr_url(&self, url: impl Into<String>) {
            self.state.lock().next_pr_url = url.into();
        }

        pub fn deleted_branches(&self) -> Vec<String> {
            self.state.lock().deleted_branches.clone()
        }
    }

    #[async_trait]
    impl VcsAdapter for FakeVcsAdapter {
        async fn create_worktree(
            &self,
            _repo_dir: &Path,
            path: &Path,
            branch: &str,
            _base: &str,
        ) -> Result<(), VcsError> {
            self.state.lock().worktrees.push(WorktreeEntry {
                path: path.to_path_buf(),
                branch: Some(branch.to_string()),
                head: None,
            });
            Ok(())
        }

        async fn commit_and_push(
            &self,
            _worktree: &Path,
            _branch: &str,
            _message: &str,
        ) -> Result<String, VcsError> {
            Ok(self.state.lock().next_commit_sha.clone())
        }

        async fn create_pr(
            &self,
            _repo_dir: &Path,
            _branch: &str,
            _base: &str,
            _title: &str,
            _body: &str,
        ) -> Result<String, VcsError> {
            Ok(self.state.lock().next_pr_url.clone())
        }

        async fn remove_worktree(&self, _repo_dir: &Path, worktree: &Path) -> Result<(), VcsError> {
            self.state.lock().worktrees.retain(|w| w.path != worktree);
            Ok(())
        }

        async fn delete_branch(&self, _repo_dir: &Path, branch: &str, _remote_too: bool) -> Result<(), VcsError> {
            self.state.lock().deleted_branches.push(branch.to_string());
            Ok(())
        }

        async fn list_worktrees(&self, _repo_dir: &Path) -> Result<Vec<WorktreeEntry>, VcsError> {
            Ok(self.state.lock().worktrees.clone())
        }
    }
}
