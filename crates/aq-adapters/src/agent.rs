// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spawns, supervises, and tears down one agent-CLI process per session.
//!
//! No turn-level parsing happens here — stdout/stderr are opaque byte
//! streams copied straight to the session's log files (spec.md §1
//! Non-goals, §4.5).

use aq_core::SessionId;
use async_trait::async_trait;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum AgentAdapterError {
    #[error("failed to spawn agent CLI: {0}")]
    SpawnFailed(String),
    #[error("session {0} is not currently running")]
    NotRunning(SessionId),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything the adapter needs to launch one agent-CLI invocation.
pub struct AgentSpawnRequest {
    pub session_id: SessionId,
    pub working_dir: PathBuf,
    pub prompt: String,
    pub model: String,
    pub stdout_path: PathBuf,
    pub stderr_path: PathBuf,
}

/// Reported once the child process exits, whether cleanly or via
/// [`AgentAdapter::cancel`]. Consumed by `Scheduler::on_session_terminated`.
#[derive(Debug, Clone)]
pub struct SessionTermination {
    pub session_id: SessionId,
    pub exit_code: Option<i32>,
    pub stdout_path: PathBuf,
    pub stderr_path: PathBuf,
}

/// Spawns and supervises one agent-CLI child process per session.
#[async_trait]
pub trait AgentAdapter: Send + Sync {
    /// Launch the agent CLI. Returns once the process has started;
    /// termination is reported asynchronously on `done`.
    async fn spawn(
        &self,
        req: AgentSpawnRequest,
        done: mpsc::Sender<SessionTermination>,
    ) -> Result<(), AgentAdapterError>;

    /// Idempotent: cancelling a session that already finished (or was
    /// never supervised) is not an error, per spec.md §8.
    async fn cancel(&self, session_id: &SessionId) -> Result<(), AgentAdapterError>;

    /// Snapshot of sessions this adapter currently supervises.
    fn list_running(&self) -> Vec<SessionId>;
}

const CANCEL_GRACE: Duration = Duration::from_secs(5);

/// Real implementation: `tokio::process::Command`, stdout/stderr piped to
/// the session's log files, SIGTERM-then-SIGKILL cancellation.
pub struct RealAgentAdapter {
    /// Path or name of the agent CLI binary, e.g. `"claude"`.
    command: String,
    extra_args: Vec<String>,
    registry: Arc<Mutex<HashMap<SessionId, u32>>>,
}

impl RealAgentAdapter {
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into(), extra_args: Vec::new(), registry: Arc::new(Mutex::new(HashMap::new())) }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }
}

#[async_trait]
impl AgentAdapter for RealAgentAdapter {
    async fn spawn(
        &self,
        req: AgentSpawnRequest,
        done: mpsc::Sender<SessionTermination>,
    ) -> Result<(), AgentAdapterError> {
        let mut command = tokio::process::Command::new(&self.command);
        command
            .args(&self.extra_args)
            .arg("--model")
            .arg(&req.model)
            .arg(&req.prompt)
            .current_dir(&req.working_dir)
            .kill_on_drop(true)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child =
            command.spawn().map_err(|e| AgentAdapterError::SpawnFailed(e.to_string()))?;
        let pid = child.id().ok_or_else(|| {
            AgentAdapterError::SpawnFailed("child exited before a pid was assigned".to_string())
        })?;
        self.registry.lock().insert(req.session_id, pid);

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_path = req.stdout_path.clone();
        let stderr_path = req.stderr_path.clone();
        let stdout_file = tokio::fs::File::create(&stdout_path).await?;
        let stderr_file = tokio::fs::File::create(&stderr_path).await?;

        let registry = self.registry.clone();
        let session_id = req.session_id;
        tokio::spawn(async move {
            let copy_out = async {
                if let Some(mut s) = stdout {
                    let mut f = stdout_file;
                    let _ = tokio::io::copy(&mut s, &mut f).await;
                }
            };
            let copy_err = async {
                if let Some(mut s) = stderr {
                    let mut f = stderr_file;
                    let _ = tokio::io::copy(&mut s, &mut f).await;
                }
            };
            tokio::join!(copy_out, copy_err);

            let exit_code = match child.wait().await {
                Ok(status) => status.code(),
                Err(e) => {
                    tracing::warn!(session = %session_id, error = %e, "failed to wait on agent child");
                    None
                }
            };
            registry.lock().remove(&session_id);
            let report = SessionTermination { session_id, exit_code, stdout_path, stderr_path };
            if done.send(report).await.is_err() {
                tracing::warn!(session = %session_id, "session termination receiver dropped");
            }
        });

        Ok(())
    }

    async fn cancel(&self, session_id: &SessionId) -> Result<(), AgentAdapterError> {
        let pid = match self.registry.lock().get(session_id).copied() {
            Some(pid) => pid,
            None => return Ok(()),
        };
        let nix_pid = Pid::from_raw(pid as i32);
        let _ = kill(nix_pid, Signal::SIGTERM);
        tokio::time::sleep(CANCEL_GRACE).await;
        if self.registry.lock().contains_key(session_id) {
            let _ = kill(nix_pid, Signal::SIGKILL);
        }
        Ok(())
    }

    fn list_running(&self) -> Vec<SessionId> {
        self.registry.lock().keys().copied().collect()
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeAgentAdapter;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex as PMutex;

    /// Scriptable test double: `spawn` immediately reports termination
    /// with the configured exit code instead of launching a process.
    pub struct FakeAgentAdapter {
        pub exit_code: i32,
        running: PMutex<Vec<SessionId>>,
        spawned: PMutex<Vec<SessionId>>,
        cancelled: PMutex<Vec<SessionId>>,
    }

    impl Default for FakeAgentAdapter {
        fn default() -> Self {
            Self {
                exit_code: 0,
                running: PMutex::new(Vec::new()),
                spawned: PMutex::new(Vec::new()),
                cancelled: PMutex::new(Vec::new()),
            }
        }
    }

    impl FakeAgentAdapter {
        pub fn with_exit_code(exit_code: i32) -> Self {
            Self { exit_code, ..Self::default() }
        }

        pub fn spawned(&self) -> Vec<SessionId> {
            self.spawned.lock().clone()
        }

        pub fn cancelled(&self) -> Vec<SessionId> {
            self.cancelled.lock().clone()
        }
    }

    #[async_trait]
    impl AgentAdapter for FakeAgentAdapter {
        async fn spawn(
            &self,
            req: AgentSpawnRequest,
            done: mpsc::Sender<SessionTermination>,
        ) -> Result<(), AgentAdapterError> {
            self.spawned.lock().push(req.session_id);
            self.running.lock().push(req.session_id);
            let report = SessionTermination {
                session_id: req.session_id,
                exit_code: Some(self.exit_code),
                stdout_path: req.stdout_path,
                stderr_path: req.stderr_path,
            };
            let _ = done.send(report).await;
            Ok(())
        }

        async fn cancel(&self, session_id: &SessionId) -> Result<(), AgentAdapterError> {
            self.cancelled.lock().push(*session_id);
            self.running.lock().retain(|id| id != session_id);
            Ok(())
        }

        fn list_running(&self) -> Vec<SessionId> {
            self.running.lock().clone()
        }
    }
}
