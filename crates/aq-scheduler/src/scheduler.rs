// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Scheduler: assessment, execution, session-termination handling,
//! stale-worktree reconciliation, and pending-task dedup — spec.md §4.2's
//! five operations, each callable independently so the Heartbeat can run
//! them on its own cadence.

use crate::error::SchedulerError;
use crate::slug;
use aq_adapters::{AgentAdapter, AgentSpawnRequest, AssessmentEngine, SessionTermination, VcsAdapter};
use aq_bus::EventBus;
use aq_core::{
    Clock, Comment, CommentId, Event, EventKind, Session, SessionId, SessionStatus, Task, TaskId,
    TaskMetadata, TaskStatus,
};
use aq_store::Store;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Knobs the Heartbeat wires up once at startup; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Parent directory under which each task's git worktree is created,
    /// one subdirectory per branch name.
    pub worktrees_dir: PathBuf,
    /// Parent directory under which each session's stdout/stderr logs live.
    pub sessions_dir: PathBuf,
    /// How many times assessment or the execute-phase setup steps may fail
    /// before a task is marked `failed` rather than retried, per spec.md §7.
    pub max_retries: u32,
    /// How many unassessed tasks `assess_batch` pulls per call.
    pub assess_batch_size: i64,
    /// Ceiling on sessions running at once across the whole daemon.
    pub max_concurrent_tasks: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worktrees_dir: PathBuf::from(".aq/worktrees"),
            sessions_dir: PathBuf::from(".aq/sessions"),
            max_retries: 3,
            assess_batch_size: 10,
            max_concurrent_tasks: 4,
        }
    }
}

/// Implements spec.md §4.2's state machine over the Store, driven by the
/// Heartbeat one phase at a time. Generic over [`Clock`] so tests can
/// control elapsed time without sleeping.
pub struct Scheduler<C: Clock> {
    store: Store,
    bus: Arc<EventBus>,
    assessment: Arc<dyn AssessmentEngine>,
    vcs: Arc<dyn VcsAdapter>,
    agent: Arc<dyn AgentAdapter>,
    clock: C,
    config: SchedulerConfig,
    termination_tx: mpsc::Sender<SessionTermination>,
}

impl<C: Clock> Scheduler<C> {
    /// Builds the Scheduler along with the receiving half of the
    /// termination channel every spawned [`AgentAdapter::spawn`] call
    /// reports into — the Heartbeat owns that receiver and feeds each
    /// report to [`Scheduler::on_session_terminated`].
    pub fn new(
        store: Store,
        bus: Arc<EventBus>,
        assessment: Arc<dyn AssessmentEngine>,
        vcs: Arc<dyn VcsAdapter>,
        agent: Arc<dyn AgentAdapter>,
        clock: C,
        config: SchedulerConfig,
    ) -> (Self, mpsc::Receiver<SessionTermination>) {
        let (termination_tx, termination_rx) = mpsc::channel(64);
        let scheduler =
            Self { store, bus, assessment, vcs, agent, clock, config, termination_tx };
        (scheduler, termination_rx)
    }

    async fn publish(&self, kind: EventKind, entity_type: &str, entity_id: &str) -> Result<(), SchedulerError> {
        let event: Event = kind.into_event(entity_type, entity_id, self.clock.epoch_ms());
        self.bus.publish(event).await?;
        Ok(())
    }

    /// Classify up to `config.assess_batch_size` unassessed pending tasks.
    /// Each task's outcome is handled and recorded independently — one
    /// malformed response doesn't stall the rest of the batch, per
    /// spec.md §4.4.
    pub async fn assess_batch(&self) -> Result<Vec<TaskId>, SchedulerError> {
        let tasks = self.store.next_pending_unassessed(self.config.assess_batch_size).await?;
        let mut processed = Vec::with_capacity(tasks.len());
        for task in &tasks {
            self.assess_one(task).await?;
            processed.push(task.id);
        }
        Ok(processed)
    }

    async fn assess_one(&self, task: &Task) -> Result<(), SchedulerError> {
        self.store.set_status(&task.id, TaskStatus::Assessing).await?;

        let parent = match &task.parent_id {
            Some(parent_id) => self.store.get_task(parent_id).await?,
            None => None,
        };
        let parent_context = parent.as_ref().map(|p| (p.title.as_str(), p.description.as_str()));

        match self.assessment.assess(&task.title, &task.description, parent_context).await {
            Ok(assessment) => self.handle_assessed(task, assessment).await,
            Err(err) => self.retry_or_fail(task, "task.assess_failed", &err.to_string()).await,
        }
    }

    async fn handle_assessed(
        &self,
        task: &Task,
        assessment: aq_adapters::Assessment,
    ) -> Result<(), SchedulerError> {
        self.store
            .set_assessment(&task.id, assessment.complexity.as_str(), Some(&assessment.recommended_model))
            .await?;
        self.store
            .merge_metadata(
                &task.id,
                serde_json::json!({
                    "assessment": {
                        "complexity": assessment.complexity.as_str(),
                        "recommended_model": assessment.recommended_model,
                        "reasoning": assessment.reasoning,
                    }
                }),
            )
            .await?;

        if let Some(comment_text) = &assessment.comment {
            let now = self.clock.epoch_ms();
            let comment = Comment {
                id: CommentId::new(),
                task_id: task.id,
                content: comment_text.clone(),
                author: "assessment-engine".to_string(),
                created_at_ms: now,
                updated_at_ms: now,
            };
            self.store.insert_comment(&comment).await?;
        }

        if assessment.should_decompose && !assessment.subtasks.is_empty() {
            self.decompose(task, &assessment.subtasks).await
        } else {
            self.store.set_status(&task.id, TaskStatus::Pending).await?;
            self.publish(
                EventKind::TaskAssessed {
                    complexity: assessment.complexity.as_str().to_string(),
                    recommended_model: Some(assessment.recommended_model.clone()),
                },
                "task",
                task.id.as_str(),
            )
            .await
        }
    }

    /// Insert one child task per proposed subtask, spanning the parent's
    /// position so they sort immediately where the parent was, then mark
    /// the parent `decomposed` (terminal: spec.md §3's state table). Child
    /// metadata starts empty — decomposition proposes subtasks, it doesn't
    /// pre-approve them for execution.
    async fn decompose(
        &self,
        parent: &Task,
        subtasks: &[aq_adapters::ProposedSubtask],
    ) -> Result<(), SchedulerError> {
        let mut child_ids = Vec::with_capacity(subtasks.len());
        for (i, sub) in subtasks.iter().enumerate() {
            let child = Task {
                id: TaskId::new(),
                project_id: parent.project_id,
                seq: 0,
                title: sub.title.clone(),
                description: sub.description.clone(),
                status: TaskStatus::Pending,
                priority: parent.priority,
                position: parent.position * subtasks.len() as i64 + i as i64,
                parent_id: Some(parent.id),
                complexity: None,
                recommended_model: None,
                active_session_id: None,
                metadata: TaskMetadata::new(),
                created_at_ms: self.clock.epoch_ms(),
                started_at_ms: None,
                completed_at_ms: None,
            };
            let inserted = self.store.insert_task(child).await?;
            child_ids.push(inserted.id.to_string());
        }

        self.store.set_status(&parent.id, TaskStatus::Decomposed).await?;
        self.store
            .merge_metadata(&parent.id, serde_json::json!({ "decomposed_into": child_ids }))
            .await?;
        self.publish(EventKind::TaskDecomposed { child_ids }, "task", parent.id.as_str()).await
    }

    /// Bump `metadata.retry_count`; past `config.max_retries` the task
    /// becomes `failed` (terminal), otherwise it returns to `pending` for
    /// the next heartbeat pass to pick back up, per spec.md §7.
    async fn retry_or_fail(
        &self,
        task: &Task,
        retry_event_type: &str,
        reason: &str,
    ) -> Result<(), SchedulerError> {
        let retry_count = task.metadata.retry_count() + 1;
        self.store
            .merge_metadata(&task.id, serde_json::json!({ "retry_count": retry_count, "error": reason }))
            .await?;
        self.store.set_active_session(&task.id, None).await?;

        if retry_count > self.config.max_retries {
            self.store.set_status(&task.id, TaskStatus::Failed).await?;
            tracing::warn!(task_id = %task.id, reason, retry_count, "task failed permanently");
            self.publish(EventKind::TaskFailed { reason: reason.to_string() }, "task", task.id.as_str()).await
        } else {
            self.store.set_status(&task.id, TaskStatus::Pending).await?;
            tracing::warn!(task_id = %task.id, reason, retry_count, "retrying after failure");
            match retry_event_type {
                "task.assess_failed" => {
                    self.publish(EventKind::TaskAssessFailed { retry_count }, "task", task.id.as_str()).await
                }
                _ => Ok(()),
            }
        }
    }

    /// Launch agent sessions for up to as many slots as
    /// `config.max_concurrent_tasks` leaves free, in schedule order.
    pub async fn execute_next_tasks(&self) -> Result<Vec<TaskId>, SchedulerError> {
        let running = self.store.count_running_sessions().await?;
        let slots = (self.config.max_concurrent_tasks - running).max(0);
        if slots == 0 {
            return Ok(Vec::new());
        }

        let candidates = self.store.next_executable(slots).await?;
        let mut started = Vec::with_capacity(candidates.len());
        for task in &candidates {
            if self.execute_one(task).await? {
                started.push(task.id);
            }
        }
        Ok(started)
    }

    /// Worktree, session row, task transition, agent spawn — in that
    /// order, rolling back everything already done if a later step fails
    /// (spec.md §4.2). Returns whether the task actually started.
    async fn execute_one(&self, task: &Task) -> Result<bool, SchedulerError> {
        let project = self
            .store
            .get_project(&task.project_id)
            .await?
            .ok_or_else(|| SchedulerError::MissingProject(task.id.to_string(), task.project_id.to_string()))?;

        let branch = slug::branch_name(task.id.as_str(), &task.title);
        let worktree_path = self.config.worktrees_dir.join(&branch);

        if let Err(e) = self.vcs.create_worktree(&project.working_dir, &worktree_path, &branch, &project.default_branch).await {
            self.retry_or_fail(task, "", &format!("worktree creation failed: {e}")).await?;
            return Ok(false);
        }

        let session_id = SessionId::new();
        let session_dir = self.config.sessions_dir.join(session_id.to_string());
        if let Err(e) = tokio::fs::create_dir_all(&session_dir).await {
            let _ = self.vcs.remove_worktree(&project.working_dir, &worktree_path).await;
            self.retry_or_fail(task, "", &format!("could not create session log directory: {e}")).await?;
            return Ok(false);
        }

        let now = self.clock.epoch_ms();
        let model = task.recommended_model.clone().unwrap_or_else(|| "sonnet".to_string());
        let stdout_path = session_dir.join("stdout.log");
        let stderr_path = session_dir.join("stderr.log");
        let session = Session {
            id: session_id,
            task_id: task.id,
            working_dir: worktree_path.clone(),
            model: model.clone(),
            status: SessionStatus::Created,
            turn_count: 0,
            stdout_path: stdout_path.clone(),
            stderr_path: stderr_path.clone(),
            process_id: None,
            exit_code: None,
            claude_session_id: None,
            artifacts: serde_json::Map::new(),
            created_at_ms: now,
            started_at_ms: None,
            completed_at_ms: None,
            last_heartbeat_at_ms: None,
        };
        if let Err(e) = self.store.insert_session(&session).await {
            let _ = self.vcs.remove_worktree(&project.working_dir, &worktree_path).await;
            self.retry_or_fail(task, "", &format!("could not record session: {e}")).await?;
            return Ok(false);
        }

        self.store.set_status(&task.id, TaskStatus::Executing).await?;
        self.store.set_active_session(&task.id, Some(&session.id)).await?;
        self.store.touch_started(&task.id, now).await?;
        self.store
            .merge_metadata(
                &task.id,
                serde_json::json!({
                    "branch": branch,
                    "worktree_path": worktree_path.to_string_lossy(),
                }),
            )
            .await?;

        let spawn_request = AgentSpawnRequest {
            session_id: session.id,
            working_dir: worktree_path.clone(),
            prompt: task.description.clone(),
            model,
            stdout_path,
            stderr_path,
        };
        if let Err(e) = self.agent.spawn(spawn_request, self.termination_tx.clone()).await {
            let _ = self.store.complete_session(&session.id, SessionStatus::Failed, None, self.clock.epoch_ms()).await;
            let _ = self.vcs.remove_worktree(&project.working_dir, &worktree_path).await;
            self.retry_or_fail(task, "", &format!("agent spawn failed: {e}")).await?;
            return Ok(false);
        }

        self.publish(EventKind::SessionStarted, "session", session.id.as_str()).await?;
        self.publish(EventKind::TaskExecuting { session_id: session.id.to_string() }, "task", task.id.as_str()).await?;
        Ok(true)
    }

    /// Drive one reported session termination through to the task's next
    /// state: `ready_for_review` with a PR on success, retried-or-failed
    /// on a non-zero exit. The worktree is always reclaimed afterward,
    /// best-effort, regardless of outcome (spec.md §4.2, §4.6).
    pub async fn on_session_terminated(&self, termination: SessionTermination) -> Result<(), SchedulerError> {
        let session = match self.store.get_session(&termination.session_id).await? {
            Some(session) => session,
            None => {
                tracing::warn!(session_id = %termination.session_id, "termination reported for unknown session");
                return Ok(());
            }
        };
        let task = match self.store.get_task(&session.task_id).await? {
            Some(task) => task,
            None => {
                tracing::warn!(task_id = %session.task_id, "termination reported for a task that no longer exists");
                return Ok(());
            }
        };

        let now = self.clock.epoch_ms();
        let success = termination.exit_code == Some(0);
        let session_status = if success { SessionStatus::Completed } else { SessionStatus::Failed };
        self.store.complete_session(&session.id, session_status, termination.exit_code, now).await?;
        let session_event = if success {
            EventKind::SessionCompleted { exit_code: 0 }
        } else {
            EventKind::SessionFailed { exit_code: termination.exit_code }
        };
        self.publish(session_event, "session", session.id.as_str()).await?;

        if success {
            if let Err(e) = self.finalize_success(&task, &session).await {
                tracing::error!(task_id = %task.id, error = %e, "failed to land a completed session's changes");
                self.retry_or_fail(&task, "", &format!("post-session vcs step failed: {e}")).await?;
            }
        } else {
            self.retry_or_fail(&task, "", &format!("agent session exited with {:?}", termination.exit_code)).await?;
        }

        if let Some(project) = self.store.get_project(&task.project_id).await? {
            if let Err(e) = self.vcs.remove_worktree(&project.working_dir, &session.working_dir).await {
                tracing::warn!(task_id = %task.id, error = %e, "best-effort worktree removal failed");
            }
        }
        self.store.set_active_session(&task.id, None).await?;
        Ok(())
    }

    async fn finalize_success(&self, task: &Task, session: &Session) -> Result<(), SchedulerError> {
        let project = self
            .store
            .get_project(&task.project_id)
            .await?
            .ok_or_else(|| SchedulerError::MissingProject(task.id.to_string(), task.project_id.to_string()))?;
        let branch = task
            .metadata
            .branch()
            .map(str::to_string)
            .unwrap_or_else(|| slug::branch_name(task.id.as_str(), &task.title));

        let commit_message = format!("{}\n\nsession: {}", task.title, session.id);
        self.vcs.commit_and_push(&session.working_dir, &branch, &commit_message).await?;

        let pr_body = format!("{}\n\n---\nsession: {}", task.description, session.id);
        let pr_url = self.vcs.create_pr(&project.working_dir, &branch, &project.default_branch, &task.title, &pr_body).await?;

        self.store.merge_metadata(&task.id, serde_json::json!({ "pr_url": pr_url })).await?;
        self.store.set_status(&task.id, TaskStatus::ReadyForReview).await?;
        self.store.touch_completed(&task.id, self.clock.epoch_ms()).await?;
        self.publish(EventKind::TaskReadyForReview { pr_url }, "task", task.id.as_str()).await
    }

    /// Reconcile each project's on-disk worktrees against tasks still in
    /// flight, removing anything the Store no longer considers live
    /// (spec.md §4.6) — the backstop for worktrees orphaned by a daemon
    /// crash between `create_worktree` and the task reaching a terminal
    /// state.
    pub async fn cleanup_stale_worktrees(&self) -> Result<usize, SchedulerError> {
        let tasks = self.store.list_tasks().await?;
        let live_branches: std::collections::HashSet<String> = tasks
            .iter()
            .filter(|t| !t.status.is_terminal())
            .filter_map(|t| t.metadata.branch().map(str::to_string))
            .collect();

        let mut removed = 0;
        for project in self.store.list_projects().await? {
            let worktrees = match self.vcs.list_worktrees(&project.working_dir).await {
                Ok(worktrees) => worktrees,
                Err(e) => {
                    tracing::warn!(project = %project.name, error = %e, "failed to list worktrees for cleanup");
                    continue;
                }
            };
            for entry in worktrees {
                if entry.path == project.working_dir {
                    continue;
                }
                let is_live = entry.branch.as_deref().map(|b| live_branches.contains(b)).unwrap_or(false);
                if is_live {
                    continue;
                }
                match self.vcs.remove_worktree(&project.working_dir, &entry.path).await {
                    Ok(()) => removed += 1,
                    Err(e) => tracing::warn!(
                        path = %entry.path.display(),
                        error = %e,
                        "stale worktree removal failed"
                    ),
                }
            }
        }
        Ok(removed)
    }

    /// Cancel a task: idempotent on an already-terminal task (spec.md §8's
    /// idempotence property). If a session is active, ask the AgentAdapter
    /// to cancel it and best-effort reclaim its worktree before the task
    /// itself flips to `cancelled` (spec.md §5).
    pub async fn cancel_task(&self, task_id: &TaskId) -> Result<(), SchedulerError> {
        let task = match self.store.get_task(task_id).await? {
            Some(task) => task,
            None => return Ok(()),
        };
        if task.status.is_terminal() {
            return Ok(());
        }

        if let Some(session_id) = task.active_session_id {
            if let Err(e) = self.agent.cancel(&session_id).await {
                tracing::warn!(task_id = %task.id, %session_id, error = %e, "agent cancel failed");
            }
            if let Some(session) = self.store.get_session(&session_id).await? {
                self.store
                    .complete_session(&session_id, SessionStatus::Cancelled, None, self.clock.epoch_ms())
                    .await?;
                self.publish(EventKind::SessionCancelled, "session", session_id.as_str()).await?;
                if let Some(project) = self.store.get_project(&task.project_id).await? {
                    if let Err(e) =
                        self.vcs.remove_worktree(&project.working_dir, &session.working_dir).await
                    {
                        tracing::warn!(task_id = %task.id, error = %e, "best-effort worktree removal failed");
                    }
                }
            }
        }

        self.store.set_active_session(&task.id, None).await?;
        self.store.set_status(&task.id, TaskStatus::Cancelled).await?;
        self.publish(EventKind::TaskCancelled, "task", task.id.as_str()).await
    }

    /// Collapse exact-duplicate pending tasks, emitting one `task.deduped`
    /// per row removed, naming the survivor it collapsed into
    /// (spec.md §4.2, §6).
    pub async fn dedupe_tasks(&self) -> Result<Vec<TaskId>, SchedulerError> {
        let pairs = self.store.dedupe_pending().await?;
        let mut removed_ids = Vec::with_capacity(pairs.len());
        for (removed_id, kept_id) in pairs {
            self.publish(EventKind::TaskDeduped { kept_id: kept_id.to_string() }, "task", removed_id.as_str()).await?;
            removed_ids.push(removed_id);
        }
        Ok(removed_ids)
    }
}
