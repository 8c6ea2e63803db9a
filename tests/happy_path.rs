// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace-level end-to-end scenarios from spec.md §8, driving the
//! Scheduler directly over an in-memory store and fake adapters — the
//! same harness shape `aq_scheduler::scheduler`'s own unit tests use,
//! just exercising the full assess -> execute -> terminate pipeline
//! across crate boundaries instead of one operation at a time.

use std::sync::Arc;

use aq_adapters::{
    AgentAdapter, Assessment, Complexity, FakeAgentAdapter, FakeAssessmentEngine, FakeVcsAdapter,
    VcsAdapter,
};
use aq_bus::fake::FakeEventSink;
use aq_bus::EventBus;
use aq_core::{Clock, FakeClock, Project, Task, TaskMetadata, TaskStatus};
use aq_scheduler::{Scheduler, SchedulerConfig};
use aq_store::Store;
use tempfile::TempDir;

struct Harness {
    store: Store,
    bus: Arc<EventBus>,
    sink: Arc<FakeEventSink>,
    vcs: Arc<FakeVcsAdapter>,
    agent: Arc<FakeAgentAdapter>,
    clock: FakeClock,
    _tmp: TempDir,
}

impl Harness {
    async fn new() -> Self {
        let store = Store::open_in_memory().await.unwrap();
        let sink = FakeEventSink::new();
        let bus = Arc::new(EventBus::new(sink.clone()));
        let vcs = Arc::new(FakeVcsAdapter::default());
        let agent = Arc::new(FakeAgentAdapter::default());
        let clock = FakeClock::new();
        let tmp = TempDir::new().unwrap();
        Self { store, bus, sink, vcs, agent, clock, _tmp: tmp }
    }

    fn config(&self, max_concurrent_tasks: i64) -> SchedulerConfig {
        SchedulerConfig {
            worktrees_dir: self._tmp.path().join("worktrees"),
            sessions_dir: self._tmp.path().join("sessions"),
            max_retries: 1,
            assess_batch_size: 10,
            max_concurrent_tasks,
        }
    }

    fn scheduler(
        &self,
        assessment: Arc<dyn aq_adapters::AssessmentEngine>,
        config: SchedulerConfig,
    ) -> (Scheduler<FakeClock>, tokio::sync::mpsc::Receiver<aq_adapters::SessionTermination>) {
        Scheduler::new(
            self.store.clone(),
            self.bus.clone(),
            assessment,
            self.vcs.clone() as Arc<dyn VcsAdapter>,
            self.agent.clone() as Arc<dyn AgentAdapter>,
            self.clock.clone(),
            config,
        )
    }

    async fn project(&self) -> aq_core::ProjectId {
        let project = Project::builder().name("demo").build();
        self.store.insert_project(&project).await.unwrap();
        project.id
    }
}

/// spec.md §8 scenario 1: a single active task moves pending -> assessing
/// -> pending -> executing -> ready_for_review, with a PR recorded, and
/// emits the matching events in order.
#[tokio::test]
async fn happy_path_single_task_reaches_ready_for_review() {
    let h = Harness::new().await;
    let project_id = h.project().await;

    let mut metadata = TaskMetadata::new();
    metadata.set_active(true);
    let task = h
        .store
        .insert_task(
            Task::builder()
                .project_id(project_id)
                .title("Add README")
                .description("Write a README for the project")
                .metadata(metadata)
                .build(),
        )
        .await
        .unwrap();

    let (scheduler, mut termination_rx) =
        h.scheduler(Arc::new(FakeAssessmentEngine::default()), h.config(1));

    let assessed = scheduler.assess_batch().await.unwrap();
    assert_eq!(assessed, vec![task.id]);

    let after_assess = h.store.get_task(&task.id).await.unwrap().unwrap();
    assert_eq!(after_assess.status, TaskStatus::Pending);
    assert_eq!(after_assess.complexity.as_deref(), Some("simple"));

    let started = scheduler.execute_next_tasks().await.unwrap();
    assert_eq!(started, vec![task.id]);

    let executing = h.store.get_task(&task.id).await.unwrap().unwrap();
    assert_eq!(executing.status, TaskStatus::Executing);
    assert!(executing.active_session_id.is_some());

    let termination = termination_rx.recv().await.unwrap();
    scheduler.on_session_terminated(termination).await.unwrap();

    let done = h.store.get_task(&task.id).await.unwrap().unwrap();
    assert_eq!(done.status, TaskStatus::ReadyForReview);
    assert!(done.metadata.pr_url().is_some());
    assert!(done.active_session_id.is_none());

    let event_names: Vec<String> =
        h.sink.recorded().into_iter().map(|e| e.event_type).collect();
    assert!(event_names.contains(&"task.assessed".to_string()));
    assert!(event_names.contains(&"task.executing".to_string()));
    assert!(event_names.contains(&"session.completed".to_string()));
    assert!(event_names.contains(&"task.ready_for_review".to_string()));
}

/// spec.md §8 scenario: a non-zero exit retries once before failing
/// permanently once `max_retries` is exhausted.
#[tokio::test]
async fn failed_session_retries_then_fails_permanently() {
    let h = Harness::new().await;
    let project_id = h.project().await;
    let agent = Arc::new(FakeAgentAdapter::with_exit_code(1));

    let mut metadata = TaskMetadata::new();
    metadata.set_active(true);
    let task = h
        .store
        .insert_task(Task::builder().project_id(project_id).metadata(metadata).build())
        .await
        .unwrap();

    let config = h.config(1);
    let (scheduler, mut rx) = Scheduler::new(
        h.store.clone(),
        h.bus.clone(),
        Arc::new(FakeAssessmentEngine::default()),
        h.vcs.clone() as Arc<dyn VcsAdapter>,
        agent as Arc<dyn AgentAdapter>,
        h.clock.clone(),
        config,
    );

    scheduler.assess_batch().await.unwrap();
    scheduler.execute_next_tasks().await.unwrap();
    let termination = rx.recv().await.unwrap();
    scheduler.on_session_terminated(termination).await.unwrap();

    let retried = h.store.get_task(&task.id).await.unwrap().unwrap();
    assert_eq!(retried.status, TaskStatus::Pending);
    assert_eq!(retried.metadata.retry_count(), 1);

    scheduler.execute_next_tasks().await.unwrap();
    let termination = rx.recv().await.unwrap();
    scheduler.on_session_terminated(termination).await.unwrap();

    let failed = h.store.get_task(&task.id).await.unwrap().unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);
    assert_eq!(failed.metadata.retry_count(), 2);
}

/// spec.md §8 scenario: a complex assessment decomposes a task into
/// children instead of executing it, and the parent never runs a session.
#[tokio::test]
async fn decomposition_produces_children_and_retires_the_parent() {
    let h = Harness::new().await;
    let project_id = h.project().await;

    let mut metadata = TaskMetadata::new();
    metadata.set_active(true);
    let parent = h
        .store
        .insert_task(
            Task::builder().project_id(project_id).title("Rebuild auth").metadata(metadata).build(),
        )
        .await
        .unwrap();

    let assessment = Assessment {
        complexity: Complexity::Complex,
        recommended_model: "opus".to_string(),
        should_decompose: true,
        subtasks: vec![
            aq_adapters::ProposedSubtask {
                title: "Add login endpoint".to_string(),
                description: "...".to_string(),
            },
            aq_adapters::ProposedSubtask {
                title: "Add session refresh".to_string(),
                description: "...".to_string(),
            },
        ],
        comment: Some("splitting auth rework into two pieces".to_string()),
        reasoning: "touches login and session refresh independently".to_string(),
    };

    let (scheduler, _rx) =
        h.scheduler(Arc::new(FakeAssessmentEngine::with_assessment(assessment)), h.config(4));

    scheduler.assess_batch().await.unwrap();

    let parent_after = h.store.get_task(&parent.id).await.unwrap().unwrap();
    assert_eq!(parent_after.status, TaskStatus::Decomposed);
    assert_eq!(parent_after.metadata.decomposed_into().len(), 2);

    let children = h.store.list_tasks().await.unwrap();
    let child_titles: Vec<&str> =
        children.iter().filter(|t| t.parent_id == Some(parent.id)).map(|t| t.title.as_str()).collect();
    assert_eq!(child_titles.len(), 2);
    assert!(child_titles.contains(&"Add login endpoint"));

    let started = scheduler.execute_next_tasks().await.unwrap();
    assert!(started.is_empty(), "children aren't active until someone opts them in");
}

/// spec.md §8 scenario: `max_concurrent_tasks` bounds how many sessions
/// `execute_next_tasks` will start in one pass, leaving the rest pending.
#[tokio::test]
async fn concurrency_cap_limits_sessions_started_per_pass() {
    let h = Harness::new().await;
    let project_id = h.project().await;

    for i in 0..3 {
        let mut metadata = TaskMetadata::new();
        metadata.set_active(true);
        h.store
            .insert_task(
                Task::builder()
                    .project_id(project_id)
                    .title(format!("task-{i}"))
                    .complexity("simple")
                    .metadata(metadata)
                    .build(),
            )
            .await
            .unwrap();
    }

    let (scheduler, _rx) = h.scheduler(Arc::new(FakeAssessmentEngine::default()), h.config(2));

    let started = scheduler.execute_next_tasks().await.unwrap();
    assert_eq!(started.len(), 2);

    let running = h.store.count_running_sessions().await.unwrap();
    assert_eq!(running, 2);
}

/// spec.md §8 scenario: exact-duplicate pending tasks collapse into one
/// survivor, each removal emitting `task.deduped`.
#[tokio::test]
async fn dedupe_collapses_exact_duplicate_pending_tasks() {
    let h = Harness::new().await;
    let project_id = h.project().await;

    for _ in 0..3 {
        h.store
            .insert_task(
                Task::builder()
                    .project_id(project_id)
                    .title("Fix flaky test")
                    .description("tests/flaky.rs intermittently fails")
                    .build(),
            )
            .await
            .unwrap();
    }

    let (scheduler, _rx) = h.scheduler(Arc::new(FakeAssessmentEngine::default()), h.config(4));

    let removed = scheduler.dedupe_tasks().await.unwrap();
    assert_eq!(removed.len(), 2);

    let remaining = h.store.list_tasks().await.unwrap();
    assert_eq!(remaining.len(), 1);

    let event_names: Vec<String> =
        h.sink.recorded().into_iter().map(|e| e.event_type).collect();
    assert_eq!(event_names.iter().filter(|n| n.as_str() == "task.deduped").count(), 2);
}
