// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The HTTP façade (spec.md §4.9, §6): a thin `axum` router. Every handler
//! does nothing but translate HTTP into a Store/EventBus/Scheduler call and
//! the result back into JSON — no business logic lives here.

use std::sync::Arc;
use std::time::Duration;

use aq_core::{Clock, ProjectId, Task, TaskId, TaskMetadata, TaskStatus};
use aq_scheduler::Scheduler;
use aq_store::{Store, StoreError};
use axum::extract::{Path, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{http::StatusCode, Json, Router};
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_stream::StreamExt;

use crate::heartbeat::{BeatReport, Heartbeat};

pub struct HttpFacade<C: Clock> {
    store: Store,
    bus: Arc<aq_bus::EventBus>,
    heartbeat: Arc<Heartbeat<C>>,
    scheduler: Arc<Scheduler<C>>,
}

impl<C: Clock + 'static> HttpFacade<C> {
    pub fn new(
        store: Store,
        bus: Arc<aq_bus::EventBus>,
        heartbeat: Arc<Heartbeat<C>>,
        scheduler: Arc<Scheduler<C>>,
    ) -> Self {
        Self { store, bus, heartbeat, scheduler }
    }

    pub fn router(self) -> Router {
        let state = AppState {
            store: self.store,
            bus: self.bus,
            heartbeat: self.heartbeat,
            scheduler: self.scheduler,
        };
        Router::new()
            .route("/tasks", get(list_tasks::<C>).post(create_task::<C>))
            .route("/tasks/{id}", patch(patch_task::<C>))
            .route("/tasks/{id}/cancel", post(cancel_task::<C>))
            .route("/tasks/reorder", post(reorder_tasks::<C>))
            .route("/tasks/{id}/status", post(set_task_status::<C>))
            .route("/sessions/{id}", get(get_session::<C>))
            .route("/sessions/{id}/output", get(stream_session_output::<C>))
            .route("/status", get(system_status::<C>))
            .route("/events", get(event_stream::<C>))
            .route("/heartbeat/trigger", post(trigger_heartbeat::<C>))
            .with_state(state)
    }
}

#[derive(Clone)]
struct AppState<C: Clock> {
    store: Store,
    bus: Arc<aq_bus::EventBus>,
    heartbeat: Arc<Heartbeat<C>>,
    scheduler: Arc<Scheduler<C>>,
}

#[derive(Debug, Serialize)]
struct ApiError {
    code: &'static str,
    message: String,
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self { code: "store_error", message: e.to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = if self.code == "not_found" {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(self)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

async fn list_tasks<C: Clock>(State(state): State<AppState<C>>) -> ApiResult<Vec<Task>> {
    Ok(Json(state.store.list_tasks().await?))
}

#[derive(Debug, Deserialize)]
struct CreateTaskInput {
    project_id: String,
    title: String,
    description: String,
    #[serde(default)]
    priority: i64,
    #[serde(default)]
    position: i64,
    parent_id: Option<String>,
    #[serde(default)]
    metadata: Value,
}

async fn create_task<C: Clock>(
    State(state): State<AppState<C>>,
    Json(input): Json<CreateTaskInput>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let mut metadata = TaskMetadata::new();
    if !input.metadata.is_null() {
        metadata.merge(input.metadata).map_err(|e| ApiError {
            code: "invalid_metadata",
            message: e.to_string(),
        })?;
    }
    let task = Task {
        id: TaskId::new(),
        project_id: ProjectId::from_string(&input.project_id),
        seq: 0,
        title: input.title,
        description: input.description,
        status: TaskStatus::Pending,
        priority: input.priority,
        position: input.position,
        parent_id: input.parent_id.map(|id| TaskId::from_string(&id)),
        complexity: None,
        recommended_model: None,
        active_session_id: None,
        metadata,
        created_at_ms: state.heartbeat_clock_now(),
        started_at_ms: None,
        completed_at_ms: None,
    };
    let inserted = state.store.insert_task(task).await?;
    publish(&state.bus, aq_core::EventKind::TaskCreated, "task", inserted.id.as_str()).await;
    Ok((StatusCode::CREATED, Json(inserted)))
}

impl<C: Clock> AppState<C> {
    fn heartbeat_clock_now(&self) -> i64 {
        // The façade has no clock of its own; tasks created through HTTP are
        // stamped using the same epoch-ms convention as everything else,
        // taken from the system clock since this path is never under test
        // control the way Scheduler/Heartbeat internals are.
        aq_core::SystemClock.epoch_ms()
    }
}

#[derive(Debug, Deserialize)]
struct PatchTaskInput {
    metadata: Value,
}

async fn patch_task<C: Clock>(
    State(state): State<AppState<C>>,
    Path(id): Path<String>,
    Json(input): Json<PatchTaskInput>,
) -> Result<StatusCode, ApiError> {
    let task_id = TaskId::from_string(&id);
    state.store.merge_metadata(&task_id, input.metadata).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Cancellation goes through the Scheduler rather than a direct status
/// write: a cancelled task with an active session must also stop the
/// agent process and reclaim its worktree (spec.md §5).
async fn cancel_task<C: Clock>(
    State(state): State<AppState<C>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let task_id = TaskId::from_string(&id);
    state.scheduler.cancel_task(&task_id).await.map_err(|e| ApiError {
        code: "cancel_failed",
        message: e.to_string(),
    })?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct ReorderInput {
    positions: Vec<(String, i64)>,
}

async fn reorder_tasks<C: Clock>(
    State(state): State<AppState<C>>,
    Json(input): Json<ReorderInput>,
) -> Result<StatusCode, ApiError> {
    let positions: Vec<(TaskId, i64)> =
        input.positions.into_iter().map(|(id, pos)| (TaskId::from_string(&id), pos)).collect();
    state.store.reorder(&positions).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct SetStatusInput {
    status: TaskStatus,
}

async fn set_task_status<C: Clock>(
    State(state): State<AppState<C>>,
    Path(id): Path<String>,
    Json(input): Json<SetStatusInput>,
) -> Result<StatusCode, ApiError> {
    let task_id = TaskId::from_string(&id);
    state.store.set_status(&task_id, input.status).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_session<C: Clock>(
    State(state): State<AppState<C>>,
    Path(id): Path<String>,
) -> ApiResult<Option<aq_core::Session>> {
    let session_id = aq_core::SessionId::from_string(&id);
    Ok(Json(state.store.get_session(&session_id).await?))
}

/// Tail a session's captured stdout, emitting each newly-appended chunk as
/// an SSE frame. Polling rather than a filesystem watcher: the facade does
/// no business logic (spec.md §4.9), and the AgentAdapter is already the
/// sole writer of this file, so a fixed-interval re-read is simplest thing
/// that works for an opaque, non-turn-level stream (spec.md §1).
async fn stream_session_output<C: Clock + 'static>(
    State(state): State<AppState<C>>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, std::convert::Infallible>>>, ApiError> {
    let session_id = aq_core::SessionId::from_string(&id);
    let session = state.store.get_session(&session_id).await?.ok_or_else(|| ApiError {
        code: "not_found",
        message: format!("no session {id}"),
    })?;

    let stream = futures::stream::unfold((session.stdout_path, 0u64), |(path, offset)| async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        use tokio::io::{AsyncReadExt, AsyncSeekExt};
        let chunk = async {
            let mut file = tokio::fs::File::open(&path).await.ok()?;
            file.seek(std::io::SeekFrom::Start(offset)).await.ok()?;
            let mut buf = Vec::new();
            file.read_to_end(&mut buf).await.ok()?;
            if buf.is_empty() {
                None
            } else {
                Some(String::from_utf8_lossy(&buf).into_owned())
            }
        }
        .await;
        match chunk {
            Some(text) => {
                let new_offset = offset + text.len() as u64;
                Some((Ok(SseEvent::default().event("output").data(text)), (path, new_offset)))
            }
            None => Some((Ok(SseEvent::default().event("heartbeat").data("")), (path, offset))),
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

async fn system_status<C: Clock>(State(state): State<AppState<C>>) -> ApiResult<Value> {
    let tasks = state.store.list_tasks().await?;
    let mut counts = serde_json::Map::new();
    for status in [
        TaskStatus::Pending,
        TaskStatus::Assessing,
        TaskStatus::Decomposed,
        TaskStatus::Executing,
        TaskStatus::ReadyForReview,
        TaskStatus::Completed,
        TaskStatus::Failed,
        TaskStatus::Cancelled,
    ] {
        let count = tasks.iter().filter(|t| t.status == status).count();
        counts.insert(status.event_fragment().to_string(), json!(count));
    }
    let rate_limit = state.store.get_rate_limit().await?;
    Ok(Json(json!({ "counts": counts, "rate_limit": rate_limit })))
}

async fn event_stream<C: Clock + 'static>(
    State(state): State<AppState<C>>,
) -> Sse<impl Stream<Item = Result<SseEvent, std::convert::Infallible>>> {
    let rx = state.bus.subscribe();
    let stream = tokio_stream::wrappers::BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(event) => {
            let payload = serde_json::to_string(&event).unwrap_or_default();
            Some(Ok(SseEvent::default().event(event.event_type.clone()).data(payload)))
        }
        // A lagged subscriber drops the gap and resumes on the live tail
        // rather than propagating an error (spec.md §4.8, §9).
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

async fn trigger_heartbeat<C: Clock>(State(state): State<AppState<C>>) -> Json<BeatReport> {
    Json(state.heartbeat.run_one_beat().await)
}

async fn publish(bus: &aq_bus::EventBus, kind: aq_core::EventKind, entity_type: &str, entity_id: &str) {
    let event = kind.into_event(entity_type, entity_id, aq_core::SystemClock.epoch_ms());
    if let Err(e) = bus.publish(event).await {
        tracing::error!(error = %e, "failed to publish http-triggered event");
    }
}
