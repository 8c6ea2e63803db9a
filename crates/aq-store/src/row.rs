// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Row <-> domain-type conversions. sqlx's derive doesn't know how to map
//! `aq_core`'s id/metadata newtypes, so every entity gets a hand-written
//! `from_row` that reads plain columns and reconstructs the typed value.

use crate::error::StoreError;
use aq_core::{
    Comment, CommentId, Event, EventId, Project, ProjectId, RateLimitSnapshot, Session, SessionId,
    Task, TaskId, TaskMetadata, TaskStatus,
};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::path::PathBuf;

fn parse_json<T: serde::de::DeserializeOwned>(
    table: &'static str,
    column: &'static str,
    raw: &str,
) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|source| StoreError::CorruptRow { table, column, source })
}

fn parse_status<T: serde::de::DeserializeOwned>(raw: &str) -> T {
    // Statuses round-trip through their own serde impls (snake_case), so we
    // reuse serde_json rather than hand-writing a second parser.
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .unwrap_or_else(|e| unreachable!("status column held an unrecognized value: {e:?}"))
}

pub fn task_from_row(row: &SqliteRow) -> Result<Task, StoreError> {
    let metadata_raw: String = row.try_get("metadata")?;
    Ok(Task {
        id: TaskId::from_string(row.try_get::<String, _>("id")?),
        project_id: ProjectId::from_string(row.try_get::<String, _>("project_id")?),
        seq: row.try_get("seq")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        status: parse_status::<TaskStatus>(&row.try_get::<String, _>("status")?),
        priority: row.try_get("priority")?,
        position: row.try_get("position")?,
        parent_id: row.try_get::<Option<String>, _>("parent_id")?.map(TaskId::from_string),
        complexity: row.try_get("complexity")?,
        recommended_model: row.try_get("recommended_model")?,
        active_session_id: row
            .try_get::<Option<String>, _>("active_session_id")?
            .map(SessionId::from_string),
        metadata: parse_json("tasks", "metadata", &metadata_raw)?,
        created_at_ms: row.try_get("created_at_ms")?,
        started_at_ms: row.try_get("started_at_ms")?,
        completed_at_ms: row.try_get("completed_at_ms")?,
    })
}

pub fn task_metadata_json(metadata: &TaskMetadata) -> String {
    serde_json::to_string(metadata).unwrap_or_else(|_| "{}".to_string())
}

pub fn session_from_row(row: &SqliteRow) -> Result<Session, StoreError> {
    let artifacts_raw: String = row.try_get("artifacts")?;
    Ok(Session {
        id: SessionId::from_string(row.try_get::<String, _>("id")?),
        task_id: TaskId::from_string(row.try_get::<String, _>("task_id")?),
        working_dir: PathBuf::from(row.try_get::<String, _>("working_dir")?),
        model: row.try_get("model")?,
        status: parse_status(&row.try_get::<String, _>("status")?),
        turn_count: row.try_get::<i64, _>("turn_count")? as u32,
        stdout_path: PathBuf::from(row.try_get::<String, _>("stdout_path")?),
        stderr_path: PathBuf::from(row.try_get::<String, _>("stderr_path")?),
        process_id: row.try_get::<Option<i64>, _>("process_id")?.map(|v| v as u32),
        exit_code: row.try_get::<Option<i64>, _>("exit_code")?.map(|v| v as i32),
        claude_session_id: row.try_get("claude_session_id")?,
        artifacts: parse_json("sessions", "artifacts", &artifacts_raw)?,
        created_at_ms: row.try_get("created_at_ms")?,
        started_at_ms: row.try_get("started_at_ms")?,
        completed_at_ms: row.try_get("completed_at_ms")?,
        last_heartbeat_at_ms: row.try_get("last_heartbeat_at_ms")?,
    })
}

pub fn comment_from_row(row: &SqliteRow) -> Result<Comment, StoreError> {
    Ok(Comment {
        id: CommentId::from_string(row.try_get::<String, _>("id")?),
        task_id: TaskId::from_string(row.try_get::<String, _>("task_id")?),
        content: row.try_get("content")?,
        author: row.try_get("author")?,
        created_at_ms: row.try_get("created_at_ms")?,
        updated_at_ms: row.try_get("updated_at_ms")?,
    })
}

pub fn event_from_row(row: &SqliteRow) -> Result<Event, StoreError> {
    let payload_raw: String = row.try_get("payload")?;
    Ok(Event {
        id: EventId::from_string(row.try_get::<String, _>("id")?),
        event_type: row.try_get("event_type")?,
        entity_type: row.try_get("entity_type")?,
        entity_id: row.try_get("entity_id")?,
        payload: parse_json("events", "payload", &payload_raw)?,
        created_at_ms: row.try_get("created_at_ms")?,
    })
}

pub fn rate_limit_from_row(row: &SqliteRow) -> Result<RateLimitSnapshot, StoreError> {
    let raw_json: String = row.try_get("raw")?;
    Ok(RateLimitSnapshot {
        tier: row.try_get("tier")?,
        used: row.try_get::<i64, _>("used")? as u64,
        limit: row.try_get::<i64, _>("limit_value")? as u64,
        percent: row.try_get("percent")?,
        is_limited: row.try_get("is_limited")?,
        reset_at_ms: row.try_get("reset_at_ms")?,
        raw: parse_json("rate_limits", "raw", &raw_json)?,
        updated_at_ms: row.try_get("updated_at_ms")?,
    })
}

pub fn project_from_row(row: &SqliteRow) -> Result<Project, StoreError> {
    Ok(Project {
        id: ProjectId::from_string(row.try_get::<String, _>("id")?),
        name: row.try_get("name")?,
        working_dir: PathBuf::from(row.try_get::<String, _>("working_dir")?),
        vcs_origin: row.try_get("vcs_origin")?,
        default_branch: row.try_get("default_branch")?,
        created_at_ms: row.try_get("created_at_ms")?,
    })
}
