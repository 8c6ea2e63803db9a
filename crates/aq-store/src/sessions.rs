// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::row::session_from_row;
use crate::{Store, StoreError};
use aq_core::{Session, SessionId, SessionStatus, TaskId};
use sqlx::Row;

impl Store {
    pub async fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        let artifacts = serde_json::to_string(&session.artifacts).unwrap_or_else(|_| "{}".into());
        sqlx::query(
            "INSERT INTO sessions
                (id, task_id, working_dir, model, status, turn_count, stdout_path, stderr_path,
                 process_id, exit_code, claude_session_id, artifacts,
                 created_at_ms, started_at_ms, completed_at_ms, last_heartbeat_at_ms)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(session.id.as_str())
        .bind(session.task_id.as_str())
        .bind(session.working_dir.to_string_lossy().to_string())
        .bind(&session.model)
        .bind(session.status.to_string())
        .bind(session.turn_count as i64)
        .bind(session.stdout_path.to_string_lossy().to_string())
        .bind(session.stderr_path.to_string_lossy().to_string())
        .bind(session.process_id.map(|v| v as i64))
        .bind(session.exit_code.map(|v| v as i64))
        .bind(&session.claude_session_id)
        .bind(artifacts)
        .bind(session.created_at_ms)
        .bind(session.started_at_ms)
        .bind(session.completed_at_ms)
        .bind(session.last_heartbeat_at_ms)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn get_session(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        let row = sqlx::query("SELECT * FROM sessions WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(session_from_row).transpose()
    }

    pub async fn list_sessions_for_task(&self, task_id: &TaskId) -> Result<Vec<Session>, StoreError> {
        let rows = sqlx::query("SELECT * FROM sessions WHERE task_id = ? ORDER BY created_at_ms ASC")
            .bind(task_id.as_str())
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(session_from_row).collect()
    }

    /// Tasks may have at most one session with status in {created, running}
    /// (spec.md §3); this is the count the execute phase subtracts from
    /// `MAX_CONCURRENT_TASKS` to get free slots.
    pub async fn count_running_sessions(&self) -> Result<i64, StoreError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM sessions WHERE status IN ('created', 'running')",
        )
        .fetch_one(self.pool())
        .await?;
        Ok(row.try_get("n")?)
    }

    pub async fn set_session_status(
        &self,
        id: &SessionId,
        status: SessionStatus,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE sessions SET status = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(id.as_str())
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn complete_session(
        &self,
        id: &SessionId,
        status: SessionStatus,
        exit_code: Option<i32>,
        now_ms: i64,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE sessions SET status = ?, exit_code = ?, completed_at_ms = ? WHERE id = ?",
        )
        .bind(status.to_string())
        .bind(exit_code.map(|v| v as i64))
        .bind(now_ms)
        .bind(id.as_str())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn touch_session_heartbeat(
        &self,
        id: &SessionId,
        now_ms: i64,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE sessions SET last_heartbeat_at_ms = ? WHERE id = ?")
            .bind(now_ms)
            .bind(id.as_str())
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn set_session_process_id(
        &self,
        id: &SessionId,
        process_id: u32,
        started_at_ms: i64,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE sessions SET process_id = ?, started_at_ms = ?, status = 'running' WHERE id = ?",
        )
        .bind(process_id as i64)
        .bind(started_at_ms)
        .bind(id.as_str())
        .execute(self.pool())
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aq_core::{Project, Task};

    async fn store_with_task() -> (Store, TaskId) {
        let store = Store::open_in_memory().await.unwrap();
        let project = Project::builder().name("default").build();
        store.insert_project(&project).await.unwrap();
        let task = store.insert_task(Task::builder().project_id(project.id).build()).await.unwrap();
        (store, task.id)
    }

    #[tokio::test]
    async fn running_sessions_are_counted_until_terminal() {
        let (store, task_id) = store_with_task().await;
        let session = Session::builder().task_id(task_id).status(SessionStatus::Running).build();
        store.insert_session(&session).await.unwrap();
        assert_eq!(store.count_running_sessions().await.unwrap(), 1);

        store.complete_session(&session.id, SessionStatus::Completed, Some(0), 10).await.unwrap();
        assert_eq!(store.count_running_sessions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn complete_session_records_exit_code_and_timestamp() {
        let (store, task_id) = store_with_task().await;
        let session = Session::builder().task_id(task_id).build();
        store.insert_session(&session).await.unwrap();

        store.complete_session(&session.id, SessionStatus::Failed, Some(1), 42).await.unwrap();
        let fetched = store.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, SessionStatus::Failed);
        assert_eq!(fetched.exit_code, Some(1));
        assert_eq!(fetched.completed_at_ms, Some(42));
    }

    #[tokio::test]
    async fn list_sessions_for_task_is_scoped() {
        let (store, task_id) = store_with_task().await;
        let task = store.get_task(&task_id).await.unwrap().unwrap();
        let other_task =
            store.insert_task(Task::builder().project_id(task.project_id).build()).await.unwrap();
        store.insert_session(&Session::builder().task_id(task_id).build()).await.unwrap();
        store.insert_session(&Session::builder().task_id(other_task.id).build()).await.unwrap();

        let sessions = store.list_sessions_for_task(&task_id).await.unwrap();
        assert_eq!(sessions.len(), 1);
    }
}
