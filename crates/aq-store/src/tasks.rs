// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::row::{task_from_row, task_metadata_json};
use crate::{Store, StoreError};
use aq_core::{SessionId, Task, TaskId, TaskMetadata, TaskStatus};
use sqlx::Row;

impl Store {
    /// Insert a task, assigning its `seq` from the database's own
    /// monotonic rowid so the `(position, priority, id)` tie-break in
    /// [`Task::schedule_key`] has a total order to fall back on.
    ///
    /// Rejects a `parent_id` that doesn't exist or would close a cycle,
    /// per spec.md §3's "the code must reject cycles on insert".
    pub async fn insert_task(&self, mut task: Task) -> Result<Task, StoreError> {
        if let Some(parent_id) = &task.parent_id {
            self.assert_acyclic_parent(&task.id, parent_id).await?;
        }

        let metadata_json = task_metadata_json(&task.metadata);
        let result = sqlx::query(
            "INSERT INTO tasks
                (id, seq, project_id, title, description, status, priority, position,
                 parent_id, complexity, recommended_model, active_session_id, metadata,
                 created_at_ms, started_at_ms, completed_at_ms)
             VALUES (?, (SELECT COALESCE(MAX(seq), 0) + 1 FROM tasks), ?, ?, ?, ?, ?, ?,
                     ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(task.id.as_str())
        .bind(task.project_id.as_str())
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.to_string())
        .bind(task.priority)
        .bind(task.position)
        .bind(task.parent_id.as_ref().map(TaskId::as_str))
        .bind(&task.complexity)
        .bind(&task.recommended_model)
        .bind(task.active_session_id.as_ref().map(SessionId::as_str))
        .bind(&metadata_json)
        .bind(task.created_at_ms)
        .bind(task.started_at_ms)
        .bind(task.completed_at_ms)
        .execute(self.pool())
        .await?;

        let row = sqlx::query("SELECT seq FROM tasks WHERE rowid = ?")
            .bind(result.last_insert_rowid())
            .fetch_one(self.pool())
            .await?;
        task.seq = row.try_get("seq")?;
        Ok(task)
    }

    async fn assert_acyclic_parent(
        &self,
        task_id: &TaskId,
        parent_id: &TaskId,
    ) -> Result<(), StoreError> {
        let mut current = Some(parent_id.clone());
        while let Some(id) = current {
            if &id == task_id {
                return Err(StoreError::CyclicParent(task_id.to_string()));
            }
            current = self.get_task(&id).await?.and_then(|t| t.parent_id);
        }
        Ok(())
    }

    pub async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(task_from_row).transpose()
    }

    pub async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let rows = sqlx::query("SELECT * FROM tasks ORDER BY position ASC, priority DESC, seq ASC")
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(task_from_row).collect()
    }

    pub async fn list_children(&self, parent_id: &TaskId) -> Result<Vec<Task>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM tasks WHERE parent_id = ? ORDER BY position ASC, priority DESC, seq ASC",
        )
        .bind(parent_id.as_str())
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(task_from_row).collect()
    }

    pub async fn set_status(&self, id: &TaskId, status: TaskStatus) -> Result<(), StoreError> {
        sqlx::query("UPDATE tasks SET status = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(id.as_str())
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn set_assessment(
        &self,
        id: &TaskId,
        complexity: &str,
        recommended_model: Option<&str>,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE tasks SET complexity = ?, recommended_model = ? WHERE id = ?")
            .bind(complexity)
            .bind(recommended_model)
            .bind(id.as_str())
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn set_active_session(
        &self,
        id: &TaskId,
        session_id: Option<&SessionId>,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE tasks SET active_session_id = ? WHERE id = ?")
            .bind(session_id.map(SessionId::as_str))
            .bind(id.as_str())
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn touch_started(&self, id: &TaskId, now_ms: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE tasks SET started_at_ms = ? WHERE id = ? AND started_at_ms IS NULL")
            .bind(now_ms)
            .bind(id.as_str())
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn touch_completed(&self, id: &TaskId, now_ms: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE tasks SET completed_at_ms = ? WHERE id = ?")
            .bind(now_ms)
            .bind(id.as_str())
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Shallow-merge `patch` into the task's metadata bag; a `null` value
    /// for a key deletes it. Runs inside a transaction so the read-modify-
    /// write can't race another writer (spec.md §3 invariant iv, §4.1).
    pub async fn merge_metadata(
        &self,
        id: &TaskId,
        patch: serde_json::Value,
    ) -> Result<TaskMetadata, StoreError> {
        let mut tx = self.pool().begin().await?;
        // SQLite allows only one writer at a time, so `begin()` already
        // serializes this read-modify-write against any other transaction.
        let row = sqlx::query("SELECT metadata FROM tasks WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        let row = row.ok_or_else(|| StoreError::NotFound { kind: "task", id: id.to_string() })?;
        let metadata_raw: String = row.try_get("metadata")?;
        let mut metadata: TaskMetadata = serde_json::from_str(&metadata_raw)
            .map_err(|source| StoreError::CorruptRow { table: "tasks", column: "metadata", source })?;
        metadata.merge(patch)?;

        sqlx::query("UPDATE tasks SET metadata = ? WHERE id = ?")
            .bind(task_metadata_json(&metadata))
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(metadata)
    }

    /// Reorder tasks to the given `(id, position)` pairs in one transaction.
    pub async fn reorder(&self, positions: &[(TaskId, i64)]) -> Result<(), StoreError> {
        let mut tx = self.pool().begin().await?;
        for (id, position) in positions {
            sqlx::query("UPDATE tasks SET position = ? WHERE id = ?")
                .bind(position)
                .bind(id.as_str())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Up to `limit` pending, unassessed tasks in schedule order.
    pub async fn next_pending_unassessed(&self, limit: i64) -> Result<Vec<Task>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM tasks
             WHERE status = 'pending' AND complexity IS NULL
             ORDER BY position ASC, priority DESC, seq ASC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(task_from_row).collect()
    }

    /// Up to `limit` pending, assessed, `active=true` tasks in schedule
    /// order — the execute phase's candidate pool.
    pub async fn next_executable(&self, limit: i64) -> Result<Vec<Task>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM tasks
             WHERE status = 'pending'
               AND complexity IS NOT NULL
               AND json_extract(metadata, '$.active') = 1
             ORDER BY position ASC, priority DESC, seq ASC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(task_from_row).collect()
    }

    /// Collapse exact `(title, description, parent_id)` duplicates among
    /// pending tasks, keeping the earliest-inserted row — i.e. the lowest
    /// `seq`, not the lowest external id, which is a random nanoid and
    /// carries no ordering information. Returns `(removed, kept)` pairs so
    /// the Scheduler can emit one `task.deduped` per discard, naming the
    /// survivor it was collapsed into.
    pub async fn dedupe_pending(&self) -> Result<Vec<(TaskId, TaskId)>, StoreError> {
        let mut tx = self.pool().begin().await?;
        let rows = sqlx::query(
            "SELECT id, title, description, parent_id FROM tasks
             WHERE status = 'pending'
             ORDER BY seq ASC",
        )
        .fetch_all(&mut *tx)
        .await?;

        let mut seen: std::collections::HashMap<(String, String, Option<String>), String> =
            std::collections::HashMap::new();
        let mut removed = Vec::new();
        for row in &rows {
            let id: String = row.try_get("id")?;
            let title: String = row.try_get("title")?;
            let description: String = row.try_get("description")?;
            let parent_id: Option<String> = row.try_get("parent_id")?;
            let key = (title, description, parent_id);
            match seen.get(&key) {
                Some(kept) => removed.push((TaskId::from_string(&id), TaskId::from_string(kept))),
                None => {
                    seen.insert(key, id);
                }
            }
        }

        for (removed_id, _kept_id) in &removed {
            sqlx::query("DELETE FROM tasks WHERE id = ?")
                .bind(removed_id.as_str())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(removed)
    }
}
