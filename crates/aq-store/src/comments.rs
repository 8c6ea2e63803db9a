// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::row::comment_from_row;
use crate::{Store, StoreError};
use aq_core::{Comment, TaskId};
use sqlx::Row;

impl Store {
    pub async fn insert_comment(&self, comment: &Comment) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO comments (id, task_id, content, author, created_at_ms, updated_at_ms)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(comment.id.as_str())
        .bind(comment.task_id.as_str())
        .bind(&comment.content)
        .bind(&comment.author)
        .bind(comment.created_at_ms)
        .bind(comment.updated_at_ms)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn list_comments_for_task(&self, task_id: &TaskId) -> Result<Vec<Comment>, StoreError> {
        let rows = sqlx::query("SELECT * FROM comments WHERE task_id = ? ORDER BY created_at_ms ASC")
            .bind(task_id.as_str())
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(comment_from_row).collect()
    }

    /// Cascade-delete every comment belonging to `task_id`, per spec.md §3
    /// ("Deleted cascade with task").
    pub async fn delete_comments_for_task(&self, task_id: &TaskId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM comments WHERE task_id = ?")
            .bind(task_id.as_str())
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
