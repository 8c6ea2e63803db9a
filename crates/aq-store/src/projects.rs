// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::row::project_from_row;
use crate::{Store, StoreError};
use aq_core::{Project, ProjectId};
use sqlx::Row;

impl Store {
    pub async fn insert_project(&self, project: &Project) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO projects (id, name, working_dir, vcs_origin, default_branch, created_at_ms)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(project.id.as_str())
        .bind(&project.name)
        .bind(project.working_dir.to_string_lossy().to_string())
        .bind(&project.vcs_origin)
        .bind(&project.default_branch)
        .bind(project.created_at_ms)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn get_project(&self, id: &ProjectId) -> Result<Option<Project>, StoreError> {
        let row = sqlx::query("SELECT * FROM projects WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(project_from_row).transpose()
    }

    pub async fn get_project_by_name(&self, name: &str) -> Result<Option<Project>, StoreError> {
        let row = sqlx::query("SELECT * FROM projects WHERE name = ?")
            .bind(name)
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(project_from_row).transpose()
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        let rows = sqlx::query("SELECT * FROM projects ORDER BY created_at_ms ASC")
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(project_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aq_core::Project;

    #[tokio::test]
    async fn insert_and_fetch_round_trips() {
        let store = Store::open_in_memory().await.unwrap();
        let project = Project::builder().name("demo").build();
        store.insert_project(&project).await.unwrap();

        let fetched = store.get_project(&project.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "demo");
        assert_eq!(fetched.id, project.id);
    }

    #[tokio::test]
    async fn name_lookup_finds_the_right_row() {
        let store = Store::open_in_memory().await.unwrap();
        store.insert_project(&Project::builder().name("alpha").build()).await.unwrap();
        store.insert_project(&Project::builder().name("beta").build()).await.unwrap();

        let found = store.get_project_by_name("beta").await.unwrap().unwrap();
        assert_eq!(found.name, "beta");
        assert!(store.get_project_by_name("gamma").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_name_is_rejected() {
        let store = Store::open_in_memory().await.unwrap();
        store.insert_project(&Project::builder().name("dup").build()).await.unwrap();
        let result = store.insert_project(&Project::builder().name("dup").build()).await;
        assert!(result.is_err());
    }
}
