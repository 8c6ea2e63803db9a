// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! aq-store: the single source of truth for tasks, sessions, comments,
//! events, the rate-limit snapshot, and projects. Every other component
//! receives immutable snapshots and writes back through this narrow API.

pub mod error;
mod row;

mod comments;
mod events;
mod projects;
mod rate_limits;
mod sessions;
mod tasks;

pub use error::StoreError;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Persistent state backed by a single SQLite database file.
///
/// Cloning is cheap: `SqlitePool` is itself a handle around a connection
/// pool, so a `Store` can be shared across tasks by `.clone()` rather than
/// wrapping it in an `Arc` (mirroring how the pool is used everywhere else
/// in this stack).
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if missing) the database file at `path` and apply
    /// every migration under `aq-store/migrations/` that hasn't run yet.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Database(sqlx::Error::Io(e))
                })?;
            }
        }

        let connect_options = SqliteConnectOptions::from_str(&path.to_string_lossy())?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .connect_with(connect_options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// In-memory database, used by tests that want a fresh schema without
    /// touching the filesystem.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(SqliteConnectOptions::from_str(":memory:")?.foreign_keys(true))
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_in_memory_applies_migrations_idempotently() {
        let store = Store::open_in_memory().await.unwrap();
        // Re-running migrate() against the same pool must be a no-op, not
        // an error, matching spec.md §6's "idempotent (IF NOT EXISTS)".
        store.migrate().await.unwrap();
    }
}
