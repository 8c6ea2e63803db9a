// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use aq_core::MetadataError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("invalid metadata patch: {0}")]
    Metadata(#[from] MetadataError),

    #[error("not found: {kind} {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("parent task {0} would introduce a cycle")]
    CyclicParent(String),

    #[error("corrupt row in {table}.{column}: {source}")]
    CorruptRow {
        table: &'static str,
        column: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
