// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error kinds that don't belong to any one entity module.

use thiserror::Error;

/// Errors from merging a metadata patch into a task's metadata bag.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("metadata patch must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}
