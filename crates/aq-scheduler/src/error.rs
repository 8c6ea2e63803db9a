// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use aq_adapters::{AgentAdapterError, AssessmentError, VcsError};
use aq_bus::EventSinkError;
use aq_store::StoreError;
use thiserror::Error;

/// Errors the Scheduler's own operations can surface to their caller
/// (the Heartbeat). Per-task failures inside a batch are handled and
/// recorded on the task itself rather than propagated here — only
/// failures that make the whole phase meaningless (the Store is down)
/// reach this type.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Event(#[from] EventSinkError),
    #[error(transparent)]
    Vcs(#[from] VcsError),
    #[error(transparent)]
    Assessment(#[from] AssessmentError),
    #[error(transparent)]
    Agent(#[from] AgentAdapterError),
    #[error("task {0} references project {1} which does not exist")]
    MissingProject(String, String),
}
