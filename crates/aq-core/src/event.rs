// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event entity: the append-only log that EventBus fans out and every
//! other component treats as the authoritative record of state changes
//! (spec.md §3, §4.8).

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

crate::define_id! {
    /// Unique external identifier for a logged event.
    pub struct EventId("evt-");
}

/// One row of the append-only event log.
///
/// `event_type` is a dotted namespace string (e.g. `"task.assessed"`,
/// `"session.started"`, `"heartbeat.tick"`) rather than a closed Rust enum,
/// matching spec.md §6's "Event-type namespace (dotted; non-exhaustive)" —
/// new event types can be introduced by any component without a schema
/// change, at the cost of losing exhaustiveness checking at the type
/// level. [`EventKind`] recovers ergonomic, typo-free construction for the
/// namespace this crate knows about; anything else (future extensions
/// from a newer build of a collaborating component) still round-trips as
/// a plain `Event` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub payload: Value,
    pub created_at_ms: i64,
}

/// Typed constructors for the dotted event namespace spec.md §6 enumerates.
///
/// This is a convenience layer over [`Event`], not a replacement for it —
/// `EventKind::into_event` is the only place that needs to agree with the
/// string literals other components match against.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    TaskCreated,
    TaskAssessed { complexity: String, recommended_model: Option<String> },
    TaskAssessFailed { retry_count: u32 },
    TaskExecuting { session_id: String },
    TaskReadyForReview { pr_url: String },
    TaskCompleted,
    TaskFailed { reason: String },
    TaskCancelled,
    TaskDecomposed { child_ids: Vec<String> },
    TaskDeduped { kept_id: String },
    SessionStarted,
    SessionOutput { sample: String },
    SessionCompleted { exit_code: i32 },
    SessionFailed { exit_code: Option<i32> },
    SessionCancelled,
    HeartbeatTick { beat: u64, phase: &'static str, payload: Value },
    HeartbeatRateLimited { reset_at_ms: Option<i64> },
    HeartbeatError { phase: &'static str, message: String },
}

impl EventKind {
    /// The dotted event-type string, e.g. `"task.ready_for_review"`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::TaskCreated => "task.created",
            Self::TaskAssessed { .. } => "task.assessed",
            Self::TaskAssessFailed { .. } => "task.assess_failed",
            Self::TaskExecuting { .. } => "task.executing",
            Self::TaskReadyForReview { .. } => "task.ready_for_review",
            Self::TaskCompleted => "task.completed",
            Self::TaskFailed { .. } => "task.failed",
            Self::TaskCancelled => "task.cancelled",
            Self::TaskDecomposed { .. } => "task.decomposed",
            Self::TaskDeduped { .. } => "task.deduped",
            Self::SessionStarted => "session.started",
            Self::SessionOutput { .. } => "session.output",
            Self::SessionCompleted { .. } => "session.completed",
            Self::SessionFailed { .. } => "session.failed",
            Self::SessionCancelled => "session.cancelled",
            Self::HeartbeatTick { .. } => "heartbeat.tick",
            Self::HeartbeatRateLimited { .. } => "heartbeat.rate_limited",
            Self::HeartbeatError { .. } => "heartbeat.error",
        }
    }

    fn payload(&self) -> Value {
        match self {
            Self::TaskCreated
            | Self::TaskCompleted
            | Self::TaskCancelled
            | Self::SessionStarted
            | Self::SessionCancelled => json!({}),
            Self::TaskAssessed { complexity, recommended_model } => {
                json!({ "complexity": complexity, "recommended_model": recommended_model })
            }
            Self::TaskAssessFailed { retry_count } => json!({ "retry_count": retry_count }),
            Self::TaskExecuting { session_id } => json!({ "session_id": session_id }),
            Self::TaskReadyForReview { pr_url } => json!({ "pr_url": pr_url }),
            Self::TaskFailed { reason } => json!({ "reason": reason }),
            Self::TaskDecomposed { child_ids } => json!({ "child_ids": child_ids }),
            Self::TaskDeduped { kept_id } => json!({ "kept_id": kept_id }),
            Self::SessionOutput { sample } => json!({ "sample": sample }),
            Self::SessionCompleted { exit_code } => json!({ "exit_code": exit_code }),
            Self::SessionFailed { exit_code } => json!({ "exit_code": exit_code }),
            Self::HeartbeatTick { beat, phase, payload } => {
                let mut obj = json!({ "beat": beat, "phase": phase });
                if let (Some(map), Value::Object(extra)) = (obj.as_object_mut(), payload) {
                    for (k, v) in extra {
                        map.insert(k.clone(), v.clone());
                    }
                }
                obj
            }
            Self::HeartbeatRateLimited { reset_at_ms } => json!({ "reset_at_ms": reset_at_ms }),
            Self::HeartbeatError { phase, message } => json!({ "phase": phase, "message": message }),
        }
    }

    /// Build the persisted [`Event`] row for this kind, scoped to one entity.
    pub fn into_event(self, entity_type: &str, entity_id: &str, now_ms: i64) -> Event {
        Event {
            id: EventId::new(),
            event_type: self.type_name().to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            payload: self.payload(),
            created_at_ms: now_ms,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
