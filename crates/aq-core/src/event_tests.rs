// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn type_name_matches_dotted_namespace() {
    assert_eq!(EventKind::TaskCreated.type_name(), "task.created");
    assert_eq!(
        EventKind::TaskReadyForReview { pr_url: "x".into() }.type_name(),
        "task.ready_for_review"
    );
    assert_eq!(EventKind::HeartbeatTick { beat: 0, phase: "scan", payload: json!({}) }.type_name(), "heartbeat.tick");
}

#[test]
fn into_event_carries_entity_scope_and_timestamp() {
    let event = EventKind::SessionCompleted { exit_code: 0 }.into_event("session", "ses-abc", 42);
    assert_eq!(event.event_type, "session.completed");
    assert_eq!(event.entity_type, "session");
    assert_eq!(event.entity_id, "ses-abc");
    assert_eq!(event.created_at_ms, 42);
    assert_eq!(event.payload["exit_code"], 0);
}

#[test]
fn heartbeat_tick_payload_merges_extra_fields() {
    let event = EventKind::HeartbeatTick {
        beat: 7,
        phase: "execute",
        payload: json!({ "started": 3 }),
    }
    .into_event("heartbeat", "singleton", 0);
    assert_eq!(event.payload["beat"], 7);
    assert_eq!(event.payload["phase"], "execute");
    assert_eq!(event.payload["started"], 3);
}

#[test]
fn events_carry_distinct_ids() {
    let a = EventKind::TaskCreated.into_event("task", "tsk-1", 0);
    let b = EventKind::TaskCreated.into_event("task", "tsk-1", 0);
    assert_ne!(a.id, b.id);
}
