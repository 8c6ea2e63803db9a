// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn unassessed_requires_pending_status_and_no_complexity() {
    let task = Task::builder().status(TaskStatus::Pending).build();
    assert!(task.is_unassessed());

    let assessed = Task::builder().status(TaskStatus::Pending).complexity("simple").build();
    assert!(!assessed.is_unassessed());
}

#[test]
fn executable_requires_pending_complexity_and_active_flag() {
    let mut metadata = TaskMetadata::new();
    metadata.set_active(true);
    let task = Task::builder()
        .status(TaskStatus::Pending)
        .complexity("simple")
        .metadata(metadata)
        .build();
    assert!(task.is_executable());

    let inactive = Task::builder().status(TaskStatus::Pending).complexity("simple").build();
    assert!(!inactive.is_executable());

    let executing = Task::builder().status(TaskStatus::Executing).complexity("simple").build();
    assert!(!executing.is_executable());
}

#[test]
fn schedule_key_orders_position_asc_priority_desc_id_asc() {
    let low_priority = Task::builder().seq(1).position(0).priority(0).build();
    let high_priority = Task::builder().seq(2).position(0).priority(5).build();
    assert!(high_priority.schedule_key() < low_priority.schedule_key());

    let earlier_position = Task::builder().seq(3).position(0).priority(0).build();
    let later_position = Task::builder().seq(4).position(1).priority(0).build();
    assert!(earlier_position.schedule_key() < later_position.schedule_key());

    let lower_seq = Task::builder().seq(5).position(0).priority(0).build();
    let higher_seq = Task::builder().seq(6).position(0).priority(0).build();
    assert!(lower_seq.schedule_key() < higher_seq.schedule_key());
}

#[test]
fn terminal_statuses() {
    assert!(TaskStatus::Completed.is_terminal());
    assert!(TaskStatus::Failed.is_terminal());
    assert!(TaskStatus::Cancelled.is_terminal());
    assert!(TaskStatus::Decomposed.is_terminal());
    assert!(!TaskStatus::Pending.is_terminal());
    assert!(!TaskStatus::Executing.is_terminal());
}

#[test]
fn display_matches_event_fragment() {
    assert_eq!(TaskStatus::ReadyForReview.to_string(), "ready_for_review");
    assert_eq!(TaskStatus::ReadyForReview.event_fragment(), "ready_for_review");
}
