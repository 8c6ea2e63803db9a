// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn created_and_running_count_as_active() {
    assert!(SessionStatus::Created.is_active());
    assert!(SessionStatus::Running.is_active());
    assert!(!SessionStatus::Completed.is_active());
}

#[test]
fn terminal_statuses_are_not_active() {
    for status in [SessionStatus::Completed, SessionStatus::Failed, SessionStatus::Cancelled] {
        assert!(status.is_terminal());
        assert!(!status.is_active());
    }
}

#[test]
fn builder_produces_distinct_ids() {
    let a = Session::builder().build();
    let b = Session::builder().build();
    assert_ne!(a.id, b.id);
}
