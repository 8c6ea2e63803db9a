// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::Serialize;

use super::{apply_limit, format_time_ago, OutputFormat};

#[derive(Debug, Clone, Serialize)]
struct FakeEntry {
    name: String,
}

#[test]
fn format_time_ago_handles_zero_as_unset() {
    assert_eq!(format_time_ago(0), "-");
}

#[test]
fn format_time_ago_buckets_by_magnitude() {
    let now_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64;
    assert_eq!(format_time_ago(now_ms - 5_000), "5s");
    assert_eq!(format_time_ago(now_ms - 120_000), "2m");
}

#[test]
fn apply_limit_truncates_and_reports_remaining() {
    let mut items = vec![1, 2, 3, 4, 5];
    let trunc = apply_limit(&mut items, 2, false);
    assert_eq!(items, vec![1, 2]);
    assert_eq!(trunc.unwrap().remaining, 3);
}

#[test]
fn apply_limit_no_limit_keeps_everything() {
    let mut items = vec![1, 2, 3];
    let trunc = apply_limit(&mut items, 1, true);
    assert_eq!(items.len(), 3);
    assert!(trunc.is_none());
}

#[test]
fn handle_list_reports_empty_message() {
    let items: Vec<FakeEntry> = vec![];
    let result = super::handle_list(OutputFormat::Text, &items, "No tasks found", |_, _| {});
    assert!(result.is_ok());
}
