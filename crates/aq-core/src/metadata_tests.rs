// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn merge_inserts_new_keys() {
    let mut meta = TaskMetadata::new();
    meta.merge(json!({"active": true, "retry_count": 2})).unwrap();
    assert!(meta.active());
    assert_eq!(meta.retry_count(), 2);
}

#[test]
fn merge_overwrites_existing_keys() {
    let mut meta = TaskMetadata::new();
    meta.set_active(true);
    meta.merge(json!({"active": false})).unwrap();
    assert!(!meta.active());
}

#[test]
fn merge_null_deletes_key() {
    let mut meta = TaskMetadata::new();
    meta.set_error("boom");
    assert_eq!(meta.error(), Some("boom"));
    meta.merge(json!({"error": null})).unwrap();
    assert_eq!(meta.error(), None);
}

#[test]
fn merge_is_shallow_not_deep() {
    let mut meta = TaskMetadata::new();
    meta.set_assessment(json!({"complexity": "simple", "reasoning": "short task"}));
    meta.merge(json!({"assessment": {"complexity": "medium"}})).unwrap();
    // Shallow merge replaces the whole sub-object; "reasoning" is gone.
    assert_eq!(meta.assessment(), Some(&json!({"complexity": "medium"})));
}

#[test]
fn merge_rejects_non_object_patch() {
    let mut meta = TaskMetadata::new();
    let err = meta.merge(json!(["not", "an", "object"])).unwrap_err();
    assert_eq!(err, MetadataError::NotAnObject("array"));
}

#[test]
fn increment_retry_count_starts_at_zero() {
    let mut meta = TaskMetadata::new();
    assert_eq!(meta.retry_count(), 0);
    assert_eq!(meta.increment_retry_count(), 1);
    assert_eq!(meta.increment_retry_count(), 2);
}

#[test]
fn decomposed_into_round_trips_ids() {
    let mut meta = TaskMetadata::new();
    meta.set_decomposed_into(&["tsk-a".to_string(), "tsk-b".to_string()]);
    assert_eq!(meta.decomposed_into(), vec!["tsk-a".to_string(), "tsk-b".to_string()]);
}

#[test]
fn unrecognized_keys_pass_through() {
    let mut meta = TaskMetadata::new();
    meta.merge(json!({"custom_field": "kept"})).unwrap();
    assert_eq!(meta.0.get("custom_field"), Some(&json!("kept")));
}
