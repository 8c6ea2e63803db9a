// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::define_id;

define_id! {
    pub struct TestId("tst-");
}

#[test]
fn new_ids_carry_prefix_and_fixed_length() {
    let id = TestId::new();
    assert!(id.as_str().starts_with("tst-"));
    assert_eq!(id.as_str().len(), crate::id::ID_MAX_LEN);
}

#[test]
fn new_ids_are_unique() {
    assert_ne!(TestId::new(), TestId::new());
}

#[test]
fn from_string_round_trips() {
    let id = TestId::from_string("tst-abc123");
    assert_eq!(id.as_str(), "tst-abc123");
    assert_eq!(id.suffix(), "abc123");
}

#[test]
fn short_truncates_suffix() {
    let id = TestId::from_string("tst-abcdefgh");
    assert_eq!(id.short(4), "abcd");
    assert_eq!(id.short(100), "abcdefgh");
}

#[test]
fn display_matches_as_str() {
    let id = TestId::from_string("tst-xyz");
    assert_eq!(format!("{id}"), "tst-xyz");
}

#[test]
fn equality_with_str() {
    let id = TestId::from_string("tst-xyz");
    assert_eq!(id, "tst-xyz");
    assert_eq!(id, *"tst-xyz".to_string().as_str());
}

#[test]
fn serde_round_trip() {
    let id = TestId::from_string("tst-abc123");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"tst-abc123\"");
    let back: TestId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

#[test]
fn deserialize_rejects_oversized_ids() {
    let too_long = "\"tst-012345678901234567890123456789\"";
    let result: Result<TestId, _> = serde_json::from_str(too_long);
    assert!(result.is_err());
}
