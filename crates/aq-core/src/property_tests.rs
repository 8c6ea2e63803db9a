// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Property tests for the metadata merge's null-sentinel-delete semantics
//! and the id newtypes' string round-trip, where the input space is large
//! enough that a handful of fixed examples wouldn't cover it.

use crate::id::IdBuf;
use crate::metadata::TaskMetadata;
use crate::task::TaskId;
use proptest::prelude::*;
use serde_json::{json, Value};

fn arb_key() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,10}"
}

fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Bool(true)),
        Just(Value::Bool(false)),
        any::<i32>().prop_map(|n| json!(n)),
        ".*".prop_map(Value::String),
    ]
}

proptest! {
    /// Merging `{key: null}` always removes the key, whether or not it was
    /// present beforehand, and never touches any other key already in the
    /// bag (spec.md §3 invariant iv).
    #[test]
    fn null_value_always_deletes_and_nothing_else(
        key in arb_key(),
        other_key in arb_key(),
        other_value in arb_scalar(),
        pre_populate in any::<bool>(),
    ) {
        prop_assume!(key != other_key);

        let mut meta = TaskMetadata::new();
        meta.0.insert(other_key.clone(), other_value.clone());
        if pre_populate {
            meta.0.insert(key.clone(), json!("anything"));
        }

        meta.merge(json!({ key.clone(): Value::Null })).unwrap();

        prop_assert!(!meta.0.contains_key(&key));
        prop_assert_eq!(meta.0.get(&other_key), Some(&other_value));
    }

    /// A non-null merge always leaves the bag holding exactly the patched
    /// value for that key, regardless of what (if anything) was there
    /// before — shallow merge never deep-merges or drops a fresh write.
    #[test]
    fn non_null_value_always_overwrites(
        key in arb_key(),
        first in arb_scalar(),
        second in arb_scalar(),
    ) {
        let mut meta = TaskMetadata::new();
        meta.merge(json!({ key.clone(): first })).unwrap();
        meta.merge(json!({ key.clone(): second.clone() })).unwrap();
        prop_assert_eq!(meta.0.get(&key), Some(&second));
    }

    /// Merging a patch is equivalent, key by key, to applying each of its
    /// entries as an independent single-key merge in the same order —
    /// the "shallow" part of shallow-merge.
    #[test]
    fn merge_is_equivalent_to_per_key_merges(
        entries in prop::collection::vec((arb_key(), arb_scalar()), 0..6),
    ) {
        let mut batched = TaskMetadata::new();
        let patch: serde_json::Map<String, Value> = entries.iter().cloned().collect();
        batched.merge(Value::Object(patch)).unwrap();

        let mut sequential = TaskMetadata::new();
        for (key, value) in &entries {
            sequential.merge(json!({ key.clone(): value.clone() })).unwrap();
        }

        prop_assert_eq!(batched, sequential);
    }

    /// Any non-object patch is rejected without mutating the bag.
    #[test]
    fn non_object_patch_is_rejected_and_leaves_the_bag_untouched(
        value in arb_scalar(),
        seed_key in arb_key(),
    ) {
        let mut meta = TaskMetadata::new();
        meta.0.insert(seed_key.clone(), json!("seed"));
        let before = meta.clone();

        let result = meta.merge(value);

        prop_assert!(result.is_err());
        prop_assert_eq!(meta, before);
    }

    /// `TaskId::from_string` round-trips any string the generator
    /// `TaskId::new` could plausibly produce: same length class, same
    /// prefix, and `as_str()` recovers exactly what was parsed.
    #[test]
    fn task_id_from_string_round_trips(suffix in "[A-Za-z0-9_-]{0,19}") {
        let raw = format!("{}{}", TaskId::PREFIX, suffix);
        let id = TaskId::from_string(&raw);
        prop_assert_eq!(id.as_str(), raw.as_str());
        prop_assert_eq!(id.suffix(), suffix.as_str());
    }

    /// `IdBuf` never panics on any string up to its capacity, and always
    /// reports back exactly the bytes it was given.
    #[test]
    fn id_buf_round_trips_any_string_within_capacity(
        s in "[ -~]{0,23}",
    ) {
        let buf = IdBuf::new(&s);
        prop_assert_eq!(buf.as_str(), s.as_str());
        prop_assert_eq!(buf.is_empty(), s.is_empty());
    }
}
