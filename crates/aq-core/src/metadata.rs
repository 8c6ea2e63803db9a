// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The task metadata side-channel: a shallow-merged, open-ended JSON bag
//! with a typed view over its recognized keys.
//!
//! See spec §9 "Dynamic metadata mapping": recognized keys are `active`,
//! `decompose_on_heartbeat`, `assessment`, `decomposed_into`, `retry_count`,
//! `error`, `branch`, `worktree_path`, `pr_url`. Unrecognized keys pass
//! through untouched for forward compatibility.

use crate::error::MetadataError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A task's free-form metadata bag, with typed accessors over well-known keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskMetadata(pub Map<String, Value>);

impl TaskMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shallow-merge `patch` into this bag. A key mapped to JSON `null` in
    /// the patch deletes that key from the bag rather than setting it to
    /// null; every other key is inserted/overwritten as-is (no deep merge
    /// of nested objects).
    ///
    /// Returns an error if `patch` is not a JSON object.
    pub fn merge(&mut self, patch: Value) -> Result<(), MetadataError> {
        let patch = match patch {
            Value::Object(map) => map,
            other => return Err(MetadataError::NotAnObject(json_type_name(&other))),
        };
        for (key, value) in patch {
            if value.is_null() {
                self.0.remove(&key);
            } else {
                self.0.insert(key, value);
            }
        }
        Ok(())
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    fn get_u32(&self, key: &str) -> Option<u32> {
        self.0.get(key).and_then(Value::as_u64).map(|v| v as u32)
    }

    /// Gates execution: only tasks with `active=true` are picked up by
    /// `execute_next_tasks`.
    pub fn active(&self) -> bool {
        self.get_bool("active").unwrap_or(false)
    }

    pub fn set_active(&mut self, value: bool) {
        self.0.insert("active".to_string(), Value::Bool(value));
    }

    /// Hint to the assessor that this task should be decomposed on its
    /// next heartbeat pass.
    pub fn decompose_on_heartbeat(&self) -> bool {
        self.get_bool("decompose_on_heartbeat").unwrap_or(false)
    }

    /// The raw assessment sub-object returned by the AssessmentEngine, if any.
    pub fn assessment(&self) -> Option<&Value> {
        self.0.get("assessment")
    }

    pub fn set_assessment(&mut self, value: Value) {
        self.0.insert("assessment".to_string(), value);
    }

    /// IDs of child tasks created by decomposition.
    pub fn decomposed_into(&self) -> Vec<String> {
        self.0
            .get("decomposed_into")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }

    pub fn set_decomposed_into(&mut self, ids: &[String]) {
        self.0.insert(
            "decomposed_into".to_string(),
            Value::Array(ids.iter().map(|id| Value::String(id.clone())).collect()),
        );
    }

    pub fn retry_count(&self) -> u32 {
        self.get_u32("retry_count").unwrap_or(0)
    }

    pub fn set_retry_count(&mut self, count: u32) {
        self.0.insert("retry_count".to_string(), Value::from(count));
    }

    pub fn increment_retry_count(&mut self) -> u32 {
        let next = self.retry_count() + 1;
        self.set_retry_count(next);
        next
    }

    pub fn error(&self) -> Option<&str> {
        self.get_str("error")
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.0.insert("error".to_string(), Value::String(message.into()));
    }

    pub fn branch(&self) -> Option<&str> {
        self.get_str("branch")
    }

    pub fn set_branch(&mut self, branch: impl Into<String>) {
        self.0.insert("branch".to_string(), Value::String(branch.into()));
    }

    pub fn worktree_path(&self) -> Option<&str> {
        self.get_str("worktree_path")
    }

    pub fn set_worktree_path(&mut self, path: impl Into<String>) {
        self.0.insert("worktree_path".to_string(), Value::String(path.into()));
    }

    pub fn pr_url(&self) -> Option<&str> {
        self.get_str("pr_url")
    }

    pub fn set_pr_url(&mut self, url: impl Into<String>) {
        self.0.insert("pr_url".to_string(), Value::String(url.into()));
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn as_value(&self) -> &Map<String, Value> {
        &self.0
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[path = "metadata_tests.rs"]
mod tests;
