// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rate-limit snapshot: the last reading the RateLimitProbe produced,
//! consulted by the heartbeat before it launches new sessions (spec.md §4.5, §4.3).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A point-in-time reading of the agent CLI's upstream rate-limit state.
///
/// There is exactly one snapshot in force at a time — a fresh probe result
/// replaces it wholesale rather than merging, since the upstream limiter
/// resets each field together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSnapshot {
    pub tier: String,
    pub used: u64,
    pub limit: u64,
    pub percent: f64,
    pub is_limited: bool,
    pub reset_at_ms: Option<i64>,
    /// Unparsed probe output, kept for diagnostics when `percent`/`is_limited`
    /// don't explain an operator-visible surprise.
    pub raw: Value,
    pub updated_at_ms: i64,
}

impl RateLimitSnapshot {
    /// A snapshot indicating no rate-limit pressure, used before the first
    /// probe has run and as the fallback when probing itself fails.
    pub fn unknown(now_ms: i64) -> Self {
        Self {
            tier: "unknown".to_string(),
            used: 0,
            limit: 0,
            percent: 0.0,
            is_limited: false,
            reset_at_ms: None,
            raw: Value::Null,
            updated_at_ms: now_ms,
        }
    }

    /// True once the snapshot is stale enough that the heartbeat should
    /// re-probe rather than trust it, per spec.md §4.3's per-beat cadence.
    pub fn is_stale(&self, now_ms: i64, max_age_ms: i64) -> bool {
        now_ms.saturating_sub(self.updated_at_ms) >= max_age_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_snapshot_is_not_limited() {
        let snapshot = RateLimitSnapshot::unknown(0);
        assert!(!snapshot.is_limited);
        assert_eq!(snapshot.percent, 0.0);
    }

    #[test]
    fn staleness_is_inclusive_of_the_boundary() {
        let snapshot = RateLimitSnapshot::unknown(1_000);
        assert!(snapshot.is_stale(1_030, 30));
        assert!(!snapshot.is_stale(1_029, 30));
    }
}
