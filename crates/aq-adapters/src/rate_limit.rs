// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reads the agent CLI's own rate-limit cache file rather than calling any
//! upstream API directly (spec.md §4.7) — the CLI already tracks usage
//! against its account for its own throttling, and this probe just piggy-
//! backs on that state.

use aq_core::RateLimitSnapshot;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RateLimitProbeError {
    #[error("rate-limit cache not found at {0}")]
    CacheMissing(PathBuf),
    #[error("could not read rate-limit cache: {0}")]
    Io(#[from] std::io::Error),
    #[error("rate-limit cache was not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[async_trait]
pub trait RateLimitProbe: Send + Sync {
    /// Never fails the caller outright — an unreadable or missing cache is
    /// reported as `RateLimitSnapshot::unknown`, logged, and left for the
    /// next beat to retry (spec.md §4.3, §4.7).
    async fn probe(&self, now_ms: i64) -> RateLimitSnapshot;
}

#[derive(Debug, Deserialize)]
struct CacheFile {
    tier: Option<String>,
    #[serde(default)]
    used: u64,
    #[serde(default)]
    limit: u64,
    #[serde(default)]
    percent: f64,
    #[serde(default)]
    is_limited: bool,
    reset_at_ms: Option<i64>,
}

/// Reads `~/.config/<agent>/rate_limit.json` (or an explicit override path).
pub struct RealRateLimitProbe {
    cache_path: PathBuf,
}

impl RealRateLimitProbe {
    pub fn new(cache_path: PathBuf) -> Self {
        Self { cache_path }
    }

    /// Resolves the agent CLI's well-known cache location under the user's
    /// config directory, e.g. `~/.config/claude/rate_limit.json`.
    pub fn well_known(agent_config_dir_name: &str) -> Option<Self> {
        let base = dirs::config_dir()?;
        Some(Self::new(base.join(agent_config_dir_name).join("rate_limit.json")))
    }

    async fn read(&self) -> Result<RateLimitSnapshot, RateLimitProbeError> {
        if !self.cache_path.exists() {
            return Err(RateLimitProbeError::CacheMissing(self.cache_path.clone()));
        }
        let bytes = tokio::fs::read(&self.cache_path).await?;
        let raw: serde_json::Value = serde_json::from_slice(&bytes)?;
        let cache: CacheFile = serde_json::from_value(raw.clone())?;
        Ok(RateLimitSnapshot {
            tier: cache.tier.unwrap_or_else(|| "unknown".to_string()),
            used: cache.used,
            limit: cache.limit,
            percent: cache.percent,
            is_limited: cache.is_limited,
            reset_at_ms: cache.reset_at_ms,
            raw,
            updated_at_ms: 0, // overwritten by caller with its own clock
        })
    }
}

#[async_trait]
impl RateLimitProbe for RealRateLimitProbe {
    async fn probe(&self, now_ms: i64) -> RateLimitSnapshot {
        match self.read().await {
            Ok(mut snapshot) => {
                snapshot.updated_at_ms = now_ms;
                snapshot
            }
            Err(e) => {
                tracing::warn!(error = %e, path = %self.cache_path.display(), "rate-limit probe failed");
                RateLimitSnapshot::unknown(now_ms)
            }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeRateLimitProbe;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;

    /// Returns a fixed, caller-configured snapshot on every probe.
    pub struct FakeRateLimitProbe {
        snapshot: Mutex<RateLimitSnapshot>,
    }

    impl FakeRateLimitProbe {
        pub fn new(snapshot: RateLimitSnapshot) -> Self {
            Self { snapshot: Mutex::new(snapshot) }
        }

        pub fn set(&self, snapshot: RateLimitSnapshot) {
            *self.snapshot.lock() = snapshot;
        }
    }

    #[async_trait]
    impl RateLimitProbe for FakeRateLimitProbe {
        async fn probe(&self, now_ms: i64) -> RateLimitSnapshot {
            let mut snapshot = self.snapshot.lock().clone();
            snapshot.updated_at_ms = now_ms;
            snapshot
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_cache_file_falls_back_to_unknown() {
        let probe = RealRateLimitProbe::new(PathBuf::from("/nonexistent/rate_limit.json"));
        let snapshot = probe.probe(42).await;
        assert_eq!(snapshot.tier, "unknown");
        assert!(!snapshot.is_limited);
        assert_eq!(snapshot.updated_at_ms, 42);
    }

    #[tokio::test]
    async fn reads_and_stamps_a_real_cache_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rate_limit.json");
        tokio::fs::write(
            &path,
            r#"{"tier":"pro","used":10,"limit":100,"percent":0.1,"is_limited":false}"#,
        )
        .await
        .unwrap();

        let probe = RealRateLimitProbe::new(path);
        let snapshot = probe.probe(99).await;
        assert_eq!(snapshot.tier, "pro");
        assert_eq!(snapshot.used, 10);
        assert_eq!(snapshot.updated_at_ms, 99);
    }
}
