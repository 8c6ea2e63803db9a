// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::row::rate_limit_from_row;
use crate::{Store, StoreError};
use aq_core::RateLimitSnapshot;
use sqlx::Row;

impl Store {
    /// Overwrite the singleton rate-limit row. Every `RateLimitProbe` read
    /// is cached here wholesale (spec.md §4.7) — there is no history.
    pub async fn set_rate_limit(&self, snapshot: &RateLimitSnapshot) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO rate_limits (id, tier, used, limit_value, percent, is_limited, reset_at_ms, raw, updated_at_ms)
             VALUES (0, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                tier = excluded.tier,
                used = excluded.used,
                limit_value = excluded.limit_value,
                percent = excluded.percent,
                is_limited = excluded.is_limited,
                reset_at_ms = excluded.reset_at_ms,
                raw = excluded.raw,
                updated_at_ms = excluded.updated_at_ms",
        )
        .bind(&snapshot.tier)
        .bind(snapshot.used as i64)
        .bind(snapshot.limit as i64)
        .bind(snapshot.percent)
        .bind(snapshot.is_limited)
        .bind(snapshot.reset_at_ms)
        .bind(serde_json::to_string(&snapshot.raw).unwrap_or_else(|_| "null".into()))
        .bind(snapshot.updated_at_ms)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn get_rate_limit(&self) -> Result<Option<RateLimitSnapshot>, StoreError> {
        let row = sqlx::query("SELECT * FROM rate_limits WHERE id = 0")
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(rate_limit_from_row).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn absent_until_first_probe() {
        let store = Store::open_in_memory().await.unwrap();
        assert!(store.get_rate_limit().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn later_writes_overwrite_the_singleton_row() {
        let store = Store::open_in_memory().await.unwrap();
        store.set_rate_limit(&RateLimitSnapshot::unknown(0)).await.unwrap();
        let mut limited = RateLimitSnapshot::unknown(10);
        limited.is_limited = true;
        limited.tier = "pro".to_string();
        store.set_rate_limit(&limited).await.unwrap();

        let fetched = store.get_rate_limit().await.unwrap().unwrap();
        assert!(fetched.is_limited);
        assert_eq!(fetched.tier, "pro");
    }
}
