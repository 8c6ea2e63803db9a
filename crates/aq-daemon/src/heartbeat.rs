// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Heartbeat: a fixed-cadence driver that calls the Scheduler's phases
//! one at a time (spec.md §4.3). It owns the beat counter and the
//! RateLimitProbe; the Scheduler itself knows nothing about cadence.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use aq_adapters::RateLimitProbe;
use aq_bus::EventBus;
use aq_core::{Clock, EventKind};
use aq_scheduler::Scheduler;
use aq_store::Store;
use serde_json::json;
use tokio_util::sync::CancellationToken;

/// The diagnostic payload for one beat, returned to both the periodic loop
/// (for logging) and a manual trigger (for synchronous HTTP/CLI feedback).
#[derive(Debug, Clone, serde::Serialize)]
pub struct BeatReport {
    pub beat: u64,
    pub phase: &'static str,
    pub rate_limited: bool,
    pub diagnostics: serde_json::Value,
}

pub struct Heartbeat<C: Clock> {
    scheduler: Arc<Scheduler<C>>,
    store: Store,
    bus: Arc<EventBus>,
    rate_limit: Arc<dyn RateLimitProbe>,
    clock: C,
    beat: AtomicU64,
    interval: Duration,
}

impl<C: Clock> Heartbeat<C> {
    pub fn new(
        scheduler: Arc<Scheduler<C>>,
        store: Store,
        bus: Arc<EventBus>,
        rate_limit: Arc<dyn RateLimitProbe>,
        clock: C,
        interval: Duration,
    ) -> Self {
        Self { scheduler, store, bus, rate_limit, clock, beat: AtomicU64::new(0), interval }
    }

    /// Run the periodic loop until `cancel` fires. Never returns an error —
    /// every fallible step inside a beat is caught and logged, per spec.md
    /// §4.3 and §7's propagation policy.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("heartbeat loop cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    self.run_one_beat().await;
                }
            }
        }
    }

    /// Run exactly one beat synchronously. Used by both the periodic loop
    /// and the manual-trigger HTTP/CLI entry point (spec.md §4.3).
    pub async fn run_one_beat(&self) -> BeatReport {
        let beat = self.beat.fetch_add(1, Ordering::SeqCst) + 1;
        let now_ms = self.clock.epoch_ms();

        let snapshot = self.rate_limit.probe(now_ms).await;
        if let Err(e) = self.store.set_rate_limit(&snapshot).await {
            self.emit_error(beat, "probe", &aq_scheduler::SchedulerError::from(e)).await;
        }

        let phase = if beat % 2 == 1 { "assess" } else { "execute" };
        let diagnostics = json!({ "rate_limit": snapshot });

        self.publish(EventKind::HeartbeatTick { beat, phase, payload: diagnostics.clone() }, beat)
            .await;

        if snapshot.is_limited {
            self.publish(EventKind::HeartbeatRateLimited { reset_at_ms: snapshot.reset_at_ms }, beat)
                .await;
            return BeatReport { beat, phase, rate_limited: true, diagnostics };
        }

        if beat % 2 == 1 {
            match self.scheduler.dedupe_tasks().await {
                Ok(removed) => tracing::info!(beat, phase, removed = removed.len(), "dedupe_tasks"),
                Err(e) => self.emit_error(beat, "dedupe", &e).await,
            }
            match self.scheduler.assess_batch().await {
                Ok(assessed) => {
                    tracing::info!(beat, phase, assessed = assessed.len(), "assess_batch")
                }
                Err(e) => self.emit_error(beat, "assess", &e).await,
            }
        } else {
            match self.scheduler.execute_next_tasks().await {
                Ok(started) => {
                    tracing::info!(beat, phase, started = started.len(), "execute_next_tasks")
                }
                Err(e) => self.emit_error(beat, "execute", &e).await,
            }
        }

        if beat % 10 == 0 {
            match self.scheduler.cleanup_stale_worktrees().await {
                Ok(removed) => tracing::info!(beat, removed, "cleanup_stale_worktrees"),
                Err(e) => self.emit_error(beat, "gc", &e).await,
            }
        }

        BeatReport { beat, phase, rate_limited: false, diagnostics }
    }

    async fn emit_error(&self, beat: u64, phase: &'static str, error: &aq_scheduler::SchedulerError) {
        let kind = crate::error::classify(error);
        let message = error.to_string();
        tracing::error!(beat, phase, kind = kind.as_str(), %message, "heartbeat phase failed");
        self.publish(EventKind::HeartbeatError { phase, message }, beat).await;
    }

    async fn publish(&self, kind: EventKind, beat: u64) {
        let event = kind.into_event("heartbeat", &beat.to_string(), self.clock.epoch_ms());
        if let Err(e) = self.bus.publish(event).await {
            tracing::error!(beat, error = %e, "failed to publish heartbeat event");
        }
    }
}
