// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Orchestrator: drains the `mpsc::Receiver<SessionTermination>` the
//! Scheduler hands back from [`aq_scheduler::Scheduler::new`] and feeds each
//! report into `on_session_terminated`. Kept separate from the Heartbeat
//! because session termination is event-driven and may interleave with
//! beats at any time (spec.md §5's ordering guarantees).

use std::sync::Arc;

use aq_adapters::SessionTermination;
use aq_core::Clock;
use aq_scheduler::Scheduler;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub struct Orchestrator<C: Clock> {
    scheduler: Arc<Scheduler<C>>,
}

impl<C: Clock> Orchestrator<C> {
    pub fn new(scheduler: Arc<Scheduler<C>>) -> Self {
        Self { scheduler }
    }

    /// Drain `rx` until it closes or `cancel` fires.
    pub async fn run(self, mut rx: mpsc::Receiver<SessionTermination>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("orchestrator cancelled");
                    break;
                }
                received = rx.recv() => {
                    match received {
                        Some(termination) => self.handle(termination).await,
                        None => {
                            tracing::warn!("session termination channel closed");
                            break;
                        }
                    }
                }
            }
        }
    }

    async fn handle(&self, termination: SessionTermination) {
        let session_id = termination.session_id.clone();
        if let Err(e) = self.scheduler.on_session_terminated(termination).await {
            tracing::error!(session_id = %session_id, error = %e, "failed to finalize terminated session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aq_adapters::{FakeAgentAdapter, FakeAssessmentEngine, FakeVcsAdapter};
    use aq_bus::fake::bus_with_fake_sink;
    use aq_core::{FakeClock, Session, SessionStatus};
    use aq_scheduler::SchedulerConfig;
    use aq_store::Store;
    use tempfile::TempDir;

    #[tokio::test]
    async fn closing_the_channel_ends_the_loop() {
        let store = Store::open_in_memory().await.unwrap();
        let (bus, _sink) = bus_with_fake_sink();
        let bus = Arc::new(bus);
        let tmp = TempDir::new().unwrap();
        let config = SchedulerConfig {
            worktrees_dir: tmp.path().join("worktrees"),
            sessions_dir: tmp.path().join("sessions"),
            ..SchedulerConfig::default()
        };
        let (scheduler, _rx) = Scheduler::new(
            store,
            bus,
            Arc::new(FakeAssessmentEngine::default()),
            Arc::new(FakeVcsAdapter::default()),
            Arc::new(FakeAgentAdapter::default()),
            FakeClock::new(),
            config,
        );
        let orchestrator = Orchestrator::new(Arc::new(scheduler));
        let (tx, rx) = mpsc::channel(1);
        drop(tx);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(orchestrator.run(rx, cancel));
        handle.await.unwrap();
    }

    /// A missing session/task is handled silently by the Scheduler
    /// (logged and dropped), never surfaced as an orchestrator panic.
    #[tokio::test]
    async fn unknown_session_does_not_panic_the_loop() {
        let store = Store::open_in_memory().await.unwrap();
        let (bus, _sink) = bus_with_fake_sink();
        let bus = Arc::new(bus);
        let tmp = TempDir::new().unwrap();
        let config = SchedulerConfig {
            worktrees_dir: tmp.path().join("worktrees"),
            sessions_dir: tmp.path().join("sessions"),
            ..SchedulerConfig::default()
        };
        let (scheduler, rx) = Scheduler::new(
            store,
            bus,
            Arc::new(FakeAssessmentEngine::default()),
            Arc::new(FakeVcsAdapter::default()),
            Arc::new(FakeAgentAdapter::default()),
            FakeClock::new(),
            config,
        );
        let orchestrator = Orchestrator::new(Arc::new(scheduler));
        let session = Session::builder().status(SessionStatus::Running).build();
        orchestrator
            .handle(SessionTermination {
                session_id: session.id.clone(),
                exit_code: Some(0),
                stdout_path: "stdout.log".into(),
                stderr_path: "stderr.log".into(),
            })
            .await;
    }
}
