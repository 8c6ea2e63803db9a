// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! aq-daemon: process wiring for the agent-queue orchestration daemon.
//! Owns startup (Store -> EventBus -> adapters -> Scheduler -> Heartbeat,
//! per spec.md §9 "Global singletons"), the Heartbeat loop, the Orchestrator
//! that drains session terminations, and the ambient HTTP façade.

pub mod config;
pub mod error;
pub mod heartbeat;
pub mod http;
pub mod logging;
pub mod orchestrator;

use std::sync::Arc;

use aq_adapters::{RateLimitProbe, RealAgentAdapter, RealAssessmentEngine, RealRateLimitProbe, RealVcsAdapter};
use aq_bus::EventBus;
use aq_core::SystemClock;
use aq_scheduler::{Scheduler, SchedulerConfig};
use aq_store::Store;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use config::Config;
pub use heartbeat::{BeatReport, Heartbeat};
pub use orchestrator::Orchestrator;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to create directory {0}: {1}")]
    CreateDir(std::path::PathBuf, std::io::Error),
    #[error(transparent)]
    Store(#[from] aq_store::StoreError),
}

/// Everything the `aqd` binary needs once startup has finished: the pieces
/// it hands to `tokio::spawn` plus the router it serves.
pub struct Daemon {
    pub heartbeat: Arc<Heartbeat<SystemClock>>,
    pub orchestrator: Orchestrator<SystemClock>,
    pub termination_rx: tokio::sync::mpsc::Receiver<aq_adapters::SessionTermination>,
    pub router: axum::Router,
}

/// Assemble the daemon's dependency graph. Initialization order is
/// Store -> EventBus -> adapters -> Scheduler -> Heartbeat, per spec.md §9;
/// teardown (handled by `main`'s shutdown signal) reverses it.
pub async fn startup(config: &Config) -> Result<Daemon, StartupError> {
    std::fs::create_dir_all(&config.data_dir)
        .map_err(|e| StartupError::CreateDir(config.data_dir.clone(), e))?;
    std::fs::create_dir_all(&config.worktrees_dir)
        .map_err(|e| StartupError::CreateDir(config.worktrees_dir.clone(), e))?;
    std::fs::create_dir_all(config.sessions_dir())
        .map_err(|e| StartupError::CreateDir(config.sessions_dir(), e))?;

    let store = Store::open(config.db_path()).await?;
    let bus = Arc::new(EventBus::new(Arc::new(store.clone())));

    let assessment = Arc::new(RealAssessmentEngine::new(
        config.assessment_api_base.clone(),
        config.assessment_api_key.clone(),
        config.assessment_model.clone(),
    ));
    let vcs = Arc::new(RealVcsAdapter::new());
    let agent = Arc::new(RealAgentAdapter::new(config.agent_command.clone()));
    let rate_limit: Arc<dyn RateLimitProbe> = Arc::new(
        RealRateLimitProbe::well_known(&config.agent_command)
            .unwrap_or_else(|| RealRateLimitProbe::new(config.data_dir.join("rate_limit.json"))),
    );

    let scheduler_config = SchedulerConfig {
        worktrees_dir: config.worktrees_dir.clone(),
        sessions_dir: config.sessions_dir(),
        max_retries: config.max_retries,
        assess_batch_size: config.assess_batch_size,
        max_concurrent_tasks: config.max_concurrent_tasks,
    };
    let (scheduler, termination_rx) = Scheduler::new(
        store.clone(),
        bus.clone(),
        assessment,
        vcs,
        agent,
        SystemClock,
        scheduler_config,
    );
    let scheduler = Arc::new(scheduler);

    let heartbeat = Arc::new(Heartbeat::new(
        scheduler.clone(),
        store.clone(),
        bus.clone(),
        rate_limit,
        SystemClock,
        std::time::Duration::from_secs(config.heartbeat_interval_seconds),
    ));
    let router = http::HttpFacade::new(store, bus, heartbeat.clone(), scheduler.clone()).router();
    let orchestrator = Orchestrator::new(scheduler);

    Ok(Daemon { heartbeat, orchestrator, termination_rx, router })
}

/// Spawn the Heartbeat loop and the Orchestrator as background tasks,
/// both cancelled together through `cancel`.
pub fn spawn_background_tasks(
    daemon: Daemon,
    cancel: CancellationToken,
) -> (JoinHandle<()>, JoinHandle<()>, axum::Router) {
    let heartbeat_handle = tokio::spawn(daemon.heartbeat.run(cancel.clone()));
    let orchestrator_handle =
        tokio::spawn(daemon.orchestrator.run(daemon.termination_rx, cancel));
    (heartbeat_handle, orchestrator_handle, daemon.router)
}
