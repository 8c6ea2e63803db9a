// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin HTTP client for `aqd`'s façade (spec.md §6, §4.9).
//!
//! `aq` never touches the Store, the EventBus, or an adapter directly — it
//! only ever talks to the daemon over the same REST+SSE surface the web UI
//! would use. Every method here maps 1:1 onto a route registered by
//! [`aq_daemon::http::HttpFacade`].

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use aq_core::{Session, SessionId, Task, TaskId};
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Resolves the daemon's base URL from `AQ_HOST`/`AQ_PORT`, matching the
/// env vars `aq-daemon::config::Config` reads at startup (spec.md §6),
/// falling back to the same defaults.
pub fn default_base_url() -> String {
    let host = std::env::var("AQ_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("AQ_PORT").unwrap_or_else(|_| "4173".to_string());
    format!("http://{host}:{port}")
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

pub struct DaemonClient {
    base_url: String,
    http: reqwest::Client,
}

impl DaemonClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client"),
        }
    }

    pub fn connect() -> Self {
        Self::new(default_base_url())
    }

    async fn error_for(resp: reqwest::Response) -> anyhow::Error {
        let status = resp.status();
        match resp.json::<ApiErrorBody>().await {
            Ok(body) => anyhow!("daemon returned {}: {}", status, body.message),
            Err(_) => anyhow!("daemon returned {}", status),
        }
    }

    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        let resp = self
            .http
            .get(format!("{}/tasks", self.base_url))
            .send()
            .await
            .context("requesting task list")?;
        if !resp.status().is_success() {
            return Err(Self::error_for(resp).await);
        }
        Ok(resp.json().await.context("decoding task list")?)
    }

    pub async fn create_task(&self, input: &CreateTaskInput<'_>) -> Result<Task> {
        let resp = self
            .http
            .post(format!("{}/tasks", self.base_url))
            .json(input)
            .send()
            .await
            .context("submitting task")?;
        if !resp.status().is_success() {
            return Err(Self::error_for(resp).await);
        }
        Ok(resp.json().await.context("decoding created task")?)
    }

    pub async fn patch_task_metadata(&self, id: &TaskId, metadata: Value) -> Result<()> {
        let resp = self
            .http
            .patch(format!("{}/tasks/{}", self.base_url, id.as_str()))
            .json(&serde_json::json!({ "metadata": metadata }))
            .send()
            .await
            .context("patching task metadata")?;
        if !resp.status().is_success() {
            return Err(Self::error_for(resp).await);
        }
        Ok(())
    }

    pub async fn cancel_task(&self, id: &TaskId) -> Result<()> {
        let resp = self
            .http
            .post(format!("{}/tasks/{}/cancel", self.base_url, id.as_str()))
            .send()
            .await
            .context("cancelling task")?;
        if !resp.status().is_success() {
            return Err(Self::error_for(resp).await);
        }
        Ok(())
    }

    pub async fn reorder_tasks(&self, positions: &[(TaskId, i64)]) -> Result<()> {
        let positions: Vec<(String, i64)> =
            positions.iter().map(|(id, pos)| (id.as_str().to_string(), *pos)).collect();
        let resp = self
            .http
            .post(format!("{}/tasks/reorder", self.base_url))
            .json(&serde_json::json!({ "positions": positions }))
            .send()
            .await
            .context("reordering tasks")?;
        if !resp.status().is_success() {
            return Err(Self::error_for(resp).await);
        }
        Ok(())
    }

    pub async fn set_task_status(&self, id: &TaskId, status: &str) -> Result<()> {
        let resp = self
            .http
            .post(format!("{}/tasks/{}/status", self.base_url, id.as_str()))
            .json(&serde_json::json!({ "status": status }))
            .send()
            .await
            .context("setting task status")?;
        if !resp.status().is_success() {
            return Err(Self::error_for(resp).await);
        }
        Ok(())
    }

    pub async fn get_session(&self, id: &SessionId) -> Result<Option<Session>> {
        let resp = self
            .http
            .get(format!("{}/sessions/{}", self.base_url, id.as_str()))
            .send()
            .await
            .context("requesting session")?;
        if !resp.status().is_success() {
            return Err(Self::error_for(resp).await);
        }
        Ok(resp.json().await.context("decoding session")?)
    }

    pub async fn system_status(&self) -> Result<Value> {
        let resp = self
            .http
            .get(format!("{}/status", self.base_url))
            .send()
            .await
            .context("requesting system status")?;
        if !resp.status().is_success() {
            return Err(Self::error_for(resp).await);
        }
        Ok(resp.json().await.context("decoding system status")?)
    }

    pub async fn trigger_heartbeat(&self) -> Result<Value> {
        let resp = self
            .http
            .post(format!("{}/heartbeat/trigger", self.base_url))
            .send()
            .await
            .context("triggering heartbeat")?;
        if !resp.status().is_success() {
            return Err(Self::error_for(resp).await);
        }
        Ok(resp.json().await.context("decoding heartbeat report")?)
    }

    /// Raw SSE byte stream for `/events` — callers decode frames themselves
    /// since the wire format is a thin, unstable convenience over the
    /// EventBus, not a contract this crate owns (spec.md §1 "out of scope").
    pub async fn event_stream(&self) -> Result<impl Stream<Item = reqwest::Result<bytes::Bytes>>> {
        let resp = self
            .http
            .get(format!("{}/events", self.base_url))
            .send()
            .await
            .context("opening event stream")?;
        if !resp.status().is_success() {
            return Err(Self::error_for(resp).await);
        }
        Ok(resp.bytes_stream())
    }

    /// Raw SSE byte stream of one session's captured stdout/stderr, tailed
    /// by the daemon (spec.md §6 "stream session output").
    pub async fn session_output_stream(
        &self,
        id: &SessionId,
    ) -> Result<impl Stream<Item = reqwest::Result<bytes::Bytes>>> {
        let resp = self
            .http
            .get(format!("{}/sessions/{}/output", self.base_url, id.as_str()))
            .send()
            .await
            .context("opening session output stream")?;
        if !resp.status().is_success() {
            return Err(Self::error_for(resp).await);
        }
        Ok(resp.bytes_stream())
    }
}

#[derive(Debug, Serialize)]
pub struct CreateTaskInput<'a> {
    pub project_id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub priority: i64,
    pub position: i64,
    pub parent_id: Option<&'a str>,
    pub metadata: Value,
}
