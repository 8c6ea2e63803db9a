// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Calls out to an LLM to classify a submitted task's complexity, recommend
//! a model tier, and optionally propose a decomposition into independent
//! subtasks before any agent session is launched (spec.md §4.1, §4.4).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssessmentError {
    #[error("assessment request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("assessment endpoint returned an unparseable response: {0}")]
    Malformed(String),
}

/// Complexity tiers a task can be classified into, per spec.md §3's
/// `{simple, medium, complex}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Medium => "medium",
            Self::Complex => "complex",
        }
    }
}

/// One child task the engine proposes when it recommends decomposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedSubtask {
    pub title: String,
    pub description: String,
}

/// The engine's verdict on one task description, matching the contract in
/// spec.md §4.4: `{complexity, recommended_model, should_decompose,
/// subtasks[], comment?, reasoning}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub complexity: Complexity,
    pub recommended_model: String,
    #[serde(default)]
    pub should_decompose: bool,
    #[serde(default)]
    pub subtasks: Vec<ProposedSubtask>,
    /// Surfaced as a Comment on the task when present.
    #[serde(default)]
    pub comment: Option<String>,
    /// One-line rationale, folded into `TaskAssessed`'s event payload for
    /// operator review — never shown to the agent CLI itself.
    pub reasoning: String,
}

#[async_trait]
pub trait AssessmentEngine: Send + Sync {
    /// `parent_context` carries the parent task's title/description when
    /// assessing a child produced by an earlier decomposition, per
    /// spec.md §4.4's "Input is {title, description, parent context if
    /// any}" — `None` for top-level submissions.
    async fn assess(
        &self,
        task_title: &str,
        task_body: &str,
        parent_context: Option<(&str, &str)>,
    ) -> Result<Assessment, AssessmentError>;
}

const SYSTEM_PROMPT: &str = "You classify incoming coding tasks by complexity, \
recommend which model tier should execute them, and decide whether the task \
should be split into independent subtasks. Respond only with the requested \
JSON object. Recommend decomposition only when the pieces are clearly \
independent multi-session work, not merely large.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    content: Vec<ChatBlock>,
}

#[derive(Deserialize)]
struct ChatBlock {
    text: String,
}

/// assess() must return well before the Heartbeat's own cadence; a hung
/// endpoint would otherwise stall the whole assess phase indefinitely
/// (spec.md §5).
const ASSESSMENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Calls a Claude-compatible messages endpoint and parses its reply as
/// an [`Assessment`]. Temperature is pinned near zero per spec.md §4.4's
/// "deterministic temperature (≈0)"; the model used is the fixed
/// `ASSESSMENT_MODEL` configured at startup, never the task's own
/// `recommended_model` hint.
pub struct RealAssessmentEngine {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl RealAssessmentEngine {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(ASSESSMENT_TIMEOUT)
                .build()
                .expect("reqwest client"),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl AssessmentEngine for RealAssessmentEngine {
    async fn assess(
        &self,
        task_title: &str,
        task_body: &str,
        parent_context: Option<(&str, &str)>,
    ) -> Result<Assessment, AssessmentError> {
        let parent_block = match parent_context {
            Some((parent_title, parent_body)) => {
                format!("\nParent task title: {parent_title}\nParent task body: {parent_body}\n")
            }
            None => String::new(),
        };
        let user_content = format!(
            "Task title: {task_title}\nTask body: {task_body}\n{parent_block}\n\
             Respond with a JSON object: {{\"complexity\": \"simple\"|\"medium\"|\"complex\", \
             \"recommended_model\": string, \"should_decompose\": bool, \
             \"subtasks\": [{{\"title\": string, \"description\": string}}], \
             \"comment\": string|null, \"reasoning\": string}}"
        );
        let request = ChatRequest {
            model: &self.model,
            system: SYSTEM_PROMPT,
            messages: vec![ChatMessage { role: "user", content: user_content }],
            max_tokens: 1024,
            temperature: 0.0,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<ChatResponse>()
            .await?;

        let text = response
            .content
            .first()
            .map(|b| b.text.as_str())
            .ok_or_else(|| AssessmentError::Malformed("empty response content".to_string()))?;

        // A parse failure is an error per spec.md §4.4, never coerced to a
        // "medium" default.
        serde_json::from_str(text).map_err(|e| AssessmentError::Malformed(e.to_string()))
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeAssessmentEngine;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;

    /// Returns a fixed, caller-configured assessment. Defaults to `Simple`
    /// with `should_decompose: false` so tests that don't care about
    /// classification still exercise the plain execute path.
    pub struct FakeAssessmentEngine {
        assessment: Mutex<Assessment>,
        calls: Mutex<Vec<(String, String)>>,
        fail_next: Mutex<bool>,
    }

    impl Default for FakeAssessmentEngine {
        fn default() -> Self {
            Self {
                assessment: Mutex::new(Assessment {
                    complexity: Complexity::Simple,
                    recommended_model: "sonnet".to_string(),
                    should_decompose: false,
                    subtasks: Vec::new(),
                    comment: None,
                    reasoning: "fake default".to_string(),
                }),
                calls: Mutex::new(Vec::new()),
                fail_next: Mutex::new(false),
            }
        }
    }

    impl FakeAssessmentEngine {
        pub fn with_assessment(assessment: Assessment) -> Self {
            Self { assessment: Mutex::new(assessment), calls: Mutex::new(Vec::new()), fail_next: Mutex::new(false) }
        }

        pub fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().clone()
        }

        /// The next `assess` call returns `AssessmentError::Malformed`
        /// instead of the configured assessment, for exercising the
        /// Scheduler's retry-on-failure path.
        pub fn fail_next_call(&self) {
            *self.fail_next.lock() = true;
        }
    }

    #[async_trait]
    impl AssessmentEngine for FakeAssessmentEngine {
        async fn assess(
            &self,
            task_title: &str,
            task_body: &str,
            _parent_context: Option<(&str, &str)>,
        ) -> Result<Assessment, AssessmentError> {
            self.calls.lock().push((task_title.to_string(), task_body.to_string()));
            if std::mem::take(&mut *self.fail_next.lock()) {
                return Err(AssessmentError::Malformed("forced failure for test".to_string()));
            }
            Ok(self.assessment.lock().clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_engine_records_calls_and_returns_default_assessment() {
        let engine = FakeAssessmentEngine::default();
        let assessment = engine.assess("Fix typo", "Correct README spelling", None).await.unwrap();
        assert_eq!(assessment.complexity, Complexity::Simple);
        assert!(!assessment.should_decompose);
        assert_eq!(engine.calls().len(), 1);
    }

    #[tokio::test]
    async fn fake_engine_honors_configured_override() {
        let engine = FakeAssessmentEngine::with_assessment(Assessment {
            complexity: Complexity::Complex,
            recommended_model: "opus".to_string(),
            should_decompose: true,
            subtasks: vec![
                ProposedSubtask { title: "A".to_string(), description: "do A".to_string() },
                ProposedSubtask { title: "B".to_string(), description: "do B".to_string() },
            ],
            comment: Some("touches auth and billing".to_string()),
            reasoning: "touches auth and billing".to_string(),
        });
        let assessment = engine.assess("Rework billing", "...", None).await.unwrap();
        assert_eq!(assessment.complexity, Complexity::Complex);
        assert_eq!(assessment.recommended_model, "opus");
        assert_eq!(assessment.subtasks.len(), 2);
    }

    #[tokio::test]
    async fn fake_engine_can_be_scripted_to_fail() {
        let engine = FakeAssessmentEngine::default();
        engine.fail_next_call();
        let result = engine.assess("Fix typo", "...", None).await;
        assert!(matches!(result, Err(AssessmentError::Malformed(_))));
        // The next call reverts to the configured assessment.
        assert!(engine.assess("Fix typo", "...", None).await.is_ok());
    }
}
