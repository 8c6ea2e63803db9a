// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: a `config.toml` file layered under environment
//! variable overrides (spec.md §6). Parsed and validated once at startup —
//! a missing assessment API key is a hard startup error, never a lazily
//! discovered one.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

const DEFAULT_MAX_CONCURRENT_TASKS: i64 = 2;
const DEFAULT_HEARTBEAT_INTERVAL_SECONDS: u64 = 60;
const DEFAULT_ASSESS_BATCH_SIZE: i64 = 10;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 4173;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("could not parse config file {0}: {1}")]
    Parse(PathBuf, toml::de::Error),
    #[error("{0} must be a valid integer, got {1:?}")]
    InvalidInt(&'static str, String),
    #[error(
        "no assessment API key configured: set AQ_ASSESSMENT_API_KEY or assessment_api_key in config.toml"
    )]
    MissingApiKey,
}

/// The shape of `config.toml`. Every field is optional here; defaults and
/// environment overrides are resolved in [`Config::load`].
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    data_dir: Option<PathBuf>,
    worktrees_dir: Option<PathBuf>,
    max_concurrent_tasks: Option<i64>,
    heartbeat_interval_seconds: Option<u64>,
    assess_batch_size: Option<i64>,
    max_retries: Option<u32>,
    assessment_model: Option<String>,
    assessment_api_base: Option<String>,
    assessment_api_key: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    log_dir: Option<PathBuf>,
    agent_command: Option<String>,
}

/// Fully resolved daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub worktrees_dir: PathBuf,
    pub max_concurrent_tasks: i64,
    pub heartbeat_interval_seconds: u64,
    pub assess_batch_size: i64,
    pub max_retries: u32,
    pub assessment_model: String,
    pub assessment_api_base: String,
    pub assessment_api_key: String,
    pub host: String,
    pub port: u16,
    pub log_dir: Option<PathBuf>,
    pub agent_command: String,
}

impl Config {
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("queue.db")
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.data_dir.join("sessions")
    }

    /// Load configuration from `path` (if it exists) and environment
    /// variables, falling back to documented defaults (spec.md §6).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
            toml::from_str(&raw).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?
        } else {
            FileConfig::default()
        };

        let data_dir = env_path("AQ_DATA_DIR").or(file.data_dir).unwrap_or_else(|| PathBuf::from("data"));
        let worktrees_dir = env_path("AQ_WORKTREES_DIR").or(file.worktrees_dir).unwrap_or_else(|| {
            dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join("agent-queue-worktrees")
        });

        let max_concurrent_tasks = env_int("AQ_MAX_CONCURRENT_TASKS")?
            .or(file.max_concurrent_tasks)
            .unwrap_or(DEFAULT_MAX_CONCURRENT_TASKS);
        let heartbeat_interval_seconds = env_u64("AQ_HEARTBEAT_INTERVAL_SECONDS")?
            .or(file.heartbeat_interval_seconds)
            .unwrap_or(DEFAULT_HEARTBEAT_INTERVAL_SECONDS);
        let assess_batch_size = file.assess_batch_size.unwrap_or(DEFAULT_ASSESS_BATCH_SIZE);
        let max_retries = file.max_retries.unwrap_or(DEFAULT_MAX_RETRIES);

        let assessment_model = std::env::var("AQ_ASSESSMENT_MODEL")
            .ok()
            .or(file.assessment_model)
            .unwrap_or_else(|| "assessment-default".to_string());
        let assessment_api_base = file
            .assessment_api_base
            .unwrap_or_else(|| "https://api.anthropic.com/v1/messages".to_string());
        let assessment_api_key = std::env::var("AQ_ASSESSMENT_API_KEY")
            .ok()
            .filter(|s| !s.is_empty())
            .or(file.assessment_api_key)
            .ok_or(ConfigError::MissingApiKey)?;

        let host = std::env::var("AQ_HOST").ok().or(file.host).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = env_u16("AQ_PORT")?.or(file.port).unwrap_or(DEFAULT_PORT);
        let agent_command = file.agent_command.unwrap_or_else(|| "claude".to_string());

        Ok(Self {
            data_dir,
            worktrees_dir,
            max_concurrent_tasks,
            heartbeat_interval_seconds,
            assess_batch_size,
            max_retries,
            assessment_model,
            assessment_api_base,
            assessment_api_key,
            host,
            port,
            log_dir: file.log_dir,
            agent_command,
        })
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key).ok().map(PathBuf::from)
}

fn env_int(key: &str) -> Result<Option<i64>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.parse::<i64>().map(Some).map_err(|_| ConfigError::InvalidInt(key_leak(key), raw)),
        Err(_) => Ok(None),
    }
}

fn env_u64(key: &str) -> Result<Option<u64>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.parse::<u64>().map(Some).map_err(|_| ConfigError::InvalidInt(key_leak(key), raw)),
        Err(_) => Ok(None),
    }
}

fn env_u16(key: &str) -> Result<Option<u16>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.parse::<u16>().map(Some).map_err(|_| ConfigError::InvalidInt(key_leak(key), raw)),
        Err(_) => Ok(None),
    }
}

/// The env var names passed in are always `'static` string literals from
/// this module; this just recovers that fact for the error type.
fn key_leak(key: &str) -> &'static str {
    match key {
        "AQ_MAX_CONCURRENT_TASKS" => "AQ_MAX_CONCURRENT_TASKS",
        "AQ_HEARTBEAT_INTERVAL_SECONDS" => "AQ_HEARTBEAT_INTERVAL_SECONDS",
        "AQ_PORT" => "AQ_PORT",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "AQ_DATA_DIR",
            "AQ_WORKTREES_DIR",
            "AQ_MAX_CONCURRENT_TASKS",
            "AQ_HEARTBEAT_INTERVAL_SECONDS",
            "AQ_ASSESSMENT_MODEL",
            "AQ_HOST",
            "AQ_PORT",
            "AQ_ASSESSMENT_API_KEY",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn missing_api_key_is_a_hard_error() {
        clear_env();
        let err = Config::load(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey));
    }

    #[test]
    #[serial]
    fn env_var_supplies_the_required_api_key_and_defaults_apply() {
        clear_env();
        std::env::set_var("AQ_ASSESSMENT_API_KEY", "sk-test");
        let config = Config::load(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.assessment_api_key, "sk-test");
        assert_eq!(config.max_concurrent_tasks, DEFAULT_MAX_CONCURRENT_TASKS);
        assert_eq!(config.heartbeat_interval_seconds, DEFAULT_HEARTBEAT_INTERVAL_SECONDS);
        assert_eq!(config.port, DEFAULT_PORT);
        clear_env();
    }

    #[test]
    #[serial]
    fn env_override_wins_over_file_value() {
        clear_env();
        std::env::set_var("AQ_ASSESSMENT_API_KEY", "sk-test");
        std::env::set_var("AQ_MAX_CONCURRENT_TASKS", "7");
        let config = Config::load(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.max_concurrent_tasks, 7);
        clear_env();
    }

    #[test]
    #[serial]
    fn malformed_int_env_var_is_reported() {
        clear_env();
        std::env::set_var("AQ_ASSESSMENT_API_KEY", "sk-test");
        std::env::set_var("AQ_PORT", "not-a-port");
        let err = Config::load(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidInt("AQ_PORT", _)));
        clear_env();
    }
}
