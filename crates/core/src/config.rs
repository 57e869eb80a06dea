// SPDX-License-Identifier: MIT

//! Process-wide `Config` singleton (§3.1, §4.8, §10.3): worker-pool limits,
//! timeouts, and the `inline_mode` flag, loaded from TOML with environment
//! overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors loading or validating a [`Config`] (§7 `ValidationError`).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, #[source] source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse { path: String, #[source] source: toml::de::Error },
    #[error("invalid environment override {var}={value}: {reason}")]
    InvalidEnv { var: &'static str, value: String, reason: String },
}

/// §3.1 `Config` / §4.8: limits and timeouts shared by every server in a
/// cluster. Read on daemon startup and reloaded every N heartbeats (§4.7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub max_worker_threads: u32,
    pub heartbeat_seconds: u64,
    pub max_poll_seconds: u64,
    pub re_check_seconds: u64,
    /// Bypass the dispatcher and drive jobs to completion synchronously in
    /// the calling process (§4.5 "Inline mode" glossary entry).
    pub inline_mode: bool,
    /// Heartbeats between config/pool-size reloads (§4.7 `adjustThreads`).
    pub reload_every_n_heartbeats: u32,
    /// Default `tracing` filter directive, overridable by `RUST_LOG`
    /// (§10.4 "Log level is configurable via `RUST_LOG` and via the
    /// Config's `logLevel`").
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_worker_threads: 10,
            heartbeat_seconds: 15,
            max_poll_seconds: 5,
            re_check_seconds: 30,
            inline_mode: false,
            reload_every_n_heartbeats: 4,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load from a TOML file, falling back to defaults for any field the
    /// file omits (§10.3). Missing file is not an error here; callers that
    /// require the file to exist should check it themselves.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;
        toml::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.display().to_string(), source })
    }

    /// Apply `STRATUM_*` environment-variable overrides on top of a loaded
    /// config, matching the precedence order documented in §10.3 (file,
    /// then environment).
    pub fn apply_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(v) = std::env::var("STRATUM_MAX_WORKER_THREADS") {
            self.max_worker_threads = parse_env("STRATUM_MAX_WORKER_THREADS", &v)?;
        }
        if let Ok(v) = std::env::var("STRATUM_HEARTBEAT_SECONDS") {
            self.heartbeat_seconds = parse_env("STRATUM_HEARTBEAT_SECONDS", &v)?;
        }
        if let Ok(v) = std::env::var("STRATUM_MAX_POLL_SECONDS") {
            self.max_poll_seconds = parse_env("STRATUM_MAX_POLL_SECONDS", &v)?;
        }
        if let Ok(v) = std::env::var("STRATUM_RE_CHECK_SECONDS") {
            self.re_check_seconds = parse_env("STRATUM_RE_CHECK_SECONDS", &v)?;
        }
        if let Ok(v) = std::env::var("STRATUM_LOG_LEVEL") {
            self.log_level = v;
        }
        if let Ok(v) = std::env::var("STRATUM_INLINE_MODE") {
            self.inline_mode = match v.as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(ConfigError::InvalidEnv {
                        var: "STRATUM_INLINE_MODE",
                        value: other.to_string(),
                        reason: "expected a boolean".to_string(),
                    })
                }
            };
        }
        Ok(self)
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnv {
        var,
        value: value.to_string(),
        reason: "expected a non-negative integer".to_string(),
    })
}

/// Production builder for [`Config`] (mirrors `JobConfigBuilder`'s
/// always-available, non-test-gated builder convention in `job.rs`).
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    max_worker_threads: u32,
    heartbeat_seconds: u64,
    max_poll_seconds: u64,
    re_check_seconds: u64,
    inline_mode: bool,
    reload_every_n_heartbeats: u32,
    log_level: String,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        let d = Config::default();
        Self {
            max_worker_threads: d.max_worker_threads,
            heartbeat_seconds: d.heartbeat_seconds,
            max_poll_seconds: d.max_poll_seconds,
            re_check_seconds: d.re_check_seconds,
            inline_mode: d.inline_mode,
            reload_every_n_heartbeats: d.reload_every_n_heartbeats,
            log_level: d.log_level,
        }
    }
}

impl ConfigBuilder {
    crate::setters! {
        into {
            log_level: String,
        }
        set {
            max_worker_threads: u32,
            heartbeat_seconds: u64,
            max_poll_seconds: u64,
            re_check_seconds: u64,
            inline_mode: bool,
            reload_every_n_heartbeats: u32,
        }
    }

    pub fn build(self) -> Config {
        Config {
            max_worker_threads: self.max_worker_threads,
            heartbeat_seconds: self.heartbeat_seconds,
            max_poll_seconds: self.max_poll_seconds,
            re_check_seconds: self.re_check_seconds,
            inline_mode: self.inline_mode,
            reload_every_n_heartbeats: self.reload_every_n_heartbeats,
            log_level: self.log_level,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
