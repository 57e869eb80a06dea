// SPDX-License-Identifier: MIT

//! DTOs carried over the wire between `stratum` (CLI) and the daemon.
//!
//! These mirror the core domain types but are shaped for the IPC boundary:
//! plain `String` ids, no internal store handles.

use serde::{Deserialize, Serialize};
use stratum_core::{Job, JobState, JobStatus, Server, ServerState, SubState};

/// A job submission as carried over the wire (§4.4 `submit`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobSubmission {
    pub class_name: String,
    #[serde(default = "default_perform_method")]
    pub perform_method: String,
    #[serde(default)]
    pub arguments: Vec<serde_json::Value>,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub run_at_epoch_ms: Option<u64>,
    #[serde(default)]
    pub expires_at_epoch_ms: Option<u64>,
    #[serde(default)]
    pub collect_output: bool,
    #[serde(default)]
    pub destroy_on_complete: bool,
    #[serde(default)]
    pub repeatable: bool,
    #[serde(default)]
    pub group: Option<String>,
    /// Present only for sliced jobs; absent means a singleton job.
    #[serde(default)]
    pub sliced: Option<SlicedSubmission>,
}

fn default_perform_method() -> String {
    "perform".to_string()
}

fn default_priority() -> u8 {
    50
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlicedSubmission {
    #[serde(default)]
    pub compress: bool,
    #[serde(default)]
    pub encrypt: bool,
    #[serde(default = "default_slice_size")]
    pub slice_size: usize,
    #[serde(default)]
    pub max_active_workers: Option<u32>,
    #[serde(default)]
    pub collect_nil_output: bool,
}

fn default_slice_size() -> usize {
    100
}

/// One row of `job list` (§4.4 `list`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobSummary {
    pub id: String,
    pub class_name: String,
    pub state: JobState,
    pub sub_state: Option<SubState>,
    pub priority: u8,
    pub created_at_epoch_ms: u64,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.to_string(),
            class_name: job.class_name.clone(),
            state: job.state,
            sub_state: job.kind.sliced().and_then(|d| d.sub_state),
            priority: job.priority,
            created_at_epoch_ms: job.created_at_epoch_ms,
        }
    }
}

/// `stratum job status <id>` (§4.4 `status`).
pub type JobStatusView = JobStatus;

/// `stratum server status` (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerView {
    pub name: String,
    pub state: ServerState,
    pub max_threads: u32,
    pub active_threads: u32,
    pub started_at_epoch_ms: u64,
    pub heartbeat_age_seconds: u64,
}

impl ServerView {
    pub fn from_server(server: &Server, now_epoch_ms: u64) -> Self {
        Self {
            name: server.name.clone(),
            state: server.state,
            max_threads: server.max_threads,
            active_threads: server.heartbeat.active_threads,
            started_at_epoch_ms: server.started_at_epoch_ms,
            heartbeat_age_seconds: now_epoch_ms.saturating_sub(server.heartbeat.updated_at_epoch_ms) / 1000,
        }
    }
}
