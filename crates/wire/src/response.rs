// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};

use crate::types::{JobStatusView, JobSummary, ServerView};

/// A response sent from the daemon back to `stratum` (the CLI).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    Pong,
    Ack,
    JobSubmitted { id: String },
    JobStatus { status: JobStatusView },
    Jobs { jobs: Vec<JobSummary> },
    Servers { servers: Vec<ServerView> },
    Error { message: String },
}
