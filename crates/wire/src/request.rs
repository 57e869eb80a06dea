// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};

use crate::types::JobSubmission;

/// A request sent from `stratum` (the CLI) to the daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    SubmitJob { submission: JobSubmission },
    JobStatus { id: String },
    ListJobs,
    RetryJob { id: String },
    AbortJob { id: String },
    PauseJob { id: String },
    ResumeJob { id: String },
    ServerStatus,
    Ping,
}
