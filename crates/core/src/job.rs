// SPDX-License-Identifier: MIT

//! Job identifier, job-level state machine, and the `Job` entity itself.
//!
//! A [`Job`] is either a [`JobKind::Singleton`] (one `perform` call) or a
//! [`JobKind::Sliced`] bulk job whose slices are tracked by the `stratum-storage`
//! crate. This module only owns the state machine and the fields common to
//! both kinds; slice bookkeeping lives in `stratum-storage`.

use crate::clock::Clock;
use serde::{Deserialize, Serialize};
use std::time::Duration;

crate::define_id! {
    /// Unique identifier for a job.
    pub struct JobId("job-");
}

/// Job-level lifecycle state (§3.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Paused,
    Failed,
    Aborted,
}

crate::simple_display! {
    JobState {
        Queued => "queued",
        Running => "running",
        Completed => "completed",
        Paused => "paused",
        Failed => "failed",
        Aborted => "aborted",
    }
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Aborted)
    }
}

/// Sliced-job execution phase within `running` (§4.4, §9 glossary `sub_state`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubState {
    Before,
    Processing,
    After,
}

crate::simple_display! {
    SubState {
        Before => "before",
        Processing => "processing",
        After => "after",
    }
}

/// Structured failure information recorded on a job or slice (§7).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exception {
    pub class: String,
    pub message: String,
    pub backtrace: Vec<String>,
    pub server_name: Option<String>,
}

impl Exception {
    pub fn new(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self { class: class.into(), message: message.into(), backtrace: Vec::new(), server_name: None }
    }

    pub fn with_server(mut self, server_name: impl Into<String>) -> Self {
        self.server_name = Some(server_name.into());
        self
    }

    pub fn with_backtrace(mut self, backtrace: Vec<String>) -> Self {
        self.backtrace = backtrace;
        self
    }
}

/// Error raised when a requested state transition is not legal from the
/// job's current state (§4.4 adjacency table). Carries enough context that
/// a caller can reload and re-evaluate rather than treat this as fatal.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("illegal job transition: {event} from {from}")]
pub struct IllegalTransition {
    pub event: &'static str,
    pub from: JobState,
}

/// Fields specific to a sliced job (§3.1 `SlicedJob`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlicedJobData {
    pub sub_state: Option<SubState>,
    pub compress: bool,
    pub encrypt: bool,
    pub slice_size: usize,
    pub record_count: u64,
    pub max_active_workers: Option<u32>,
    pub collect_nil_output: bool,
    /// Records that have left the input queue so far — completed or
    /// currently-failed, since a failed slice still left `queued` (§4.4
    /// status projection). Drives `percent_complete`/`records_per_hour`.
    pub processed_records: u64,
}

impl Default for SlicedJobData {
    fn default() -> Self {
        Self {
            sub_state: None,
            compress: false,
            encrypt: false,
            slice_size: 100,
            record_count: 0,
            max_active_workers: None,
            collect_nil_output: false,
            processed_records: 0,
        }
    }
}

/// Distinguishes a one-shot method call from a bulk, slice-partitioned job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum JobKind {
    Singleton,
    Sliced(SlicedJobData),
}

impl JobKind {
    pub fn is_sliced(&self) -> bool {
        matches!(self, JobKind::Sliced(_))
    }

    pub fn sliced(&self) -> Option<&SlicedJobData> {
        match self {
            JobKind::Sliced(d) => Some(d),
            JobKind::Singleton => None,
        }
    }

    pub fn sliced_mut(&mut self) -> Option<&mut SlicedJobData> {
        match self {
            JobKind::Sliced(d) => Some(d),
            JobKind::Singleton => None,
        }
    }
}

/// Configuration for creating a new job, built via the same
/// builder-macro convention used for other persisted entities.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub id: JobId,
    pub class_name: String,
    pub perform_method: String,
    pub arguments: Vec<serde_json::Value>,
    pub priority: u8,
    pub run_at_epoch_ms: Option<u64>,
    pub expires_at_epoch_ms: Option<u64>,
    pub kind: JobKind,
    pub collect_output: bool,
    pub destroy_on_complete: bool,
    pub repeatable: bool,
    pub group: Option<String>,
}

impl JobConfig {
    pub fn builder(class_name: impl Into<String>) -> JobConfigBuilder {
        JobConfigBuilder {
            id: JobId::new(),
            class_name: class_name.into(),
            perform_method: "perform".to_string(),
            arguments: Vec::new(),
            priority: 50,
            run_at_epoch_ms: None,
            expires_at_epoch_ms: None,
            kind: JobKind::Singleton,
            collect_output: false,
            destroy_on_complete: false,
            repeatable: true,
            group: None,
        }
    }
}

pub struct JobConfigBuilder {
    id: JobId,
    class_name: String,
    perform_method: String,
    arguments: Vec<serde_json::Value>,
    priority: u8,
    run_at_epoch_ms: Option<u64>,
    expires_at_epoch_ms: Option<u64>,
    kind: JobKind,
    collect_output: bool,
    destroy_on_complete: bool,
    repeatable: bool,
    group: Option<String>,
}

impl JobConfigBuilder {
    crate::setters! {
        into {
            perform_method: String,
            group: String,
        }
        set {
            arguments: Vec<serde_json::Value>,
            priority: u8,
            kind: JobKind,
            collect_output: bool,
            destroy_on_complete: bool,
            repeatable: bool,
        }
        option {
            run_at_epoch_ms: u64,
            expires_at_epoch_ms: u64,
        }
    }

    pub fn sliced(mut self, data: SlicedJobData) -> Self {
        self.kind = JobKind::Sliced(data);
        self
    }

    /// Validate range invariants (§7 `ValidationError`) and build.
    pub fn build(self) -> Result<JobConfig, ValidationError> {
        if !(1..=100).contains(&self.priority) {
            return Err(ValidationError::PriorityOutOfRange(self.priority));
        }
        Ok(JobConfig {
            id: self.id,
            class_name: self.class_name,
            perform_method: self.perform_method,
            arguments: self.arguments,
            priority: self.priority,
            run_at_epoch_ms: self.run_at_epoch_ms,
            expires_at_epoch_ms: self.expires_at_epoch_ms,
            kind: self.kind,
            collect_output: self.collect_output,
            destroy_on_complete: self.destroy_on_complete,
            repeatable: self.repeatable,
            group: self.group,
        })
    }
}

/// Configuration/field validation errors (§7 `ValidationError`).
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("priority {0} is out of range [1,100]")]
    PriorityOutOfRange(u8),
    #[error("percent_complete {0} is out of range [0,100]")]
    PercentCompleteOutOfRange(u8),
}

/// A job instance, singleton or sliced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub class_name: String,
    pub perform_method: String,
    pub arguments: Vec<serde_json::Value>,
    pub priority: u8,
    pub run_at_epoch_ms: Option<u64>,
    pub expires_at_epoch_ms: Option<u64>,
    pub kind: JobKind,
    pub state: JobState,
    pub created_at_epoch_ms: u64,
    pub started_at_epoch_ms: Option<u64>,
    pub completed_at_epoch_ms: Option<u64>,
    pub failure_count: u32,
    pub exception: Option<Exception>,
    pub server_name: Option<String>,
    pub percent_complete: u8,
    pub output: Option<serde_json::Value>,
    pub collect_output: bool,
    pub destroy_on_complete: bool,
    pub repeatable: bool,
    pub group: Option<String>,
}

impl Job {
    pub fn new(config: JobConfig, clock: &impl Clock) -> Self {
        Self {
            id: config.id,
            class_name: config.class_name,
            perform_method: config.perform_method,
            arguments: config.arguments,
            priority: config.priority,
            run_at_epoch_ms: config.run_at_epoch_ms,
            expires_at_epoch_ms: config.expires_at_epoch_ms,
            kind: config.kind,
            state: JobState::Queued,
            created_at_epoch_ms: clock.epoch_ms(),
            started_at_epoch_ms: None,
            completed_at_epoch_ms: None,
            failure_count: 0,
            exception: None,
            server_name: None,
            percent_complete: 0,
            output: None,
            collect_output: config.collect_output,
            destroy_on_complete: config.destroy_on_complete,
            repeatable: config.repeatable,
            group: config.group,
        }
    }

    pub fn is_sliced(&self) -> bool {
        self.kind.is_sliced()
    }

    pub fn sub_state(&self) -> Option<SubState> {
        self.kind.sliced().and_then(|d| d.sub_state)
    }

    pub fn is_dispatchable_now(&self, now_epoch_ms: u64) -> bool {
        let runnable_state = self.state == JobState::Queued
            || (self.state == JobState::Running && self.sub_state() == Some(SubState::Processing));
        let time_ok = self.run_at_epoch_ms.map(|t| t <= now_epoch_ms).unwrap_or(true);
        runnable_state && time_ok
    }

    /// Claim this job for a server as the dispatcher's atomic query does
    /// (§4.6): write `server_name` unconditionally, and if the job is still
    /// `queued`, fold in everything `start` would otherwise do (state,
    /// timestamps, sub-state). Returns `true` when this call is what
    /// started the job, so the caller knows whether to run `before_<method>`
    /// (singleton jobs only fire that hook once, on the transition).
    pub fn claim_for_dispatch(&mut self, server_name: &str, clock: &impl Clock) -> bool {
        self.server_name = Some(server_name.to_string());
        if self.state == JobState::Queued {
            self.state = JobState::Running;
            self.started_at_epoch_ms = Some(clock.epoch_ms());
            if let Some(d) = self.kind.sliced_mut() {
                d.sub_state = Some(SubState::Before);
            }
            true
        } else {
            false
        }
    }

    /// `start`: queued -> running (§4.4).
    pub fn start(&mut self, server_name: &str, clock: &impl Clock) -> Result<(), IllegalTransition> {
        if self.state != JobState::Queued {
            return Err(IllegalTransition { event: "start", from: self.state });
        }
        self.state = JobState::Running;
        self.server_name = Some(server_name.to_string());
        self.started_at_epoch_ms = Some(clock.epoch_ms());
        if let Some(d) = self.kind.sliced_mut() {
            d.sub_state = Some(SubState::Before);
        }
        Ok(())
    }

    /// `complete`: running -> completed (§4.4).
    pub fn complete(&mut self, clock: &impl Clock) -> Result<(), IllegalTransition> {
        if self.state != JobState::Running {
            return Err(IllegalTransition { event: "complete", from: self.state });
        }
        self.state = JobState::Completed;
        self.completed_at_epoch_ms = Some(clock.epoch_ms());
        self.percent_complete = 100;
        Ok(())
    }

    /// `fail`: running -> failed (§4.4).
    pub fn fail(&mut self, exception: Exception, clock: &impl Clock) -> Result<(), IllegalTransition> {
        if self.state != JobState::Running {
            return Err(IllegalTransition { event: "fail", from: self.state });
        }
        self.state = JobState::Failed;
        self.completed_at_epoch_ms = Some(clock.epoch_ms());
        self.failure_count += 1;
        self.exception = Some(exception);
        Ok(())
    }

    /// `retry`: failed -> running. Sub-state (if sliced) is preserved; the
    /// caller is responsible for calling `requeueFailed` on the input slice
    /// store (§4.4 side effect; slices are out of this crate's scope).
    pub fn retry(&mut self) -> Result<(), IllegalTransition> {
        if self.state != JobState::Failed {
            return Err(IllegalTransition { event: "retry", from: self.state });
        }
        self.state = JobState::Running;
        self.completed_at_epoch_ms = None;
        Ok(())
    }

    /// `pause`: running -> paused (§4.4).
    pub fn pause(&mut self, clock: &impl Clock) -> Result<(), IllegalTransition> {
        if self.state != JobState::Running {
            return Err(IllegalTransition { event: "pause", from: self.state });
        }
        self.state = JobState::Paused;
        self.completed_at_epoch_ms = Some(clock.epoch_ms());
        Ok(())
    }

    /// `resume`: paused -> running, matching the adjacency table in §4.4.
    pub fn resume(&mut self) -> Result<(), IllegalTransition> {
        if self.state != JobState::Paused {
            return Err(IllegalTransition { event: "resume", from: self.state });
        }
        self.state = JobState::Running;
        self.completed_at_epoch_ms = None;
        Ok(())
    }

    /// `abort`: queued|running -> aborted (§4.4). Caller drops slice
    /// collections as a side effect; out of this crate's scope.
    pub fn abort(&mut self, clock: &impl Clock) -> Result<(), IllegalTransition> {
        if !matches!(self.state, JobState::Queued | JobState::Running) {
            return Err(IllegalTransition { event: "abort", from: self.state });
        }
        self.state = JobState::Aborted;
        self.completed_at_epoch_ms = Some(clock.epoch_ms());
        Ok(())
    }

    /// CAS the sub-state, enforcing the `before -> processing -> after`
    /// adjacency (§3.2 invariant 2). Returns `false` (no panic) on mismatch
    /// so callers reload and re-evaluate, matching the CAS-failure policy
    /// used everywhere else in the state machine.
    pub fn cas_sub_state(&mut self, expected: SubState, next: SubState) -> bool {
        let Some(d) = self.kind.sliced_mut() else { return false };
        if d.sub_state != Some(expected) {
            return false;
        }
        d.sub_state = Some(next);
        true
    }

    /// Update `percent_complete` from a record-based ratio (§4.4 status
    /// projection).
    pub fn set_percent_complete_from_records(&mut self, processed: u64) {
        let Some(d) = self.kind.sliced() else { return };
        let pct = if d.record_count == 0 {
            0
        } else {
            ((processed.min(d.record_count) * 100) / d.record_count) as u8
        };
        self.percent_complete = pct;
    }

    /// Record that one slice (successful or failed) has left the input
    /// queue, and refresh `percent_complete` from the running record-based
    /// total (§4.4 `processSlice`/status projection).
    pub fn record_slice_processed(&mut self, records_in_slice: u64) {
        let processed = match self.kind.sliced_mut() {
            Some(d) => {
                d.processed_records = d.processed_records.saturating_add(records_in_slice);
                d.processed_records
            }
            None => return,
        };
        self.set_percent_complete_from_records(processed);
    }

    /// Sidekiq/delayed_job-compatible retry backoff (§5 Back-off).
    pub fn retry_delay(failure_count: u32) -> Duration {
        retry_delay_seconds(failure_count)
    }
}

/// `(count^4 + 15 + random(0,30) * (count+1))` seconds, as specified in §5.
pub fn retry_delay_seconds(failure_count: u32) -> Duration {
    use rand::Rng;
    let count = u64::from(failure_count);
    let jitter = rand::rng().random_range(0..=30u64);
    let secs = count.saturating_pow(4) + 15 + jitter * (count + 1);
    Duration::from_secs(secs)
}

/// Read-only status snapshot (§4.4 "Status projection").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobStatus {
    pub id: String,
    pub state: JobState,
    pub sub_state: Option<SubState>,
    pub elapsed_seconds: u64,
    pub percent_complete: u8,
    pub record_count: u64,
    pub queued_slices: u64,
    pub active_slices: u64,
    pub failed_slices: u64,
    pub output_slices: u64,
    pub records_per_hour: f64,
    pub estimated_remaining_minutes: Option<u64>,
}

/// Build a [`JobStatus`] for a job, given slice counts from the store and
/// the current epoch (§4.4).
#[allow(clippy::too_many_arguments)]
pub fn build_status(
    job: &Job,
    now_epoch_ms: u64,
    queued_slices: u64,
    active_slices: u64,
    failed_slices: u64,
    output_slices: u64,
    record_count: u64,
) -> JobStatus {
    let start = job.started_at_epoch_ms.unwrap_or(job.created_at_epoch_ms);
    let end = job.completed_at_epoch_ms.unwrap_or(now_epoch_ms);
    let elapsed_ms = end.saturating_sub(start);
    let elapsed_seconds = elapsed_ms / 1000;

    let records_per_hour = if elapsed_seconds == 0 {
        0.0
    } else {
        // Derived from `percent_complete`, which is itself record-based
        // (§4.4), rather than a slice-document count — slices can hold many
        // records each, so a slice count is the wrong unit here.
        let processed = (u64::from(job.percent_complete) * record_count) / 100;
        (processed as f64) * 3600.0 / (elapsed_seconds as f64)
    };

    let estimated_remaining_minutes = if job.state == JobState::Running && job.percent_complete > 0
    {
        let secs_so_far = elapsed_seconds as f64;
        let total = secs_so_far / (job.percent_complete as f64) * 100.0;
        Some(((total - secs_so_far) / 60.0).round().max(0.0) as u64)
    } else {
        None
    };

    JobStatus {
        id: job.id.to_string(),
        state: job.state,
        sub_state: job.sub_state(),
        elapsed_seconds,
        percent_complete: job.percent_complete,
        record_count,
        queued_slices,
        active_slices,
        failed_slices,
        output_slices,
        records_per_hour,
        estimated_remaining_minutes,
    }
}

#[cfg(any(test, feature = "test-support"))]
pub struct JobBuilder {
    config: JobConfigBuilder,
}

#[cfg(any(test, feature = "test-support"))]
impl JobBuilder {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self { config: JobConfig::builder(class_name) }
    }

    pub fn priority(mut self, p: u8) -> Self {
        self.config = self.config.priority(p);
        self
    }

    pub fn sliced(mut self, data: SlicedJobData) -> Self {
        self.config = self.config.sliced(data);
        self
    }

    pub fn collect_output(mut self, v: bool) -> Self {
        self.config = self.config.collect_output(v);
        self
    }

    pub fn build(self, clock: &impl Clock) -> Job {
        #[allow(clippy::unwrap_used)]
        let config = self.config.build().unwrap();
        Job::new(config, clock)
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
