// SPDX-License-Identifier: MIT

//! Slice identifier, slice-level state machine, and the `Slice` entity
//! (§3.1, §3.2, §3.3, §4.2, §4.4 `processSlice`).
//!
//! A slice is a fixed-size batch of records processed as an atomic unit.
//! Unlike [`crate::job::JobId`], slice ids are monotonic `u64` counters
//! scoped to a single job's input/output collections (§3.1: "monotonic
//! within the job"), which is what lets an output slice reuse its input
//! slice's id (§3.2 invariant 5) and lets downloads reconstruct order by
//! sorting on id (§5 "Ordering guarantees").

use crate::job::Exception;
use serde::{Deserialize, Serialize};

/// Monotonic slice id, scoped to one job's input/output collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SliceId(pub u64);

impl SliceId {
    pub const fn new(n: u64) -> Self {
        Self(n)
    }
}

impl std::fmt::Display for SliceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Slice-level lifecycle state (§3.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SliceState {
    Queued,
    Running,
    Completed,
    Failed,
}

crate::simple_display! {
    SliceState {
        Queued => "queued",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
    }
}

/// Failure detail recorded on a slice: the job-level [`Exception`] plus the
/// offending 1-based record number (§3.1, §7).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceFailure {
    #[serde(flatten)]
    pub exception: Exception,
    pub record_number: u32,
}

/// A record batch tracked through the input or output slice collection of a
/// sliced job (§3.1, §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slice {
    pub id: SliceId,
    /// Decoded records. The on-disk/serialized form may be an opaque,
    /// possibly-compressed-and-encrypted payload (see `stratum-codec`); this
    /// is always the plaintext view used in-process.
    pub records: Vec<serde_json::Value>,
    pub state: SliceState,
    pub failure_count: u32,
    pub server_name: Option<String>,
    pub exception: Option<SliceFailure>,
    pub started_at_epoch_ms: Option<u64>,
}

impl Slice {
    /// Construct a freshly-uploaded slice, `queued`, unclaimed (§4.3 upload).
    pub fn new(id: SliceId, records: Vec<serde_json::Value>) -> Self {
        Self {
            id,
            records,
            state: SliceState::Queued,
            failure_count: 0,
            server_name: None,
            exception: None,
            started_at_epoch_ms: None,
        }
    }

    /// Build an output slice that reuses an input slice's id, satisfying
    /// invariant 5 (§3.2): output id equals the input id it was derived
    /// from, which callers may subsequently treat as "insert, ignore on
    /// duplicate key" for idempotent re-execution (§8 round-trip property).
    pub fn derived_from(input: &Slice, records: Vec<serde_json::Value>) -> Self {
        Self::new(input.id, records)
    }

    /// `state=running`, bind `server_name`, stamp `started_at` (§4.2
    /// `nextSlice`). Only ever called by the store's atomic claim, so it has
    /// no illegal-transition guard of its own — the store is the CAS point.
    ///
    /// Takes a raw epoch timestamp rather than `&impl Clock` so the store
    /// contract ([`crate::Clock`] via `dyn Clock`, for object safety) can
    /// forward straight through without needing `dyn Clock` to implement
    /// `Clock` itself.
    pub fn claim(&mut self, server_name: impl Into<String>, now_epoch_ms: u64) {
        self.state = SliceState::Running;
        self.server_name = Some(server_name.into());
        self.started_at_epoch_ms = Some(now_epoch_ms);
    }

    /// `slice.failure(exception, recordNumber)` (§4.2): `state=failed`,
    /// increment `failure_count`, clear `server_name`, record the exception.
    pub fn failure(&mut self, exception: Exception, record_number: u32) {
        self.state = SliceState::Failed;
        self.failure_count += 1;
        self.server_name = None;
        self.exception = Some(SliceFailure { exception, record_number });
    }

    /// `state=completed`. Callers typically `remove` the slice from the
    /// input collection immediately afterward rather than persist this
    /// state (§4.4 `processSlice`: "Remove input slice on success"); kept
    /// for callers that want to observe the transition before removal.
    pub fn complete(&mut self) {
        self.state = SliceState::Completed;
        self.server_name = None;
    }

    /// Return this slice to `queued`, clearing ownership and timing, as
    /// performed in bulk by `requeueFailed`/`requeueRunning` (§4.2).
    pub fn requeue(&mut self) {
        self.state = SliceState::Queued;
        self.server_name = None;
        self.started_at_epoch_ms = None;
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
#[path = "slice_tests.rs"]
mod tests;
