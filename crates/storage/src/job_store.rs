// SPDX-License-Identifier: MIT

//! Job collection (§6 "jobs"): atomic claim-on-find dispatch, CAS updates.

use crate::error::StoreError;
use parking_lot::Mutex;
use std::collections::HashMap;
use stratum_core::{Clock, Job, JobId};

/// Adapts a caller-supplied epoch-ms timestamp to the [`Clock`] trait so
/// the store can delegate to `Job::claim_for_dispatch` without pulling a
/// full clock implementation through the store boundary.
#[derive(Clone)]
struct FixedEpoch(u64);

impl Clock for FixedEpoch {
    fn now(&self) -> std::time::Instant {
        std::time::Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        self.0
    }
}

/// The `jobs` collection contract (§4.6 Dispatcher, §6 store contract).
///
/// Every mutation that can race is expressed as a single call that takes
/// the whole collection lock for its duration — the in-memory analog of a
/// document database's atomic `findAndModify` (§6).
pub trait JobStore: Send + Sync {
    fn insert(&self, job: Job) -> Result<(), StoreError>;
    fn find(&self, id: JobId) -> Option<Job>;
    fn list(&self) -> Vec<Job>;
    fn remove(&self, id: JobId) -> Option<Job>;

    /// Apply `f` to the stored job under the collection lock and persist
    /// whatever it leaves behind, returning `f`'s result. This is the
    /// general compare-and-set point every state transition in
    /// `stratum-engine` goes through (§4.4: "each event is an atomic
    /// compare-and-set").
    fn with_job_mut<R>(&self, id: JobId, f: impl FnOnce(&mut Job) -> R) -> Option<R>;

    /// §4.6 `nextJob(serverName)`: atomically find the highest-priority
    /// runnable job (queued, or running+processing for sliced jobs already
    /// dispatchable to more workers), filtered by `run_at`, and claim it by
    /// writing `server_name` (and `state=running` if it was queued).
    /// Returns the *post-claim* job.
    fn claim_next(&self, server_name: &str, now_epoch_ms: u64) -> Option<Job>;
}

#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: Mutex<HashMap<JobId, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for InMemoryJobStore {
    fn insert(&self, job: Job) -> Result<(), StoreError> {
        let mut jobs = self.jobs.lock();
        if jobs.contains_key(&job.id) {
            return Err(StoreError::DuplicateKey { collection: "jobs", id: job.id.to_string() });
        }
        jobs.insert(job.id, job);
        Ok(())
    }

    fn find(&self, id: JobId) -> Option<Job> {
        self.jobs.lock().get(&id).cloned()
    }

    fn list(&self) -> Vec<Job> {
        self.jobs.lock().values().cloned().collect()
    }

    fn remove(&self, id: JobId) -> Option<Job> {
        self.jobs.lock().remove(&id)
    }

    fn with_job_mut<R>(&self, id: JobId, f: impl FnOnce(&mut Job) -> R) -> Option<R> {
        let mut jobs = self.jobs.lock();
        jobs.get_mut(&id).map(f)
    }

    fn claim_next(&self, server_name: &str, now_epoch_ms: u64) -> Option<Job> {
        let mut jobs = self.jobs.lock();

        // sort: priority ASC, created_at ASC (§4.6 Fairness / Ordering).
        let winner_id = jobs
            .values()
            .filter(|j| j.is_dispatchable_now(now_epoch_ms))
            .min_by_key(|j| (j.priority, j.created_at_epoch_ms))
            .map(|j| j.id)?;

        let job = jobs.get_mut(&winner_id)?;
        job.claim_for_dispatch(server_name, &FixedEpoch(now_epoch_ms));
        Some(job.clone())
    }
}

#[cfg(test)]
#[path = "job_store_tests.rs"]
mod tests;
