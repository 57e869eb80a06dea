// SPDX-License-Identifier: MIT

//! Dispatcher (C8, §4.6): atomic pull of the highest-priority runnable job.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use stratum_core::{Clock, Job};
use stratum_storage::JobStore;

use crate::backoff::Backoff;

/// Cooperative shutdown signal shared by the supervisor and its workers
/// (§4.7 "Signal handling").
#[derive(Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Dispatcher<J> {
    store: Arc<J>,
    max_poll: Duration,
}

impl<J: JobStore> Dispatcher<J> {
    pub fn new(store: Arc<J>, max_poll: Duration) -> Self {
        Self { store, max_poll }
    }

    /// §4.6 `nextJob(serverName)`: a single atomic claim attempt, no
    /// polling loop.
    pub fn try_claim(&self, server_name: &str, clock: &impl Clock) -> Option<Job> {
        self.store.claim_next(server_name, clock.epoch_ms())
    }

    /// Polls [`Dispatcher::try_claim`] with exponential back-off
    /// (§5 "Empty dispatch ⇒ exponential back-off") until a job is claimed
    /// or `shutdown` is triggered.
    pub async fn poll(&self, server_name: &str, clock: &impl Clock, shutdown: &ShutdownFlag) -> Option<Job> {
        let mut backoff = Backoff::new(Duration::from_millis(50), self.max_poll);
        loop {
            if shutdown.is_set() {
                return None;
            }
            if let Some(job) = self.try_claim(server_name, clock) {
                return Some(job);
            }
            tokio::time::sleep(backoff.next_delay()).await;
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
