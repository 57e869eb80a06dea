// SPDX-License-Identifier: MIT

//! Worker fixtures shared by the scenario specs.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stratum_engine::{Worker, WorkerError};

/// Fails `perform` for its first `fail_times` calls, then succeeds. The
/// registry constructs workers fresh per dispatch (§4.5), so a caller shares
/// one instance across dispatches (rather than re-registering per call) to
/// model a flaky dependency that recovers rather than a worker that is
/// reconstructed clean on every retry.
pub struct FlakyWorker {
    calls: AtomicU32,
    fail_times: u32,
}

impl FlakyWorker {
    pub fn new(fail_times: u32) -> Arc<Self> {
        Arc::new(Self { calls: AtomicU32::new(0), fail_times })
    }
}

#[async_trait]
impl Worker for FlakyWorker {
    async fn perform(&self, _arguments: &[Value]) -> Result<Option<Value>, WorkerError> {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst);
        if attempt < self.fail_times {
            Err(WorkerError::new("simulated transient failure"))
        } else {
            Ok(Some(Value::String("ok".to_string())))
        }
    }
}

/// Counts how many times its `after` hook ran.
pub struct AfterCountingWorker {
    after_calls: Arc<AtomicU32>,
}

impl AfterCountingWorker {
    pub fn new(after_calls: Arc<AtomicU32>) -> Arc<Self> {
        Arc::new(Self { after_calls })
    }
}

#[async_trait]
impl Worker for AfterCountingWorker {
    async fn perform(&self, _arguments: &[Value]) -> Result<Option<Value>, WorkerError> {
        Ok(None)
    }

    async fn after(&self, _arguments: &[Value]) -> Result<(), WorkerError> {
        self.after_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Tracks the high-water mark of concurrent `perform_record` calls, with a
/// short sleep to widen the window in which two tasks can overlap.
pub struct ConcurrencyTrackingWorker {
    active: Arc<AtomicU32>,
    peak: Arc<AtomicU32>,
}

impl ConcurrencyTrackingWorker {
    pub fn new(active: Arc<AtomicU32>, peak: Arc<AtomicU32>) -> Arc<Self> {
        Arc::new(Self { active, peak })
    }
}

#[async_trait]
impl Worker for ConcurrencyTrackingWorker {
    async fn perform(&self, _arguments: &[Value]) -> Result<Option<Value>, WorkerError> {
        Ok(None)
    }

    async fn perform_record(&self, _arguments: &[Value], record: &Value) -> Result<Option<Value>, WorkerError> {
        let in_flight = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(in_flight, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(Some(record.clone()))
    }
}
