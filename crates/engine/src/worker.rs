// SPDX-License-Identifier: MIT

//! Worker Runtime (C7, §4.5): user-supplied `perform`/`before`/`after`/
//! `on_exception` hooks, resolved by a process-wide registry keyed on
//! `className` rather than by reflective lookup (§9 redesign — Rust has no
//! runtime reflection over method names, so `performMethod` is retained on
//! `Job` purely as display metadata and the registry binds directly to a
//! single [`Worker::perform`] entry point per class).

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::WorkerError;

/// Implemented by user-supplied job code. A missing `before`/`after`/
/// `on_exception` hook is silently skipped by virtue of the default no-op
/// implementations (§4.5 "a missing hook is silently skipped").
#[async_trait]
pub trait Worker: Send + Sync {
    /// Singleton entry point: `perform(*arguments)`.
    async fn perform(&self, arguments: &[Value]) -> Result<Option<Value>, WorkerError>;

    /// Sliced entry point: `perform(*arguments, record, slice)`. Default
    /// delegates to [`Worker::perform`] with the record appended, which is
    /// the common case; workers that need the slice context override it.
    async fn perform_record(&self, arguments: &[Value], record: &Value) -> Result<Option<Value>, WorkerError> {
        let mut args = arguments.to_vec();
        args.push(record.clone());
        self.perform(&args).await
    }

    async fn before(&self, _arguments: &[Value]) -> Result<(), WorkerError> {
        Ok(())
    }

    async fn after(&self, _arguments: &[Value]) -> Result<(), WorkerError> {
        Ok(())
    }

    async fn on_exception(&self, _error: &WorkerError) {}
}

type Factory = Arc<dyn Fn() -> Arc<dyn Worker> + Send + Sync>;

/// Process-wide registry mapping a job's `className` to a worker factory
/// (§4.5). Workers are constructed fresh per dispatch, so no mutable worker
/// state is ever shared across jobs.
#[derive(Default, Clone)]
pub struct WorkerRegistry {
    factories: Arc<parking_lot::Mutex<HashMap<String, Factory>>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&self, class_name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn Worker> + Send + Sync + 'static,
    {
        self.factories.lock().insert(class_name.into(), Arc::new(factory));
    }

    pub fn resolve(&self, class_name: &str) -> Option<Arc<dyn Worker>> {
        self.factories.lock().get(class_name).map(|f| f())
    }

    pub fn is_registered(&self, class_name: &str) -> bool {
        self.factories.lock().contains_key(class_name)
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
