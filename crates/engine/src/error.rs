// SPDX-License-Identifier: MIT

//! Engine-boundary errors (§4.5, §7).

use thiserror::Error;

/// A user worker's `perform`/`before`/`after`/`on_exception` hook failed.
/// Carried up to the job/slice as an [`stratum_core::Exception`] — never
/// propagated past `Job.work`/`SlicedJob.work` except in `inline_mode`
/// (§4.4, §5 "At-least-once semantics").
#[derive(Debug, Error, Clone)]
#[error("{message}")]
pub struct WorkerError {
    pub message: String,
}

impl WorkerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// §4.5: "An unregistered class name fails the job with a structured
    /// `WorkerNotRegistered` error rather than panicking."
    #[error("no worker registered for class {0:?}")]
    WorkerNotRegistered(String),

    /// §4.5: "a missing `perform` fails the job with `NotImplementedError`."
    #[error("worker {class_name:?} does not implement {method:?}")]
    NotImplemented { class_name: String, method: String },

    #[error("store error: {0}")]
    Store(#[from] stratum_storage::StoreError),

    #[error(transparent)]
    Worker(#[from] WorkerError),
}
