// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! stratum-storage: the `jobs`, `inputs.<jobId>`/`outputs.<jobId>`, and
//! `servers` collections (§6), modeled as trait contracts with an in-memory
//! reference adapter.
//!
//! The persistent document store itself is out of this system's scope (§1
//! "Out of scope"); this crate owns only the atomic-operation *contract* a
//! real store adapter (geo-replicated `jobs`, local `inputs`/`outputs`) must
//! satisfy, plus [`InMemoryJobStore`]/[`InMemorySliceStore`]/
//! [`InMemoryServerStore`] reference implementations used by tests and by
//! `inline_mode`.

pub mod codec_store;
pub mod error;
pub mod job_store;
pub mod server_store;
pub mod slice_store;

pub use codec_store::CodecSliceStore;
pub use error::StoreError;
pub use job_store::{InMemoryJobStore, JobStore};
pub use server_store::{InMemoryServerStore, ServerStore};
pub use slice_store::{InMemorySliceStore, SliceStore};

use std::sync::Arc;
use stratum_codec::{CodecKeyring, CodecOptions};

/// The pair of slice collections a single sliced job owns (§3.3 "Ownership":
/// "a SlicedJob exclusively owns its two slice collections").
#[derive(Clone)]
pub struct SlicedJobStores {
    pub input: Arc<dyn SliceStore>,
    pub output: Arc<dyn SliceStore>,
}

impl SlicedJobStores {
    pub fn new(input: Arc<dyn SliceStore>, output: Arc<dyn SliceStore>) -> Self {
        Self { input, output }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemorySliceStore::new()), Arc::new(InMemorySliceStore::new()))
    }

    /// Wrap plain in-memory collections with [`CodecSliceStore`] when the
    /// owning job requested compression or encryption (§3.1 `SlicedJob`
    /// `compress`/`encrypt`).
    pub fn for_job(options: CodecOptions, keyring: &Arc<CodecKeyring>) -> Self {
        if options.is_plain() {
            return Self::in_memory();
        }
        let input: Arc<dyn SliceStore> =
            Arc::new(CodecSliceStore::new(Arc::new(InMemorySliceStore::new()), options, keyring.clone()));
        let output: Arc<dyn SliceStore> =
            Arc::new(CodecSliceStore::new(Arc::new(InMemorySliceStore::new()), options, keyring.clone()));
        Self::new(input, output)
    }

    /// Drop both collections (§3.3: "dropped on destroy/abort").
    pub fn drop_collections(&self) {
        self.input.clear();
        self.output.clear();
    }
}

/// Registry of a sliced job's input/output stores, keyed by job id — the
/// in-process stand-in for the `inputs.<jobId>`/`outputs.<jobId>` naming
/// convention (§6) a real store would use for collection names.
#[derive(Default)]
pub struct SliceStoreRegistry {
    by_job: parking_lot::Mutex<std::collections::HashMap<stratum_core::JobId, SlicedJobStores>>,
}

impl SliceStoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (on first use) and return the slice stores for `job_id`,
    /// applying codec wrapping per `options` only on first creation.
    pub fn stores_for(
        &self,
        job_id: stratum_core::JobId,
        options: CodecOptions,
        keyring: &Arc<CodecKeyring>,
    ) -> SlicedJobStores {
        self.by_job
            .lock()
            .entry(job_id)
            .or_insert_with(|| SlicedJobStores::for_job(options, keyring))
            .clone()
    }

    /// Drop a job's slice collections entirely, e.g. on `destroy_on_complete`
    /// or `abort` (§3.3 Ownership).
    pub fn drop_job(&self, job_id: stratum_core::JobId) {
        if let Some(stores) = self.by_job.lock().remove(&job_id) {
            stores.drop_collections();
        }
    }
}
