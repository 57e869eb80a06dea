// SPDX-License-Identifier: MIT

//! A single job's input or output slice collection (§4.2, §6
//! `inputs.<jobId>` / `outputs.<jobId>`).

use crate::error::StoreError;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use stratum_core::{Slice, SliceId, SliceState};

/// The slice-collection contract (§4.2). One instance models one job's
/// `inputs.<jobId>` *or* `outputs.<jobId>` collection — a [`SlicedJobStores`]
/// pairs the two for a given job.
pub trait SliceStore: Send + Sync {
    /// Plain insert; fails on duplicate id.
    fn insert(&self, slice: Slice) -> Result<(), StoreError>;

    /// Insert an output slice derived from `input`, sharing its id (§3.2
    /// invariant 5). A duplicate id is treated as success — idempotent
    /// re-execution after a crash between `processSlice` and `remove`
    /// (§5 "At-least-once semantics").
    fn insert_derived(&self, input: &Slice, records: Vec<serde_json::Value>) {
        let slice = Slice::derived_from(input, records);
        // Duplicate key on re-insert after a crash is success, not failure
        // (§5 "At-least-once semantics").
        let _ = self.insert(slice);
    }

    /// §4.2 `nextSlice(serverName)`: atomic claim of the lowest-id `queued`
    /// slice.
    fn next_slice(&self, server_name: &str, now_epoch_ms: u64) -> Option<Slice>;

    fn update(&self, slice: Slice);
    fn remove(&self, id: SliceId) -> Option<Slice>;
    fn find(&self, id: SliceId) -> Option<Slice>;
    fn first(&self) -> Option<Slice>;
    fn last(&self) -> Option<Slice>;
    fn clear(&self);

    /// Every slice, ascending by id (§4.3 `download`: "enumerates slices in
    /// ascending `id` order").
    fn all_ascending(&self) -> Vec<Slice>;

    fn count(&self) -> u64;
    fn queued_count(&self) -> u64;
    fn active_count(&self) -> u64;
    fn failed_count(&self) -> u64;

    /// Clears `server_name`/`started_at`, sets `state=queued` on every
    /// `failed` slice; returns the count changed (§4.2).
    fn requeue_failed(&self) -> u64;

    /// Same, scoped to slices owned by `server_name` (§4.2, used by §4.7
    /// dead-server recovery).
    fn requeue_running(&self, server_name: &str) -> u64;

    /// Yield `(record, slice)` for every failed slice's offending record
    /// (§4.2 `eachFailedRecord`).
    fn each_failed_record(&self, f: &mut dyn FnMut(&serde_json::Value, &Slice));
}

#[derive(Default)]
pub struct InMemorySliceStore {
    slices: Mutex<BTreeMap<SliceId, Slice>>,
}

impl InMemorySliceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SliceStore for InMemorySliceStore {
    fn insert(&self, slice: Slice) -> Result<(), StoreError> {
        let mut slices = self.slices.lock();
        if slices.contains_key(&slice.id) {
            return Err(StoreError::DuplicateKey { collection: "slices", id: slice.id.to_string() });
        }
        slices.insert(slice.id, slice);
        Ok(())
    }

    fn next_slice(&self, server_name: &str, now_epoch_ms: u64) -> Option<Slice> {
        let mut slices = self.slices.lock();
        // sort: id ASC (§4.2) — BTreeMap iteration is already id-ordered.
        let winner = slices.values_mut().find(|s| s.state == SliceState::Queued)?;
        winner.claim(server_name, now_epoch_ms);
        Some(winner.clone())
    }

    fn update(&self, slice: Slice) {
        self.slices.lock().insert(slice.id, slice);
    }

    fn remove(&self, id: SliceId) -> Option<Slice> {
        self.slices.lock().remove(&id)
    }

    fn find(&self, id: SliceId) -> Option<Slice> {
        self.slices.lock().get(&id).cloned()
    }

    fn first(&self) -> Option<Slice> {
        self.slices.lock().values().next().cloned()
    }

    fn last(&self) -> Option<Slice> {
        self.slices.lock().values().next_back().cloned()
    }

    fn clear(&self) {
        self.slices.lock().clear();
    }

    fn all_ascending(&self) -> Vec<Slice> {
        // BTreeMap iteration is already id-ordered.
        self.slices.lock().values().cloned().collect()
    }

    fn count(&self) -> u64 {
        self.slices.lock().len() as u64
    }

    fn queued_count(&self) -> u64 {
        self.slices.lock().values().filter(|s| s.state == SliceState::Queued).count() as u64
    }

    fn active_count(&self) -> u64 {
        self.slices.lock().values().filter(|s| s.state == SliceState::Running).count() as u64
    }

    fn failed_count(&self) -> u64 {
        self.slices.lock().values().filter(|s| s.state == SliceState::Failed).count() as u64
    }

    fn requeue_failed(&self) -> u64 {
        let mut slices = self.slices.lock();
        let mut changed = 0u64;
        for slice in slices.values_mut() {
            if slice.state == SliceState::Failed {
                slice.requeue();
                changed += 1;
            }
        }
        changed
    }

    fn requeue_running(&self, server_name: &str) -> u64 {
        let mut slices = self.slices.lock();
        let mut changed = 0u64;
        for slice in slices.values_mut() {
            if slice.state == SliceState::Running && slice.server_name.as_deref() == Some(server_name) {
                slice.requeue();
                changed += 1;
            }
        }
        changed
    }

    fn each_failed_record(&self, f: &mut dyn FnMut(&serde_json::Value, &Slice)) {
        let slices = self.slices.lock();
        for slice in slices.values() {
            if slice.state != SliceState::Failed {
                continue;
            }
            let Some(failure) = &slice.exception else { continue };
            let idx = failure.record_number.saturating_sub(1) as usize;
            if let Some(record) = slice.records.get(idx) {
                f(record, slice);
            }
        }
    }
}

#[cfg(test)]
#[path = "slice_store_tests.rs"]
mod tests;
