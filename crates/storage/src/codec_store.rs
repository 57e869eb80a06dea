// SPDX-License-Identifier: MIT

//! Transparent compression/encryption for a slice collection (§4.1 Codec,
//! composed with §4.2 Slice Store).
//!
//! [`CodecSliceStore`] wraps any [`SliceStore`] and applies
//! [`stratum_codec::encode`]/[`decode`](stratum_codec::decode) around every
//! record batch that crosses the boundary, the way a real document-store
//! adapter would serialize a slice's `records` field. Callers that don't
//! need compression or encryption use the wrapped store directly — this
//! type only exists for sliced jobs with `compress`/`encrypt` set (§3.1
//! `SlicedJob`).

use crate::slice_store::SliceStore;
use serde_json::Value;
use std::sync::Arc;
use stratum_codec::{CodecKeyring, CodecOptions, Payload};
use stratum_core::{Slice, SliceId};

pub struct CodecSliceStore {
    inner: Arc<dyn SliceStore>,
    options: CodecOptions,
    keyring: Arc<CodecKeyring>,
}

impl CodecSliceStore {
    pub fn new(inner: Arc<dyn SliceStore>, options: CodecOptions, keyring: Arc<CodecKeyring>) -> Self {
        Self { inner, options, keyring }
    }

    fn pack(&self, records: Vec<Value>) -> Vec<Value> {
        if self.options.is_plain() {
            return records;
        }
        // Encoding an in-memory JSON array can only fail on a key-less
        // keyring or a non-serializable value, neither possible here: the
        // keyring always carries an active key and `records` are always
        // valid JSON already held in memory.
        #[allow(clippy::expect_used)]
        let payload =
            stratum_codec::encode(&records, self.options, &self.keyring).expect("encode cannot fail here");
        match payload {
            Payload::Plain(r) => r,
            #[allow(clippy::expect_used)]
            Payload::Binary(bytes) => vec![serde_json::to_value(bytes).expect("byte vec always serializes")],
        }
    }

    fn unpack(&self, records: Vec<Value>) -> Vec<Value> {
        if self.options.is_plain() {
            return records;
        }
        let Some(blob) = records.into_iter().next() else { return Vec::new() };
        #[allow(clippy::expect_used)]
        let bytes: Vec<u8> =
            serde_json::from_value(blob).expect("a packed slice always holds a byte-array blob");
        #[allow(clippy::expect_used)]
        stratum_codec::decode(&Payload::Binary(bytes), &self.keyring).expect("decode of our own payload cannot fail")
    }

    fn pack_slice(&self, mut slice: Slice) -> Slice {
        slice.records = self.pack(slice.records);
        slice
    }

    fn unpack_slice(&self, mut slice: Slice) -> Slice {
        slice.records = self.unpack(slice.records);
        slice
    }
}

impl SliceStore for CodecSliceStore {
    fn insert(&self, slice: Slice) -> Result<(), crate::error::StoreError> {
        self.inner.insert(self.pack_slice(slice))
    }

    fn next_slice(&self, server_name: &str, now_epoch_ms: u64) -> Option<Slice> {
        self.inner.next_slice(server_name, now_epoch_ms).map(|s| self.unpack_slice(s))
    }

    fn update(&self, slice: Slice) {
        self.inner.update(self.pack_slice(slice));
    }

    fn remove(&self, id: SliceId) -> Option<Slice> {
        self.inner.remove(id).map(|s| self.unpack_slice(s))
    }

    fn find(&self, id: SliceId) -> Option<Slice> {
        self.inner.find(id).map(|s| self.unpack_slice(s))
    }

    fn first(&self) -> Option<Slice> {
        self.inner.first().map(|s| self.unpack_slice(s))
    }

    fn last(&self) -> Option<Slice> {
        self.inner.last().map(|s| self.unpack_slice(s))
    }

    fn clear(&self) {
        self.inner.clear();
    }

    fn all_ascending(&self) -> Vec<Slice> {
        self.inner.all_ascending().into_iter().map(|s| self.unpack_slice(s)).collect()
    }

    fn count(&self) -> u64 {
        self.inner.count()
    }

    fn queued_count(&self) -> u64 {
        self.inner.queued_count()
    }

    fn active_count(&self) -> u64 {
        self.inner.active_count()
    }

    fn failed_count(&self) -> u64 {
        self.inner.failed_count()
    }

    fn requeue_failed(&self) -> u64 {
        self.inner.requeue_failed()
    }

    fn requeue_running(&self, server_name: &str) -> u64 {
        self.inner.requeue_running(server_name)
    }

    /// Record numbers address positions in the *decoded* record array, so
    /// this recomputes them from the unpacked view rather than trusting the
    /// inner store's (packed, single-blob) record list.
    fn each_failed_record(&self, f: &mut dyn FnMut(&Value, &Slice)) {
        self.inner.each_failed_record(&mut |_ignored_packed_record, packed_slice| {
            let plain_records = self.unpack(packed_slice.records.clone());
            let Some(failure) = &packed_slice.exception else { return };
            let idx = failure.record_number.saturating_sub(1) as usize;
            let Some(record) = plain_records.get(idx) else { return };
            let mut plain_slice = packed_slice.clone();
            plain_slice.records = plain_records.clone();
            f(record, &plain_slice);
        });
    }
}

#[cfg(test)]
#[path = "codec_store_tests.rs"]
mod tests;
