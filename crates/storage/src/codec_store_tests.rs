// SPDX-License-Identifier: MIT

use super::*;
use crate::slice_store::InMemorySliceStore;
use serde_json::json;
use stratum_core::FakeClock;

fn slice(id: u64, records: Vec<&str>) -> Slice {
    Slice::new(SliceId::new(id), records.into_iter().map(|r| json!(r)).collect())
}

#[test]
fn plain_options_pass_through_untouched() {
    let store = CodecSliceStore::new(Arc::new(InMemorySliceStore::new()), CodecOptions::NONE, Arc::new(CodecKeyring::random()));
    store.insert(slice(1, vec!["a", "b"])).unwrap();
    assert_eq!(store.find(SliceId::new(1)).unwrap().records, vec![json!("a"), json!("b")]);
}

#[test]
fn compressed_payload_is_not_stored_in_plaintext() {
    let inner = Arc::new(InMemorySliceStore::new());
    let options = CodecOptions { compress: true, encrypt: false };
    let store = CodecSliceStore::new(inner.clone(), options, Arc::new(CodecKeyring::random()));
    store.insert(slice(1, vec!["hello world", "hello world", "hello world"])).unwrap();

    let raw = inner.find(SliceId::new(1)).unwrap();
    assert_ne!(raw.records, vec![json!("hello world"), json!("hello world"), json!("hello world")]);

    let decoded = store.find(SliceId::new(1)).unwrap();
    assert_eq!(decoded.records, vec![json!("hello world"), json!("hello world"), json!("hello world")]);
}

#[test]
fn encrypted_compressed_round_trips_through_next_slice() {
    let inner = Arc::new(InMemorySliceStore::new());
    let options = CodecOptions { compress: true, encrypt: true };
    let keyring = Arc::new(CodecKeyring::random());
    let store = CodecSliceStore::new(inner.clone(), options, keyring);
    store.insert(slice(1, vec!["a", "b", "c"])).unwrap();

    let raw = inner.find(SliceId::new(1)).unwrap();
    assert_ne!(raw.records, vec![json!("a"), json!("b"), json!("c")]);

    let clock = FakeClock::new();
    let claimed = store.next_slice("host-1:1", clock.epoch_ms()).unwrap();
    assert_eq!(claimed.records, vec![json!("a"), json!("b"), json!("c")]);
}

#[test]
fn each_failed_record_resolves_against_the_decoded_view() {
    let inner = Arc::new(InMemorySliceStore::new());
    let options = CodecOptions { compress: true, encrypt: true };
    let store = CodecSliceStore::new(inner, options, Arc::new(CodecKeyring::random()));
    store.insert(slice(1, vec!["ok", "bad", "also-ok"])).unwrap();

    let clock = FakeClock::new();
    let mut claimed = store.next_slice("host-1:1", clock.epoch_ms()).unwrap();
    claimed.failure(stratum_core::Exception::new("Boom", "x"), 2);
    store.update(claimed);

    let mut seen = Vec::new();
    store.each_failed_record(&mut |record, _slice| seen.push(record.clone()));
    assert_eq!(seen, vec![json!("bad")]);
}

#[test]
fn all_ascending_decodes_every_slice() {
    let inner = Arc::new(InMemorySliceStore::new());
    let options = CodecOptions { compress: true, encrypt: false };
    let store = CodecSliceStore::new(inner, options, Arc::new(CodecKeyring::random()));
    store.insert(slice(2, vec!["b"])).unwrap();
    store.insert(slice(1, vec!["a"])).unwrap();

    let all = store.all_ascending();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].records, vec![json!("a")]);
    assert_eq!(all[1].records, vec![json!("b")]);
}
