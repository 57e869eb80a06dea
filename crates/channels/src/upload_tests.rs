// SPDX-License-Identifier: MIT

use super::*;
use std::io::Cursor;
use stratum_storage::InMemorySliceStore;
use yare::parameterized;

fn records_of(store: &InMemorySliceStore) -> Vec<String> {
    store
        .all_ascending()
        .into_iter()
        .flat_map(|s| s.records)
        .map(|v| v.as_str().unwrap().to_string())
        .collect()
}

#[test]
fn empty_stream_produces_zero_slices() {
    let store = InMemorySliceStore::new();
    let ids = SliceIdAllocator::new();
    let count = upload(&store, &ids, Cursor::new(b""), &UploadOptions::default()).unwrap();
    assert_eq!(count, 0);
    assert_eq!(store.count(), 0);
}

#[test]
fn only_delimiter_produces_one_empty_record() {
    let store = InMemorySliceStore::new();
    let ids = SliceIdAllocator::new();
    let count = upload(&store, &ids, Cursor::new(b"\n"), &UploadOptions::default()).unwrap();
    assert_eq!(count, 1);
    assert_eq!(records_of(&store), vec!["".to_string()]);
}

#[test]
fn missing_delimiter_within_buffer_is_one_record() {
    let store = InMemorySliceStore::new();
    let ids = SliceIdAllocator::new();
    let opts = UploadOptions { buffer_size: 64, ..Default::default() };
    let count = upload(&store, &ids, Cursor::new(b"no newline here"), &opts).unwrap();
    assert_eq!(count, 1);
    assert_eq!(records_of(&store), vec!["no newline here".to_string()]);
}

#[test]
fn missing_delimiter_past_buffer_size_is_malformed() {
    let store = InMemorySliceStore::new();
    let ids = SliceIdAllocator::new();
    let opts = UploadOptions { buffer_size: 8, ..Default::default() };
    let data = vec![b'x'; 64];
    let err = upload(&store, &ids, Cursor::new(data), &opts).unwrap_err();
    assert!(matches!(err, ChannelError::MalformedData(8)));
}

#[test]
fn groups_by_slice_size() {
    let store = InMemorySliceStore::new();
    let ids = SliceIdAllocator::new();
    let opts = UploadOptions { slice_size: 2, ..Default::default() };
    let count = upload(&store, &ids, Cursor::new(b"a\nb\nc\nd\ne\n"), &opts).unwrap();
    assert_eq!(count, 5);
    assert_eq!(store.count(), 3); // [a,b] [c,d] [e]
    let lens: Vec<usize> = store.all_ascending().into_iter().map(|s| s.len()).collect();
    assert_eq!(lens, vec![2, 2, 1]);
}

#[parameterized(
    lf = { &b"a\nb\nc"[..], b"\n".as_slice() },
    crlf = { &b"a\r\nb\r\nc"[..], b"\r\n".as_slice() },
    cr = { &b"a\rb\rc"[..], b"\r".as_slice() },
)]
fn auto_detects_delimiter(input: &[u8], _expected: &[u8]) {
    let store = InMemorySliceStore::new();
    let ids = SliceIdAllocator::new();
    upload(&store, &ids, Cursor::new(input), &UploadOptions::default()).unwrap();
    assert_eq!(records_of(&store), vec!["a".to_string(), "b".to_string(), "c".to_string()]);
}

#[test]
fn strips_non_printable_when_requested() {
    let store = InMemorySliceStore::new();
    let ids = SliceIdAllocator::new();
    let opts = UploadOptions { strip_non_printable: true, ..Default::default() };
    upload(&store, &ids, Cursor::new(b"a\x00b\n"), &opts).unwrap();
    assert_eq!(records_of(&store), vec!["ab".to_string()]);
}

#[test]
fn upload_records_batches_a_generator() {
    let store = InMemorySliceStore::new();
    let ids = SliceIdAllocator::new();
    let mut remaining = vec!["x", "y", "z"].into_iter();
    let count =
        upload_records(&store, &ids, 2, || remaining.next().map(|s| serde_json::Value::String(s.to_string())))
            .unwrap();
    assert_eq!(count, 3);
    assert_eq!(store.count(), 2);
}

#[test]
fn upload_slice_writes_one_slice_as_is() {
    let store = InMemorySliceStore::new();
    let ids = SliceIdAllocator::new();
    upload_slice(&store, &ids, vec![serde_json::json!("a"), serde_json::json!("b"), serde_json::json!("c")]).unwrap();
    assert_eq!(store.count(), 1);
    assert_eq!(store.first().unwrap().len(), 3);
}

#[test]
fn gzip_container_is_decoded_before_splitting() {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(b"a\nb\n").unwrap();
    let gz_bytes = encoder.finish().unwrap();

    let store = InMemorySliceStore::new();
    let ids = SliceIdAllocator::new();
    let opts = UploadOptions { format: Format::Gzip, ..Default::default() };
    let count = upload(&store, &ids, Cursor::new(gz_bytes), &opts).unwrap();
    assert_eq!(count, 2);
    assert_eq!(records_of(&store), vec!["a".to_string(), "b".to_string()]);
}
