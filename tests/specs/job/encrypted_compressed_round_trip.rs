//! Scenario: records uploaded into a compressed-and-encrypted slice
//! collection come back out byte-for-byte identical once processed and
//! downloaded — the codec wrapping is transparent to everything above the
//! store boundary (§4.1, §4.3).

use std::io::Cursor;
use std::sync::Arc;

use stratum_channels::{download, upload, DownloadOptions, SliceIdAllocator, UploadOptions};
use stratum_codec::{CodecKeyring, CodecOptions};
use stratum_core::JobState;
use stratum_storage::{SliceStore, SlicedJobStores};

#[test]
fn records_round_trip_through_a_compressed_and_encrypted_slice_store() {
    let keyring = Arc::new(CodecKeyring::random());
    let options = CodecOptions { compress: true, encrypt: true };
    let stores = SlicedJobStores::for_job(options, &keyring);

    let ids = SliceIdAllocator::new();
    let source = Cursor::new(b"line one\nline two\nline three\n".to_vec());
    let upload_opts = UploadOptions { slice_size: 2, ..Default::default() };
    let record_count = upload(&*stores.input, &ids, source, &upload_opts).expect("upload succeeds");
    assert_eq!(record_count, 3);
    assert_eq!(stores.input.count(), 2, "three records split into slices of two");

    // "Process" every slice by moving it from input to output unchanged.
    while let Some(slice) = stores.input.next_slice("server-a", 0) {
        stores.output.insert_derived(&slice, slice.records.clone());
        stores.input.remove(slice.id);
    }
    assert_eq!(stores.input.count(), 0);
    assert_eq!(stores.output.count(), 2);

    let mut downloaded = Vec::new();
    download(&*stores.output, JobState::Completed, &mut downloaded, &DownloadOptions::default()).expect("download succeeds");
    let text = String::from_utf8(downloaded).expect("utf8 output");
    assert_eq!(text, "line one\nline two\nline three\n");
}

#[test]
fn download_refuses_to_run_against_a_job_that_has_not_completed() {
    let keyring = Arc::new(CodecKeyring::random());
    let stores = SlicedJobStores::for_job(CodecOptions { compress: true, encrypt: true }, &keyring);

    let mut sink = Vec::new();
    let err = download(&*stores.output, JobState::Running, &mut sink, &DownloadOptions::default()).unwrap_err();
    assert!(matches!(err, stratum_channels::ChannelError::JobNotCompleted));
}
