// SPDX-License-Identifier: MIT

//! Input channel: splits an uploaded byte stream (or a caller-supplied
//! record generator) into fixed-size slices (§4.3).

use crate::error::ChannelError;
use crate::format::Format;
use flate2::read::GzDecoder;
use serde_json::Value;
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicU64, Ordering};
use stratum_core::{Slice, SliceId};
use stratum_storage::SliceStore;

const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;
const DEFAULT_SLICE_SIZE: usize = 100;

/// §4.3 `upload(source, {format, delimiter, bufferSize, stripNonPrintable})`.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub format: Format,
    /// `None` triggers auto-detection of `\r\n`, `\r`, or `\n` (§4.3).
    pub delimiter: Option<Vec<u8>>,
    pub buffer_size: usize,
    pub strip_non_printable: bool,
    pub slice_size: usize,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            format: Format::Text,
            delimiter: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
            strip_non_printable: false,
            slice_size: DEFAULT_SLICE_SIZE,
        }
    }
}

/// Monotonic slice-id allocator scoped to one job's input collection (§3.1:
/// "monotonic within the job").
pub struct SliceIdAllocator(AtomicU64);

impl SliceIdAllocator {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn next(&self) -> SliceId {
        SliceId::new(self.0.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for SliceIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Read `source` (already decoded per `opts.format`), split on the
/// delimiter, batch into `opts.slice_size`-record slices, and insert each
/// batch into `store`. Returns the total record count (§4.3).
pub fn upload(
    store: &dyn SliceStore,
    ids: &SliceIdAllocator,
    source: impl Read,
    opts: &UploadOptions,
) -> Result<u64, ChannelError> {
    let mut record_count = 0u64;
    let decoded = decode_container(opts.format, source)?;
    stream_records(decoded, opts, |batch| {
        let slice = Slice::new(ids.next(), batch.into_iter().map(Value::String).collect());
        record_count += slice.len() as u64;
        // §5 "At-least-once": a duplicate id here means a retried upload
        // already wrote this batch; treat it as already done.
        if let Err(e) = store.insert(slice) {
            if !e.is_duplicate_key() {
                return Err(ChannelError::Io(std::io::Error::other(e.to_string())));
            }
        }
        Ok(())
    })?;
    Ok(record_count)
}

/// §4.3 `uploadRecords(generator)`: pull records from `next` until it
/// returns `None`, batch by `opts.slice_size`, insert.
pub fn upload_records(
    store: &dyn SliceStore,
    ids: &SliceIdAllocator,
    slice_size: usize,
    mut next: impl FnMut() -> Option<Value>,
) -> Result<u64, ChannelError> {
    let slice_size = slice_size.max(1);
    let mut batch = Vec::with_capacity(slice_size);
    let mut record_count = 0u64;
    while let Some(record) = next() {
        batch.push(record);
        record_count += 1;
        if batch.len() >= slice_size {
            upload_slice(store, ids, std::mem::take(&mut batch))?;
        }
    }
    if !batch.is_empty() {
        upload_slice(store, ids, batch)?;
    }
    Ok(record_count)
}

/// §4.3 `uploadSlice(records)`: write one slice as-is, caller-chosen size.
pub fn upload_slice(store: &dyn SliceStore, ids: &SliceIdAllocator, records: Vec<Value>) -> Result<(), ChannelError> {
    let slice = Slice::new(ids.next(), records);
    match store.insert(slice) {
        Ok(()) | Err(_) => Ok(()), // duplicate id: idempotent re-execution (§5)
    }
}

fn decode_container(format: Format, source: impl Read) -> Result<Box<dyn Read>, ChannelError> {
    match format {
        Format::Text => Ok(Box::new(source)),
        Format::Gzip => Ok(Box::new(GzDecoder::new(source))),
        Format::Zip => {
            let mut buf = Vec::new();
            let mut source = source;
            source.read_to_end(&mut buf)?;
            let mut archive = zip::ZipArchive::new(Cursor::new(buf)).map_err(|e| ChannelError::ZipEntry(e.to_string()))?;
            let mut entry = archive.by_index(0).map_err(|e| ChannelError::ZipEntry(e.to_string()))?;
            let mut out = Vec::new();
            entry.read_to_end(&mut out)?;
            Ok(Box::new(Cursor::new(out)))
        }
    }
}

/// The stream-parsing algorithm (§4.3): read `buffer_size` bytes at a time,
/// optionally strip non-printable bytes, cut complete lines out of a
/// rolling tail buffer, flush every `slice_size` lines, and flush any
/// non-empty tail once the stream is exhausted.
fn stream_records(
    mut reader: impl Read,
    opts: &UploadOptions,
    mut flush: impl FnMut(Vec<String>) -> Result<(), ChannelError>,
) -> Result<(), ChannelError> {
    let buffer_size = opts.buffer_size.max(1);
    let slice_size = opts.slice_size.max(1);
    let mut delimiter = opts.delimiter.clone();
    let mut pending: Vec<u8> = Vec::new();
    let mut batch: Vec<String> = Vec::new();
    let mut read_buf = vec![0u8; buffer_size];

    loop {
        let n = reader.read(&mut read_buf)?;
        if n == 0 {
            break;
        }
        if opts.strip_non_printable {
            pending.extend(read_buf[..n].iter().copied().filter(|&b| is_printable_or_newline(b)));
        } else {
            pending.extend_from_slice(&read_buf[..n]);
        }

        if delimiter.is_none() {
            delimiter = detect_delimiter(&pending);
        }

        if let Some(d) = &delimiter {
            while let Some(pos) = find_subslice(&pending, d) {
                let line = pending.drain(..pos + d.len()).take(pos).collect::<Vec<u8>>();
                batch.push(String::from_utf8_lossy(&line).into_owned());
                if batch.len() >= slice_size {
                    flush(std::mem::take(&mut batch))?;
                }
            }
        }

        if pending.len() > buffer_size {
            return Err(ChannelError::MalformedData(buffer_size));
        }
    }

    if !pending.is_empty() {
        batch.push(String::from_utf8_lossy(&pending).into_owned());
    }
    if !batch.is_empty() {
        flush(batch)?;
    }
    Ok(())
}

fn is_printable_or_newline(b: u8) -> bool {
    b == b'\n' || b == b'\r' || b == b'\t' || (0x20..0x7f).contains(&b)
}

/// Auto-detect `\r\n`, `\r`, or `\n`, preferring the earliest occurrence and
/// treating a lone `\r` immediately followed by `\n` as the two-byte form.
fn detect_delimiter(buf: &[u8]) -> Option<Vec<u8>> {
    for (i, &b) in buf.iter().enumerate() {
        if b == b'\r' {
            return Some(if buf.get(i + 1) == Some(&b'\n') { b"\r\n".to_vec() } else { b"\r".to_vec() });
        }
        if b == b'\n' {
            return Some(b"\n".to_vec());
        }
    }
    None
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
#[path = "upload_tests.rs"]
mod tests;
