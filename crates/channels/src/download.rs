// SPDX-License-Identifier: MIT

//! Output channel: write a job's output slices to a byte sink in ascending
//! `id` order (§4.3 `download`).

use crate::error::ChannelError;
use crate::format::Format;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Seek, Write};
use stratum_core::JobState;
use stratum_storage::SliceStore;

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub format: Format,
    pub delimiter: Vec<u8>,
    /// Name of the single entry written inside a zip container.
    pub zip_filename: String,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self { format: Format::Text, delimiter: b"\n".to_vec(), zip_filename: "output.txt".to_string() }
    }
}

/// §4.3: "Refuses to run if the job is not in terminal *completed* state."
/// Enumerates `store`'s slices ascending by id and writes
/// `records.join(delimiter) + delimiter` per slice to `sink`.
pub fn download(
    store: &dyn SliceStore,
    job_state: JobState,
    sink: impl Write,
    opts: &DownloadOptions,
) -> Result<(), ChannelError> {
    if job_state != JobState::Completed {
        return Err(ChannelError::JobNotCompleted);
    }

    match opts.format {
        Format::Text => write_lines(store, sink, &opts.delimiter),
        Format::Gzip => {
            let mut encoder = GzEncoder::new(sink, Compression::default());
            write_lines(store, &mut encoder, &opts.delimiter)?;
            encoder.finish()?;
            Ok(())
        }
        Format::Zip => {
            // A generic `Write` sink isn't necessarily seekable, and the zip
            // format needs to seek back to patch its central directory
            // (§4.3: "spools to a temp file for non-seekable sinks").
            let mut spool = tempfile::tempfile()?;
            download_zip(store, job_state, &mut spool, opts)?;
            spool.rewind()?;
            std::io::copy(&mut spool, &mut sink)?;
            Ok(())
        }
    }
}

/// Zip needs a seekable sink (§4.3: "spools to a temp file for non-seekable
/// sinks"); callers with a seekable sink (e.g. a `File`) call this instead
/// of [`download`].
pub fn download_zip(
    store: &dyn SliceStore,
    job_state: JobState,
    sink: impl Write + Seek,
    opts: &DownloadOptions,
) -> Result<(), ChannelError> {
    if job_state != JobState::Completed {
        return Err(ChannelError::JobNotCompleted);
    }
    let mut writer = zip::ZipWriter::new(sink);
    let options = zip::write::SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    writer.start_file(opts.zip_filename.clone(), options).map_err(|e| ChannelError::ZipEntry(e.to_string()))?;
    write_lines(store, &mut writer, &opts.delimiter)?;
    writer.finish().map_err(|e| ChannelError::ZipEntry(e.to_string()))?;
    Ok(())
}

fn write_lines(store: &dyn SliceStore, mut sink: impl Write, delimiter: &[u8]) -> Result<(), ChannelError> {
    for slice in store.all_ascending() {
        for record in &slice.records {
            let text = record.as_str().map(str::to_string).unwrap_or_else(|| record.to_string());
            sink.write_all(text.as_bytes())?;
            sink.write_all(delimiter)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "download_tests.rs"]
mod tests;
