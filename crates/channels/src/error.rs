// SPDX-License-Identifier: MIT

//! Channel-boundary errors (§7, §8 boundary behaviors).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// §8: "Stream without delimiter and larger than bufferSize ⇒ fails
    /// with MalformedData" — a single record grew past one buffer's worth
    /// without the delimiter ever appearing.
    #[error("record exceeds the {0}-byte read buffer without a delimiter")]
    MalformedData(usize),

    #[error("zip archive is empty or its first entry could not be read: {0}")]
    ZipEntry(String),

    /// §4.3 `download`: "Refuses to run if the job is not in terminal
    /// completed state."
    #[error("cannot download from a job that has not completed")]
    JobNotCompleted,
}
