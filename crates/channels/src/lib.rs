// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! stratum-channels: input/output channels for a sliced job's byte-stream
//! upload and download (§4.3 of the design).

pub mod download;
pub mod error;
pub mod format;
pub mod upload;

pub use download::{download, download_zip, DownloadOptions};
pub use error::ChannelError;
pub use format::Format;
pub use upload::{upload, upload_records, upload_slice, SliceIdAllocator, UploadOptions};
