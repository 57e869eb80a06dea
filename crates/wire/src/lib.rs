// SPDX-License-Identifier: MIT

//! IPC protocol between the `stratum` CLI and the daemon.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod request;
mod response;
mod types;
#[allow(clippy::module_inception)]
mod wire;

pub use request::Request;
pub use response::Response;
pub use types::{JobStatusView, JobSubmission, JobSummary, ServerView, SlicedSubmission};
pub use wire::{
    decode, encode, read_message, read_request, read_response, write_message, write_request, write_response,
    ProtocolError,
};

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;
