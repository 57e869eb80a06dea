// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! stratum-core: shared entities and state machines for the Stratum batch
//! scheduling engine — jobs, slices, servers, and process configuration.
//!
//! This crate owns only data and pure transition logic (§4.4, §4.7, §4.8 of
//! the design). Persistence, dispatch, and execution live in
//! `stratum-storage` and `stratum-engine`.

pub mod macros;

pub mod clock;
pub mod config;
pub mod id;
pub mod job;
pub mod server;
pub mod slice;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{Config, ConfigBuilder};
pub use id::{short, IdBuf};
#[cfg(any(test, feature = "test-support"))]
pub use job::JobBuilder;
pub use job::{
    build_status, retry_delay_seconds, Exception, IllegalTransition, Job, JobConfig,
    JobConfigBuilder, JobId, JobKind, JobState, JobStatus, SlicedJobData, SubState,
    ValidationError,
};
pub use server::{Heartbeat, Server, ServerState};
pub use slice::{Slice, SliceFailure, SliceId, SliceState};
