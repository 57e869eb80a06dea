// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! stratum-engine: worker runtime (C7), dispatcher (C8), job/sliced-job
//! execution (§4.4), and the server supervisor (C9, §4.7).

pub mod backoff;
pub mod dispatcher;
pub mod error;
pub mod job_runtime;
pub mod sliced_runtime;
pub mod supervisor;
pub mod worker;

pub use backoff::Backoff;
pub use dispatcher::{Dispatcher, ShutdownFlag};
pub use error::{EngineError, WorkerError};
pub use job_runtime::run_singleton;
pub use sliced_runtime::run_sliced;
pub use supervisor::{recover_dead_servers, Supervisor, SupervisorConfig};
pub use worker::{Worker, WorkerRegistry};
