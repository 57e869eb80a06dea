// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! stratum-daemon: the `stratumd` server process — startup/lifecycle,
//! Unix-socket IPC listener, and logging setup (§10).

pub mod env;
pub mod lifecycle;
pub mod listener;
pub mod logging;
