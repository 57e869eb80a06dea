// SPDX-License-Identifier: MIT

//! `tracing-subscriber`/`tracing-appender` setup (§10.4): an `EnvFilter`
//! subscriber writing to a daily-rolling file under the server's state
//! directory, with `RUST_LOG` taking precedence over the config's
//! `log_level`.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Installs the process-wide subscriber. The returned [`WorkerGuard`] must
/// be held for the lifetime of the process — dropping it stops the
/// background flush thread and the last few log lines can be lost.
pub fn init(log_dir: &Path, default_level: &str) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(log_dir, "stratum-daemon.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).with_writer(non_blocking).with_ansi(false).init();

    guard
}
