// SPDX-License-Identifier: MIT

//! `stratumd`: the Stratum server process (§10.5 CLI surface, "A `server`
//! command starts a supervisor process").

use std::sync::Arc;

use stratum_daemon::{lifecycle, listener, logging};
use stratum_engine::ShutdownFlag;
use tokio::net::UnixListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("stratumd: {err}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let paths = lifecycle::Paths::resolve()?;
    let daemon = Arc::new(lifecycle::Daemon::startup(paths)?);
    let _log_guard = logging::init(&daemon.paths.log_dir, &daemon.config.log_level);

    if daemon.paths.socket_path.exists() {
        std::fs::remove_file(&daemon.paths.socket_path)?;
    }
    let unix_listener = UnixListener::bind(&daemon.paths.socket_path)
        .map_err(|e| lifecycle::LifecycleError::BindFailed(daemon.paths.socket_path.clone(), e))?;
    info!(socket = %daemon.paths.socket_path.display(), "listening");

    let listener_daemon = daemon.clone();
    let listener_task = tokio::spawn(async move { listener::run(unix_listener, listener_daemon).await });

    let shutdown = ShutdownFlag::new();
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM"),
            _ = sigint.recv() => info!("received SIGINT"),
        }
        signal_shutdown.trigger();
    });

    let supervisor = daemon.supervisor();
    supervisor.run(shutdown).await;

    listener_task.abort();
    if let Err(err) = listener_task.await {
        if !err.is_cancelled() {
            error!(error = %err, "listener task exited unexpectedly");
        }
    }

    info!("stratumd shut down cleanly");
    Ok(())
}
