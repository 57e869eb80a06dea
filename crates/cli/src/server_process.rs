// SPDX-License-Identifier: MIT

//! `stratum server start|stop` (§10.5): spawning and signaling the
//! `stratumd` process from the CLI binary.

use std::path::PathBuf;
use std::process::Command;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use stratum_daemon::lifecycle::Paths;

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("could not locate the stratumd binary next to stratum")]
    BinaryNotFound,

    #[error("failed to spawn stratumd: {0}")]
    Spawn(#[from] std::io::Error),

    #[error(transparent)]
    Paths(#[from] stratum_daemon::lifecycle::LifecycleError),

    #[error("no pid file at {0}; is stratumd running?")]
    NoPidFile(PathBuf),

    #[error("pid file at {0} does not contain a valid process id")]
    MalformedPidFile(PathBuf),

    #[error("failed to signal process {0}: {1}")]
    Signal(i32, nix::errno::Errno),
}

/// Launch `stratumd` in the background. Returns once the process has been
/// spawned; it does not wait for the socket to come up.
pub fn start_background() -> Result<(), ProcessError> {
    let binary = find_stratumd_binary()?;
    Command::new(binary).spawn()?;
    Ok(())
}

/// Run `stratumd` in the foreground, blocking until it exits.
pub fn start_foreground() -> Result<std::process::ExitStatus, ProcessError> {
    let binary = find_stratumd_binary()?;
    Ok(Command::new(binary).status()?)
}

/// Send SIGTERM to the running `stratumd`, read from its pid file. Returns
/// `Ok(true)` if a process was signaled, `Ok(false)` if nothing was running.
pub fn stop() -> Result<bool, ProcessError> {
    let paths = Paths::resolve()?;
    if !paths.lock_path.exists() {
        return Ok(false);
    }
    let contents = std::fs::read_to_string(&paths.lock_path).map_err(|_| ProcessError::NoPidFile(paths.lock_path.clone()))?;
    let pid: i32 =
        contents.trim().parse().map_err(|_| ProcessError::MalformedPidFile(paths.lock_path.clone()))?;

    match signal::kill(Pid::from_raw(pid), Signal::SIGTERM) {
        Ok(()) => Ok(true),
        Err(nix::errno::Errno::ESRCH) => Ok(false),
        Err(err) => Err(ProcessError::Signal(pid, err)),
    }
}

fn find_stratumd_binary() -> Result<PathBuf, ProcessError> {
    let current_exe = std::env::current_exe().ok();
    if let Some(dir) = current_exe.as_ref().and_then(|p| p.parent()) {
        let sibling = dir.join("stratumd");
        if sibling.exists() {
            return Ok(sibling);
        }
    }
    if let Ok(path) = std::env::var("STRATUMD_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Ok(path);
        }
    }
    Err(ProcessError::BinaryNotFound)
}

#[cfg(test)]
#[path = "server_process_tests.rs"]
mod tests;
