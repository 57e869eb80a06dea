// SPDX-License-Identifier: MIT

//! Centralized environment-variable access for the daemon binary (§10.3).

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Resolve the daemon's state directory: `STRATUM_STATE_DIR` >
/// `XDG_STATE_HOME/stratum` > `~/.local/state/stratum`.
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("STRATUM_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("stratum"));
    }
    let home = dirs::home_dir().ok_or(LifecycleError::NoStateDir)?;
    Ok(home.join(".local/state/stratum"))
}

/// Path to the daemon's TOML config file, `STRATUM_CONFIG_PATH` or
/// `<state_dir>/config.toml`.
pub fn config_path(state_dir: &std::path::Path) -> PathBuf {
    std::env::var("STRATUM_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| state_dir.join("config.toml"))
}

/// Name this server process registers under; `STRATUM_SERVER_NAME` or a
/// `hostname-pid` fallback (§3.1 `Server.name`).
pub fn server_name() -> String {
    std::env::var("STRATUM_SERVER_NAME").unwrap_or_else(|_| {
        let host = hostname();
        format!("{host}-{}", std::process::id())
    })
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/proc/sys/kernel/hostname").ok().map(|s| s.trim().to_string()))
        .unwrap_or_else(|| "stratum".to_string())
}

/// How long a shutdown waits for in-flight slices to drain before the
/// process gives up waiting (it still exits cleanly; workers keep running
/// to completion cooperatively, this just bounds how long `main` blocks).
pub fn drain_timeout() -> Duration {
    std::env::var("STRATUM_DRAIN_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(30))
}
