// SPDX-License-Identifier: MIT

//! Daemon startup and shared process state (§4.7, §10.3).
//!
//! There is no WAL or snapshot to replay here: the document store itself is
//! out of this system's scope (§1 "Out of scope"), and the in-memory
//! reference stores this binary uses are not persisted across restarts.
//! Startup is therefore just: acquire the lock, load config, build the
//! stores, and recover any slices/jobs left behind by a server this process
//! is taking over for (same state directory, dead heartbeat).

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use fs2::FileExt;
use stratum_core::{Config, SystemClock};
use stratum_engine::{recover_dead_servers, Supervisor, SupervisorConfig, WorkerRegistry};
use stratum_storage::{InMemoryJobStore, InMemoryServerStore, SliceStoreRegistry};
use thiserror::Error;
use tracing::{info, warn};

use crate::env;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] stratum_core::config::ConfigError),
}

/// Filesystem paths the daemon owns under its state directory.
#[derive(Debug, Clone)]
pub struct Paths {
    pub state_dir: PathBuf,
    pub socket_path: PathBuf,
    pub lock_path: PathBuf,
    pub config_path: PathBuf,
    pub log_dir: PathBuf,
}

impl Paths {
    pub fn resolve() -> Result<Self, LifecycleError> {
        let state_dir = env::state_dir()?;
        Ok(Self {
            socket_path: state_dir.join("daemon.sock"),
            lock_path: state_dir.join("daemon.pid"),
            config_path: env::config_path(&state_dir),
            log_dir: state_dir.join("logs"),
            state_dir,
        })
    }
}

/// Load the effective config for a state directory: the TOML file if
/// present, `Config::default()` otherwise, with `STRATUM_*` env overrides
/// applied on top (§10.3 `stratum config show`).
pub fn load_effective_config(paths: &Paths) -> Result<Config, LifecycleError> {
    let config =
        if paths.config_path.exists() { Config::load_from_file(&paths.config_path)? } else { Config::default() };
    Ok(config.apply_env_overrides()?)
}

/// Everything the listener and supervisor share for the lifetime of the
/// process (§3.1 `Server`, §6 in-memory store handles).
pub struct Daemon {
    pub paths: Paths,
    pub server_name: String,
    pub job_store: Arc<InMemoryJobStore>,
    pub server_store: Arc<InMemoryServerStore>,
    pub slice_stores: Arc<SliceStoreRegistry>,
    pub codec_keyring: Arc<stratum_codec::CodecKeyring>,
    pub registry: WorkerRegistry,
    pub config: Config,
    _lock_file: File,
}

impl Daemon {
    /// Acquire the lock, create directories, load config, and recover any
    /// slices/jobs left running by a dead server under this state
    /// directory (§4.7 "Dead-server recovery" — run once at startup in
    /// addition to the supervisor's own check before it enters the run
    /// loop, since a fresh process has no heartbeat history of its own).
    pub fn startup(paths: Paths) -> Result<Self, LifecycleError> {
        std::fs::create_dir_all(&paths.state_dir)?;
        std::fs::create_dir_all(&paths.log_dir)?;

        let lock_file =
            std::fs::OpenOptions::new().write(true).create(true).truncate(false).open(&paths.lock_path)?;
        lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;
        {
            use std::io::Write;
            let mut lock_file = &lock_file;
            lock_file.set_len(0)?;
            writeln!(lock_file, "{}", std::process::id())?;
        }

        let config = load_effective_config(&paths)?;

        let job_store = Arc::new(InMemoryJobStore::new());
        let server_store = Arc::new(InMemoryServerStore::new());
        let slice_stores = Arc::new(SliceStoreRegistry::default());
        let codec_keyring = Arc::new(stratum_codec::CodecKeyring::default());
        let registry = WorkerRegistry::new();
        let server_name = env::server_name();

        let clock = SystemClock;
        recover_dead_servers(
            &*job_store,
            &*server_store,
            &slice_stores,
            &codec_keyring,
            &clock,
            std::time::Duration::from_secs(config.heartbeat_seconds),
        );
        info!(server = %server_name, state_dir = %paths.state_dir.display(), "daemon starting");

        Ok(Self {
            paths,
            server_name,
            job_store,
            server_store,
            slice_stores,
            codec_keyring,
            registry,
            config,
            _lock_file: lock_file,
        })
    }

    pub fn supervisor(&self) -> Supervisor<InMemoryJobStore, InMemoryServerStore, SystemClock> {
        Supervisor::new(
            self.server_name.clone(),
            self.job_store.clone(),
            self.server_store.clone(),
            self.slice_stores.clone(),
            self.codec_keyring.clone(),
            self.registry.clone(),
            SystemClock,
            SupervisorConfig::from(self.config.clone()),
        )
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        if std::fs::remove_file(&self.paths.socket_path).is_err() {
            warn!(path = %self.paths.socket_path.display(), "failed to remove socket on shutdown");
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
