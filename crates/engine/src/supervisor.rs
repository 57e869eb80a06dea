// SPDX-License-Identifier: MIT

//! Server supervisor (C9, §4.7): owns a bounded worker pool, emits
//! heartbeats, adjusts pool size, recovers dead-server slices, and shuts
//! down gracefully on signal.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use stratum_codec::{CodecKeyring, CodecOptions};
use stratum_core::{Clock, JobState, Server, ServerState};
use stratum_storage::{JobStore, ServerStore, SliceStoreRegistry};
use tracing::{error, info, warn};

use crate::dispatcher::{Dispatcher, ShutdownFlag};
use crate::job_runtime::run_singleton;
use crate::sliced_runtime::run_sliced;
use crate::worker::WorkerRegistry;

/// Tunables read from [`stratum_core::Config`] at startup and on every
/// `reload_every` heartbeat (§4.7, §10).
#[derive(Debug, Clone, Copy)]
pub struct SupervisorConfig {
    pub max_threads: u32,
    pub heartbeat: Duration,
    pub max_poll: Duration,
    pub re_check: Duration,
    pub inline_mode: bool,
    /// Heartbeats between config/thread-count reloads (§4.7 "every N
    /// heartbeats").
    pub reload_every: u32,
}

impl From<stratum_core::Config> for SupervisorConfig {
    fn from(config: stratum_core::Config) -> Self {
        Self {
            max_threads: config.max_worker_threads,
            heartbeat: Duration::from_secs(config.heartbeat_seconds),
            max_poll: Duration::from_secs(config.max_poll_seconds),
            re_check: Duration::from_secs(config.re_check_seconds),
            inline_mode: config.inline_mode,
            reload_every: config.reload_every_n_heartbeats,
        }
    }
}

/// Supervises one named worker-pool process (§3.1 `Server`, §4.7).
///
/// Generic over the store/clock types rather than `Arc<dyn ...>` because
/// [`JobStore`] and [`ServerStore`] are not object-safe (their CAS methods
/// are generic over the closure's return type).
pub struct Supervisor<J, S, C> {
    name: String,
    job_store: Arc<J>,
    server_store: Arc<S>,
    slice_stores: Arc<SliceStoreRegistry>,
    codec_keyring: Arc<CodecKeyring>,
    registry: WorkerRegistry,
    clock: C,
    config: SupervisorConfig,
    active_threads: Arc<AtomicU32>,
}

impl<J, S, C> Supervisor<J, S, C>
where
    J: JobStore + Send + Sync + 'static,
    S: ServerStore + Send + Sync + 'static,
    C: Clock + Clone + Send + Sync + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        job_store: Arc<J>,
        server_store: Arc<S>,
        slice_stores: Arc<SliceStoreRegistry>,
        codec_keyring: Arc<CodecKeyring>,
        registry: WorkerRegistry,
        clock: C,
        config: SupervisorConfig,
    ) -> Self {
        Self {
            name: name.into(),
            job_store,
            server_store,
            slice_stores,
            codec_keyring,
            registry,
            clock,
            config,
            active_threads: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Runs until `shutdown` is set, then waits for in-flight workers to
    /// finish their current slice (§4.7 "no forced preemption").
    pub async fn run(&self, shutdown: ShutdownFlag) {
        let re_check_secs = self.config.re_check.as_secs();
        self.server_store.upsert(Server::new(self.name.as_str(), self.config.max_threads, re_check_secs, self.clock.epoch_ms()));
        recover_dead_servers(
            &*self.job_store,
            &*self.server_store,
            &self.slice_stores,
            &self.codec_keyring,
            &self.clock,
            self.config.heartbeat,
        );
        self.server_store.with_server_mut(&self.name, |s| s.state = ServerState::Running);

        let mut handles: Vec<tokio::task::JoinHandle<()>> = Vec::new();
        let mut heartbeats = 0u32;

        loop {
            self.adjust_threads(&mut handles, &shutdown);

            if shutdown.is_set() && handles.is_empty() {
                break;
            }

            tokio::time::sleep(self.config.heartbeat).await;
            self.server_store.with_server_mut(&self.name, |s| {
                s.tick_heartbeat(self.clock.epoch_ms(), self.active_threads.load(Ordering::SeqCst))
            });

            heartbeats += 1;
            if heartbeats % self.config.reload_every.max(1) == 0 {
                handles.retain(|h| !h.is_finished());
            }

            if shutdown.is_set() {
                self.server_store.with_server_mut(&self.name, |s| s.state = ServerState::Stopping);
                for handle in handles.drain(..) {
                    let _ = handle.await;
                }
                break;
            }
        }

        info!(server = %self.name, "supervisor shut down cleanly");
    }

    /// `adjustThreads` (§4.7): reap finished workers, spawn
    /// `maxThreads - aliveCount` replacements.
    fn adjust_threads(&self, handles: &mut Vec<tokio::task::JoinHandle<()>>, shutdown: &ShutdownFlag) {
        handles.retain(|h| !h.is_finished());
        if shutdown.is_set() {
            return;
        }
        let deficit = self.config.max_threads.saturating_sub(handles.len() as u32);
        for _ in 0..deficit {
            handles.push(self.spawn_worker(shutdown.clone()));
        }
    }

    fn spawn_worker(&self, shutdown: ShutdownFlag) -> tokio::task::JoinHandle<()> {
        let job_store = self.job_store.clone();
        let slice_stores = self.slice_stores.clone();
        let codec_keyring = self.codec_keyring.clone();
        let registry = self.registry.clone();
        let clock = self.clock.clone();
        let server_name = self.name.clone();
        let max_poll = self.config.max_poll;
        let re_check = self.config.re_check;
        let inline_mode = self.config.inline_mode;
        let active_threads = self.active_threads.clone();

        tokio::spawn(async move {
            active_threads.fetch_add(1, Ordering::SeqCst);
            let dispatcher = Dispatcher::new(job_store.clone(), max_poll);

            loop {
                if shutdown.is_set() {
                    break;
                }
                let Some(job) = dispatcher.poll(&server_name, &clock, &shutdown).await else {
                    break;
                };

                let result = if job.is_sliced() {
                    let options = job
                        .kind
                        .sliced()
                        .map(|d| CodecOptions { compress: d.compress, encrypt: d.encrypt })
                        .unwrap_or(CodecOptions::NONE);
                    let stores = slice_stores.stores_for(job.id, options, &codec_keyring);
                    run_sliced(&*job_store, &registry, &stores, job.id, &server_name, &clock, &shutdown, re_check, inline_mode).await
                } else {
                    run_singleton(&*job_store, &registry, job.id, &clock).await
                };

                if let Err(err) = result {
                    // §4.7: "an uncaught worker exception is logged fatally
                    // but does not kill the process" — the job itself was
                    // already transitioned to `failed` by the runtime.
                    error!(job_id = %job.id, server = %server_name, error = %err, "worker exception");
                }
            }

            active_threads.fetch_sub(1, Ordering::SeqCst);
        })
    }
}

/// Dead-server recovery (§4.7): on startup, any server whose heartbeat is
/// older than `3 * heartbeatSeconds` is considered dead. Its sliced jobs'
/// running slices are requeued; its running singleton jobs go back to
/// `queued`.
pub fn recover_dead_servers<J: JobStore, S: ServerStore, C: Clock>(
    job_store: &J,
    server_store: &S,
    slice_stores: &SliceStoreRegistry,
    codec_keyring: &Arc<CodecKeyring>,
    clock: &C,
    heartbeat: Duration,
) {
    let heartbeat_seconds = heartbeat.as_secs().max(1);
    let now = clock.epoch_ms();

    for server in server_store.list() {
        if !server.is_dead(now, heartbeat_seconds) {
            continue;
        }
        warn!(server = %server.name, "recovering slices owned by dead server");

        for job in job_store.list() {
            if job.state != JobState::Running || job.server_name.as_deref() != Some(server.name.as_str()) {
                continue;
            }
            if job.is_sliced() {
                let options = job
                    .kind
                    .sliced()
                    .map(|d| CodecOptions { compress: d.compress, encrypt: d.encrypt })
                    .unwrap_or(CodecOptions::NONE);
                let stores = slice_stores.stores_for(job.id, options, codec_keyring);
                let _ = stores.input.requeue_running(&server.name);
            } else {
                job_store.with_job_mut(job.id, |j| {
                    j.state = JobState::Queued;
                    j.server_name = None;
                });
            }
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
