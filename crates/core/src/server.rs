// SPDX-License-Identifier: MIT

//! Server entity: the persistent record a worker-pool process maintains
//! about itself (§3.1 `Server`, §3.3 lifecycle, §4.7).

use serde::{Deserialize, Serialize};

/// Server lifecycle state (§3.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerState {
    Starting,
    Running,
    Paused,
    Stopping,
}

crate::simple_display! {
    ServerState {
        Starting => "starting",
        Running => "running",
        Paused => "paused",
        Stopping => "stopping",
    }
}

/// Liveness record written on every supervisor tick (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub updated_at_epoch_ms: u64,
    pub active_threads: u32,
}

/// A worker-pool process, as tracked in the `servers` collection (§3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub name: String,
    pub state: ServerState,
    pub max_threads: u32,
    pub started_at_epoch_ms: u64,
    pub heartbeat: Heartbeat,
    pub re_check_seconds: u64,
}

impl Server {
    pub fn new(name: impl Into<String>, max_threads: u32, re_check_seconds: u64, now_epoch_ms: u64) -> Self {
        Self {
            name: name.into(),
            state: ServerState::Starting,
            max_threads,
            started_at_epoch_ms: now_epoch_ms,
            heartbeat: Heartbeat { updated_at_epoch_ms: now_epoch_ms, active_threads: 0 },
            re_check_seconds,
        }
    }

    /// A server is dead if its heartbeat is older than `3 * heartbeat_seconds`
    /// (§4.7 "Dead-server recovery").
    pub fn is_dead(&self, now_epoch_ms: u64, heartbeat_seconds: u64) -> bool {
        let max_age_ms = heartbeat_seconds.saturating_mul(3).saturating_mul(1000);
        now_epoch_ms.saturating_sub(self.heartbeat.updated_at_epoch_ms) > max_age_ms
    }

    pub fn tick_heartbeat(&mut self, now_epoch_ms: u64, active_threads: u32) {
        self.heartbeat = Heartbeat { updated_at_epoch_ms: now_epoch_ms, active_threads };
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
