// SPDX-License-Identifier: MIT

//! The `servers` collection (§3.1 `Server`, §6 unique index `{name}`).

use parking_lot::Mutex;
use std::collections::HashMap;
use stratum_core::Server;

pub trait ServerStore: Send + Sync {
    /// Insert or replace by unique `name` (§6 unique index).
    fn upsert(&self, server: Server);
    fn find(&self, name: &str) -> Option<Server>;
    fn list(&self) -> Vec<Server>;
    fn remove(&self, name: &str) -> Option<Server>;
    fn with_server_mut<R>(&self, name: &str, f: impl FnOnce(&mut Server) -> R) -> Option<R>;
}

#[derive(Default)]
pub struct InMemoryServerStore {
    servers: Mutex<HashMap<String, Server>>,
}

impl InMemoryServerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ServerStore for InMemoryServerStore {
    fn upsert(&self, server: Server) {
        self.servers.lock().insert(server.name.clone(), server);
    }

    fn find(&self, name: &str) -> Option<Server> {
        self.servers.lock().get(name).cloned()
    }

    fn list(&self) -> Vec<Server> {
        self.servers.lock().values().cloned().collect()
    }

    fn remove(&self, name: &str) -> Option<Server> {
        self.servers.lock().remove(name)
    }

    fn with_server_mut<R>(&self, name: &str, f: impl FnOnce(&mut Server) -> R) -> Option<R> {
        let mut servers = self.servers.lock();
        servers.get_mut(name).map(f)
    }
}

impl std::fmt::Debug for InMemoryServerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryServerStore").field("count", &self.servers.lock().len()).finish()
    }
}

#[cfg(test)]
#[path = "server_store_tests.rs"]
mod tests;
