// SPDX-License-Identifier: MIT

use super::*;
use stratum_core::ServerState;

fn server(name: &str) -> Server {
    Server::new(name, 10, 30, 1_000_000)
}

#[test]
fn upsert_then_find_round_trips() {
    let store = InMemoryServerStore::new();
    store.upsert(server("host-1:1"));
    let found = store.find("host-1:1").unwrap();
    assert_eq!(found.name, "host-1:1");
    assert_eq!(found.state, ServerState::Starting);
}

#[test]
fn upsert_replaces_by_name() {
    let store = InMemoryServerStore::new();
    store.upsert(server("host-1:1"));
    let mut replacement = server("host-1:1");
    replacement.state = ServerState::Running;
    store.upsert(replacement);

    assert_eq!(store.list().len(), 1);
    assert_eq!(store.find("host-1:1").unwrap().state, ServerState::Running);
}

#[test]
fn with_server_mut_applies_under_the_lock() {
    let store = InMemoryServerStore::new();
    store.upsert(server("host-1:1"));

    let result = store.with_server_mut("host-1:1", |s| {
        s.tick_heartbeat(2_000_000, 3);
        s.heartbeat.active_threads
    });

    assert_eq!(result, Some(3));
    assert_eq!(store.find("host-1:1").unwrap().heartbeat.active_threads, 3);
}

#[test]
fn with_server_mut_on_unknown_name_is_none() {
    let store = InMemoryServerStore::new();
    assert!(store.with_server_mut("ghost", |s| s.max_threads).is_none());
}

#[test]
fn remove_deletes_the_server() {
    let store = InMemoryServerStore::new();
    store.upsert(server("host-1:1"));
    assert!(store.remove("host-1:1").is_some());
    assert!(store.find("host-1:1").is_none());
}

#[test]
fn list_returns_all_servers() {
    let store = InMemoryServerStore::new();
    store.upsert(server("host-1:1"));
    store.upsert(server("host-2:1"));
    let mut names: Vec<_> = store.list().into_iter().map(|s| s.name).collect();
    names.sort();
    assert_eq!(names, vec!["host-1:1".to_string(), "host-2:1".to_string()]);
}
