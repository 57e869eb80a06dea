// SPDX-License-Identifier: MIT

use super::*;
use serial_test::serial;
use tempfile::TempDir;

fn paths_in(dir: &TempDir) -> Paths {
    Paths {
        state_dir: dir.path().to_path_buf(),
        socket_path: dir.path().join("daemon.sock"),
        lock_path: dir.path().join("daemon.pid"),
        config_path: dir.path().join("config.toml"),
        log_dir: dir.path().join("logs"),
    }
}

#[test]
#[serial]
fn startup_creates_directories_and_writes_the_pid_file() {
    let dir = TempDir::new().unwrap();
    let daemon = Daemon::startup(paths_in(&dir)).unwrap();

    assert!(dir.path().join("logs").is_dir());
    let pid = std::fs::read_to_string(&daemon.paths.lock_path).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());
}

#[test]
#[serial]
fn a_second_startup_against_the_same_state_dir_fails_to_acquire_the_lock() {
    let dir = TempDir::new().unwrap();
    let _first = Daemon::startup(paths_in(&dir)).unwrap();

    let err = Daemon::startup(paths_in(&dir)).unwrap_err();
    assert!(matches!(err, LifecycleError::LockFailed(_)));
}

#[test]
#[serial]
fn startup_loads_config_from_the_state_dir_when_present() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("config.toml"), "max_worker_threads = 3\n").unwrap();

    let daemon = Daemon::startup(paths_in(&dir)).unwrap();
    assert_eq!(daemon.config.max_worker_threads, 3);
}

#[test]
#[serial]
fn dropping_the_daemon_removes_its_socket_file() {
    let dir = TempDir::new().unwrap();
    let daemon = Daemon::startup(paths_in(&dir)).unwrap();
    std::fs::write(&daemon.paths.socket_path, b"").unwrap();
    let socket_path = daemon.paths.socket_path.clone();
    drop(daemon);

    assert!(!socket_path.exists());
}
