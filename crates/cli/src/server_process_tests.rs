// SPDX-License-Identifier: MIT

use serial_test::serial;
use tempfile::TempDir;

use super::*;

#[test]
#[serial]
fn stop_with_no_pid_file_reports_not_running() {
    let dir = TempDir::new().unwrap();
    std::env::set_var("STRATUM_STATE_DIR", dir.path());
    let result = stop().unwrap();
    std::env::remove_var("STRATUM_STATE_DIR");
    assert!(!result);
}

#[test]
#[serial]
fn stop_with_a_pid_for_a_dead_process_reports_not_running() {
    let dir = TempDir::new().unwrap();
    std::env::set_var("STRATUM_STATE_DIR", dir.path());
    // pid 999999 is extremely unlikely to be alive in any test sandbox.
    std::fs::write(dir.path().join("daemon.pid"), "999999").unwrap();
    let result = stop().unwrap();
    std::env::remove_var("STRATUM_STATE_DIR");
    assert!(!result);
}

#[test]
#[serial]
fn stop_with_a_malformed_pid_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    std::env::set_var("STRATUM_STATE_DIR", dir.path());
    std::fs::write(dir.path().join("daemon.pid"), "not-a-pid").unwrap();
    let err = stop().unwrap_err();
    std::env::remove_var("STRATUM_STATE_DIR");
    assert!(matches!(err, ProcessError::MalformedPidFile(_)));
}
