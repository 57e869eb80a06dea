// SPDX-License-Identifier: MIT

use super::*;
use serial_test::serial;
use stratum_wire::SlicedSubmission;
use tempfile::TempDir;

fn test_daemon() -> (TempDir, Daemon) {
    let dir = TempDir::new().unwrap();
    let paths = crate::lifecycle::Paths {
        state_dir: dir.path().to_path_buf(),
        socket_path: dir.path().join("daemon.sock"),
        lock_path: dir.path().join("daemon.pid"),
        config_path: dir.path().join("config.toml"),
        log_dir: dir.path().join("logs"),
    };
    let daemon = Daemon::startup(paths).unwrap();
    (dir, daemon)
}

#[test]
#[serial]
fn ping_returns_pong() {
    let (_dir, daemon) = test_daemon();
    assert_eq!(handle_request(&daemon, Request::Ping), Response::Pong);
}

#[test]
#[serial]
fn submit_job_then_list_jobs_shows_it_queued() {
    let (_dir, daemon) = test_daemon();
    let submission = JobSubmission {
        class_name: "Echo".to_string(),
        perform_method: "perform".to_string(),
        arguments: vec![],
        priority: 50,
        run_at_epoch_ms: None,
        expires_at_epoch_ms: None,
        collect_output: false,
        destroy_on_complete: false,
        repeatable: true,
        group: None,
        sliced: None,
    };

    let response = handle_request(&daemon, Request::SubmitJob { submission });
    let Response::JobSubmitted { id } = response else { panic!("expected JobSubmitted") };

    let Response::Jobs { jobs } = handle_request(&daemon, Request::ListJobs) else { panic!("expected Jobs") };
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, id);
    assert_eq!(jobs[0].state, stratum_core::JobState::Queued);
}

#[test]
#[serial]
fn submit_sliced_job_records_the_sliced_kind() {
    let (_dir, daemon) = test_daemon();
    let submission = JobSubmission {
        class_name: "Bulk".to_string(),
        perform_method: "perform".to_string(),
        arguments: vec![],
        priority: 50,
        run_at_epoch_ms: None,
        expires_at_epoch_ms: None,
        collect_output: true,
        destroy_on_complete: false,
        repeatable: true,
        group: None,
        sliced: Some(SlicedSubmission {
            compress: false,
            encrypt: false,
            slice_size: 10,
            max_active_workers: Some(2),
            collect_nil_output: false,
        }),
    };

    let Response::JobSubmitted { id } = handle_request(&daemon, Request::SubmitJob { submission }) else {
        panic!("expected JobSubmitted")
    };
    let job = daemon.job_store.find(stratum_core::JobId::from_string(&id)).unwrap();
    assert!(job.is_sliced());
}

#[test]
#[serial]
fn job_status_for_an_unknown_id_is_an_error() {
    let (_dir, daemon) = test_daemon();
    let response = handle_request(&daemon, Request::JobStatus { id: "job-missing".to_string() });
    assert!(matches!(response, Response::Error { .. }));
}

#[test]
#[serial]
fn pause_then_resume_a_running_job() {
    let (_dir, daemon) = test_daemon();
    let job = stratum_core::JobBuilder::new("Echo").build(&stratum_core::SystemClock);
    let id = job.id;
    daemon.job_store.insert(job).unwrap();
    daemon.job_store.with_job_mut(id, |j| j.start("srv", &stratum_core::SystemClock)).unwrap().unwrap();

    let response = handle_request(&daemon, Request::PauseJob { id: id.to_string() });
    assert_eq!(response, Response::Ack);
    assert_eq!(daemon.job_store.find(id).unwrap().state, stratum_core::JobState::Paused);

    let response = handle_request(&daemon, Request::ResumeJob { id: id.to_string() });
    assert_eq!(response, Response::Ack);
    assert_eq!(daemon.job_store.find(id).unwrap().state, stratum_core::JobState::Running);
}

#[test]
#[serial]
fn server_status_lists_a_server_once_the_supervisor_upserts_it() {
    let (_dir, daemon) = test_daemon();
    daemon.server_store.upsert(stratum_core::Server::new(&daemon.server_name, 4, 30, 0));

    let Response::Servers { servers } = handle_request(&daemon, Request::ServerStatus) else {
        panic!("expected Servers")
    };
    assert_eq!(servers.len(), 1);
    assert_eq!(servers[0].name, daemon.server_name);
}
