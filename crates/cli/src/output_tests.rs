// SPDX-License-Identifier: MIT

use stratum_core::{JobState, JobStatus, ServerState};
use stratum_wire::{JobSummary, ServerView};

use super::*;

fn sample_job_summary() -> JobSummary {
    JobSummary {
        id: "job-1".to_string(),
        class_name: "ReportJob".to_string(),
        state: JobState::Running,
        sub_state: None,
        priority: 50,
        created_at_epoch_ms: 0,
    }
}

fn sample_job_status() -> JobStatus {
    JobStatus {
        id: "job-1".to_string(),
        state: JobState::Running,
        sub_state: None,
        elapsed_seconds: 12,
        percent_complete: 40,
        record_count: 100,
        queued_slices: 2,
        active_slices: 1,
        failed_slices: 0,
        output_slices: 3,
        records_per_hour: 120.0,
        estimated_remaining_minutes: Some(5),
    }
}

fn sample_server_view() -> ServerView {
    ServerView {
        name: "host-1".to_string(),
        state: ServerState::Running,
        max_threads: 4,
        active_threads: 2,
        started_at_epoch_ms: 0,
        heartbeat_age_seconds: 3,
    }
}

#[test]
fn print_job_list_text_does_not_error_on_an_empty_list() {
    assert!(print_job_list(OutputFormat::Text, &[]).is_ok());
}

#[test]
fn print_job_list_text_formats_a_row() {
    assert!(print_job_list(OutputFormat::Text, &[sample_job_summary()]).is_ok());
}

#[test]
fn print_job_list_json_is_valid_json() {
    assert!(print_job_list(OutputFormat::Json, &[sample_job_summary()]).is_ok());
}

#[test]
fn print_job_status_text_includes_sliced_fields_when_records_present() {
    assert!(print_job_status(OutputFormat::Text, &sample_job_status()).is_ok());
}

#[test]
fn print_job_status_json_is_valid_json() {
    assert!(print_job_status(OutputFormat::Json, &sample_job_status()).is_ok());
}

#[test]
fn print_server_list_text_does_not_error_on_an_empty_list() {
    assert!(print_server_list(OutputFormat::Text, &[]).is_ok());
}

#[test]
fn print_server_list_formats_a_row() {
    assert!(print_server_list(OutputFormat::Text, &[sample_server_view()]).is_ok());
    assert!(print_server_list(OutputFormat::Json, &[sample_server_view()]).is_ok());
}

#[test]
fn print_job_submitted_and_ack_do_not_error() {
    assert!(print_job_submitted(OutputFormat::Text, "job-1").is_ok());
    assert!(print_job_submitted(OutputFormat::Json, "job-1").is_ok());
    assert!(print_ack(OutputFormat::Text, "aborted", "job-1").is_ok());
    assert!(print_ack(OutputFormat::Json, "aborted", "job-1").is_ok());
}
