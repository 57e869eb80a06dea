// SPDX-License-Identifier: MIT

use super::*;
use stratum_core::{FakeClock, JobBuilder};

#[test]
fn job_submission_deserializes_with_defaults() {
    let json = r#"{"class_name": "ReportJob"}"#;
    let submission: JobSubmission = serde_json::from_str(json).unwrap();
    assert_eq!(submission.perform_method, "perform");
    assert_eq!(submission.priority, 50);
    assert!(submission.sliced.is_none());
}

#[test]
fn sliced_submission_defaults_slice_size_to_one_hundred() {
    let json = r#"{"class_name": "ImportJob", "sliced": {}}"#;
    let submission: JobSubmission = serde_json::from_str(json).unwrap();
    let sliced = submission.sliced.unwrap();
    assert_eq!(sliced.slice_size, 100);
    assert!(!sliced.compress);
}

#[test]
fn job_summary_reflects_singleton_job() {
    let clock = FakeClock::new();
    let job = JobBuilder::new("ReportJob").priority(75).build(&clock);
    let summary = JobSummary::from(&job);
    assert_eq!(summary.class_name, "ReportJob");
    assert_eq!(summary.priority, 75);
    assert!(summary.sub_state.is_none());
}
