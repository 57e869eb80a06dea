//! Scenario: a singleton job whose worker throws is transitioned to
//! `failed`, and a subsequent `retry` re-enters `running` and completes once
//! the underlying failure has cleared.

use std::sync::Arc;

use stratum_core::{FakeClock, Job, JobConfig, JobState};
use stratum_engine::{run_singleton, Worker, WorkerRegistry};
use stratum_storage::{InMemoryJobStore, JobStore};

use crate::support::FlakyWorker;

#[tokio::test]
async fn a_job_that_fails_then_succeeds_on_retry_completes() {
    let clock = FakeClock::new();
    let job_store = InMemoryJobStore::new();
    let registry = WorkerRegistry::new();

    let worker = FlakyWorker::new(1);
    registry.register("FlakyReport", {
        let worker = worker.clone();
        move || worker.clone() as Arc<dyn Worker>
    });

    let config = JobConfig::builder("FlakyReport").build().expect("valid config");
    let job_id = config.id;
    let mut job = Job::new(config, &clock);
    job.start("server-a", &clock).expect("queued -> running");
    job_store.insert(job).expect("fresh id");

    let outcome = run_singleton(&job_store, &registry, job_id, &clock).await;
    assert!(outcome.is_err(), "the first attempt should fail");

    let job = job_store.find(job_id).expect("job still present");
    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.failure_count, 1);
    assert!(job.exception.is_some());

    job_store
        .with_job_mut(job_id, |j| j.retry())
        .expect("job present")
        .expect("failed -> running is legal");

    run_singleton(&job_store, &registry, job_id, &clock).await.expect("retry should succeed");

    let job = job_store.find(job_id).expect("job still present");
    assert_eq!(job.state, JobState::Completed);
    assert_eq!(job.failure_count, 1, "retrying does not itself count as a new failure");
}
