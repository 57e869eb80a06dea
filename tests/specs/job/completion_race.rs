//! Scenario: two workers both finish what they believe is a sliced job's
//! last slice at the same time. Only one may win the `processing -> after`
//! transition and run the `after` hook / complete the job (§3.2 invariant 2,
//! §4.4 `evaluate_completion`).

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use stratum_core::{FakeClock, Job, JobConfig, JobState, SlicedJobData, SubState};
use stratum_engine::{run_sliced, ShutdownFlag, Worker, WorkerRegistry};
use stratum_storage::{InMemoryJobStore, JobStore, SlicedJobStores};

use crate::support::AfterCountingWorker;

#[tokio::test]
async fn two_workers_racing_the_drained_input_collection_only_run_after_once() {
    let clock = FakeClock::new();
    let job_store = InMemoryJobStore::new();
    let registry = WorkerRegistry::new();
    let after_calls = Arc::new(AtomicU32::new(0));

    registry.register("BulkImport", {
        let after_calls = after_calls.clone();
        move || AfterCountingWorker::new(after_calls.clone()) as Arc<dyn Worker>
    });

    let config = JobConfig::builder("BulkImport")
        .sliced(SlicedJobData { record_count: 0, ..Default::default() })
        .build()
        .expect("valid config");
    let job_id = config.id;
    let mut job = Job::new(config, &clock);
    job.start("server-a", &clock).expect("queued -> running");
    job_store.insert(job).expect("fresh id");
    // Both workers arrive after the `before` hook already ran.
    job_store
        .with_job_mut(job_id, |j| j.cas_sub_state(SubState::Before, SubState::Processing))
        .expect("job present");

    // Input collection already drained: both workers see "nothing left",
    // and race on who gets to finish the job.
    let stores = SlicedJobStores::in_memory();
    let shutdown = ShutdownFlag::new();
    let re_check = Duration::from_secs(5);

    let (first, second) = tokio::join!(
        run_sliced(&job_store, &registry, &stores, job_id, "server-a", &clock, &shutdown, re_check, false),
        run_sliced(&job_store, &registry, &stores, job_id, "server-a", &clock, &shutdown, re_check, false),
    );
    first.expect("no error");
    second.expect("no error");

    assert_eq!(after_calls.load(Ordering::SeqCst), 1, "after must run exactly once despite the race");
    assert_eq!(job_store.find(job_id).expect("present").state, JobState::Completed);
}
