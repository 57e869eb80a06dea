//! Scenario: `maxActiveWorkers` bounds how many slices of one sliced job may
//! be processed concurrently, even when more worker threads are available
//! and racing to claim them (§3.1 `SlicedJob.maxActiveWorkers`, §4.4).

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use stratum_core::{FakeClock, Job, JobConfig, Slice, SliceId, SlicedJobData, SubState};
use stratum_engine::{run_sliced, ShutdownFlag, Worker, WorkerRegistry};
use stratum_storage::{InMemoryJobStore, JobStore, SliceStore, SlicedJobStores};

use crate::support::ConcurrencyTrackingWorker;

#[tokio::test]
async fn max_active_workers_bounds_concurrent_slice_processing() {
    let clock = FakeClock::new();
    let job_store = InMemoryJobStore::new();
    let registry = WorkerRegistry::new();
    let active = Arc::new(AtomicU32::new(0));
    let peak = Arc::new(AtomicU32::new(0));

    registry.register("ThrottledBatch", {
        let active = active.clone();
        let peak = peak.clone();
        move || ConcurrencyTrackingWorker::new(active.clone(), peak.clone()) as Arc<dyn Worker>
    });

    let config = JobConfig::builder("ThrottledBatch")
        .sliced(SlicedJobData { max_active_workers: Some(2), record_count: 6, ..Default::default() })
        .build()
        .expect("valid config");
    let job_id = config.id;
    let mut job = Job::new(config, &clock);
    job.start("server-a", &clock).expect("queued -> running");
    job_store.insert(job).expect("fresh id");
    job_store
        .with_job_mut(job_id, |j| j.cas_sub_state(SubState::Before, SubState::Processing))
        .expect("job present");

    let stores = SlicedJobStores::in_memory();
    for i in 0..6u64 {
        stores.input.insert(Slice::new(SliceId::new(i), vec![serde_json::json!(i)])).expect("fresh id");
    }

    let shutdown = ShutdownFlag::new();
    let re_check = Duration::from_secs(5);

    let (a, b, c) = tokio::join!(
        run_sliced(&job_store, &registry, &stores, job_id, "server-a", &clock, &shutdown, re_check, false),
        run_sliced(&job_store, &registry, &stores, job_id, "server-a", &clock, &shutdown, re_check, false),
        run_sliced(&job_store, &registry, &stores, job_id, "server-a", &clock, &shutdown, re_check, false),
    );
    a.expect("no error");
    b.expect("no error");
    c.expect("no error");

    assert!(
        peak.load(Ordering::SeqCst) <= 2,
        "peak concurrent slice processing ({}) exceeded max_active_workers",
        peak.load(Ordering::SeqCst)
    );
}
