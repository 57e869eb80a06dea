//! Scenario: a server whose heartbeat has gone stale for `3 *
//! heartbeatSeconds` is treated as dead, and its in-flight work is recovered
//! — a running singleton job goes back to `queued`, and a sliced job's
//! `running` slices are requeued (§4.7 "Dead-server recovery").

use std::sync::Arc;
use std::time::Duration;

use stratum_codec::{CodecKeyring, CodecOptions};
use stratum_core::{Clock, FakeClock, Job, JobConfig, JobState, Server, ServerState, Slice, SliceId, SlicedJobData};
use stratum_engine::recover_dead_servers;
use stratum_storage::{InMemoryJobStore, InMemoryServerStore, JobStore, ServerStore, SliceStore, SliceStoreRegistry};

#[test]
fn a_dead_servers_running_jobs_are_recovered_on_the_next_check() {
    let clock = FakeClock::new();
    let job_store = InMemoryJobStore::new();
    let server_store = InMemoryServerStore::new();
    let slice_stores = SliceStoreRegistry::new();
    let keyring = Arc::new(CodecKeyring::random());
    let heartbeat = Duration::from_secs(10);

    let mut server = Server::new("dead-server", 4, heartbeat.as_secs(), clock.epoch_ms());
    server.state = ServerState::Running;
    server_store.upsert(server);

    let singleton_cfg = JobConfig::builder("Report").build().expect("valid config");
    let singleton_id = singleton_cfg.id;
    let mut singleton = Job::new(singleton_cfg, &clock);
    singleton.start("dead-server", &clock).expect("queued -> running");
    job_store.insert(singleton).expect("fresh id");

    let sliced_cfg = JobConfig::builder("BulkImport")
        .sliced(SlicedJobData { record_count: 10, ..Default::default() })
        .build()
        .expect("valid config");
    let sliced_id = sliced_cfg.id;
    let mut sliced_job = Job::new(sliced_cfg, &clock);
    sliced_job.start("dead-server", &clock).expect("queued -> running");
    job_store.insert(sliced_job).expect("fresh id");

    let stores = slice_stores.stores_for(sliced_id, CodecOptions::NONE, &keyring);
    stores.input.insert(Slice::new(SliceId::new(0), vec![serde_json::json!("a")])).expect("fresh id");
    stores.input.next_slice("dead-server", clock.epoch_ms()).expect("one queued slice to claim");
    assert_eq!(stores.input.active_count(), 1);

    // Heartbeat has not gone stale yet: recovery is a no-op.
    recover_dead_servers(&job_store, &server_store, &slice_stores, &keyring, &clock, heartbeat);
    assert_eq!(job_store.find(singleton_id).expect("present").state, JobState::Running);

    clock.advance(heartbeat * 4);
    recover_dead_servers(&job_store, &server_store, &slice_stores, &keyring, &clock, heartbeat);

    let singleton = job_store.find(singleton_id).expect("present");
    assert_eq!(singleton.state, JobState::Queued);
    assert!(singleton.server_name.is_none());

    assert_eq!(stores.input.active_count(), 0);
    assert_eq!(stores.input.queued_count(), 1);
}
