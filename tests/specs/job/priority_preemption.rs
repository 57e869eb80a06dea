//! Scenario: a higher-priority job submitted after a lower-priority one is
//! still dispatched first — priority, not submission order, drives
//! `claim_next` (§4.6 Fairness / Ordering).

use std::time::Duration;

use stratum_core::{Clock, FakeClock, Job, JobConfig};
use stratum_storage::{InMemoryJobStore, JobStore};

#[test]
fn claim_next_prefers_the_highest_priority_runnable_job_regardless_of_submission_order() {
    let clock = FakeClock::new();
    let job_store = InMemoryJobStore::new();

    let background = JobConfig::builder("BackgroundReport").priority(80).build().expect("valid config");
    let background_id = background.id;
    job_store.insert(Job::new(background, &clock)).expect("fresh id");

    clock.advance(Duration::from_millis(5));

    let urgent = JobConfig::builder("UrgentAlert").priority(5).build().expect("valid config");
    let urgent_id = urgent.id;
    job_store.insert(Job::new(urgent, &clock)).expect("fresh id");

    let claimed = job_store.claim_next("server-a", clock.epoch_ms()).expect("a runnable job exists");
    assert_eq!(claimed.id, urgent_id, "the later, higher-priority job preempts the earlier one");

    let claimed_next = job_store.claim_next("server-a", clock.epoch_ms()).expect("a runnable job exists");
    assert_eq!(claimed_next.id, background_id);

    assert!(job_store.claim_next("server-a", clock.epoch_ms()).is_none(), "nothing left to dispatch");
}

#[test]
fn equal_priority_jobs_are_claimed_in_submission_order() {
    let clock = FakeClock::new();
    let job_store = InMemoryJobStore::new();

    let first = JobConfig::builder("ReportA").priority(50).build().expect("valid config");
    let first_id = first.id;
    job_store.insert(Job::new(first, &clock)).expect("fresh id");

    clock.advance(Duration::from_millis(1));

    let second = JobConfig::builder("ReportB").priority(50).build().expect("valid config");
    let second_id = second.id;
    job_store.insert(Job::new(second, &clock)).expect("fresh id");

    let claimed = job_store.claim_next("server-a", clock.epoch_ms()).expect("a runnable job exists");
    assert_eq!(claimed.id, first_id);

    let claimed_next = job_store.claim_next("server-a", clock.epoch_ms()).expect("a runnable job exists");
    assert_eq!(claimed_next.id, second_id);
}
