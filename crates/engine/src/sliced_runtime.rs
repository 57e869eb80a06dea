// SPDX-License-Identifier: MIT

//! `SlicedJob.work(server)` (§4.4): the before/processing/after loop over a
//! sliced job's input slices.

use std::time::{Duration, Instant};

use serde_json::Value;
use stratum_core::{Clock, Exception, Job, JobId, SubState};
use stratum_storage::{SliceStore, SlicedJobStores};
use tracing::{info, warn};

use crate::dispatcher::ShutdownFlag;
use crate::error::EngineError;
use crate::worker::{Worker, WorkerRegistry};

/// Drives one claimed sliced job through as many slices as it's entitled to
/// before yielding back to the dispatcher (§4.4 `SlicedJob.work`).
pub async fn run_sliced<J: stratum_storage::JobStore, C: Clock>(
    job_store: &J,
    registry: &WorkerRegistry,
    stores: &SlicedJobStores,
    job_id: JobId,
    server_name: &str,
    clock: &C,
    shutdown: &ShutdownFlag,
    re_check: Duration,
    inline_mode: bool,
) -> Result<(), EngineError> {
    let Some(job) = job_store.find(job_id) else {
        return Ok(());
    };
    let Some(worker) = registry.resolve(&job.class_name) else {
        let exception = Exception::new("WorkerNotRegistered", format!("no worker registered for {}", job.class_name));
        job_store.with_job_mut(job_id, |j| j.fail(exception, clock));
        return Err(EngineError::WorkerNotRegistered(job.class_name));
    };

    // 1. `before` hook, once, on the before -> processing transition.
    if job.sub_state() == Some(SubState::Before) {
        if let Err(err) = worker.before(&job.arguments).await {
            worker.on_exception(&err).await;
            let exception = Exception::new("WorkerError", err.message.clone());
            job_store.with_job_mut(job_id, |j| j.fail(exception, clock));
            return Err(err.into());
        }
        job_store.with_job_mut(job_id, |j| j.cas_sub_state(SubState::Before, SubState::Processing));
    }

    // 2. `after` hook re-run: a prior worker crashed between entering
    // `after` and completing. Re-run idempotently and finish.
    if job.sub_state() == Some(SubState::After) {
        return finish_after(job_store, &worker, job_id, &job.arguments, clock).await;
    }

    let max_active = job.kind.sliced().and_then(|d| d.max_active_workers);
    let loop_deadline = Instant::now() + re_check;

    loop {
        if shutdown.is_set() {
            return Ok(());
        }
        if let Some(limit) = max_active {
            if stores.input.active_count() >= u64::from(limit) {
                break;
            }
        }
        let Some(slice) = stores.input.next_slice(server_name, clock.epoch_ms()) else {
            break;
        };
        let records_in_slice = slice.records.len() as u64;

        let outcome = process_slice(&worker, &job, &stores.input, &stores.output, slice, inline_mode).await;
        // Whether the slice completed or failed, it left the queue
        // (§4.4 status projection): refresh `percent_complete` either way.
        job_store.with_job_mut(job_id, |j| j.record_slice_processed(records_in_slice));
        if let Err(err) = outcome {
            if inline_mode {
                return Err(err);
            }
        }

        if stores.input.failed_count() > 0 && stores.input.queued_count() == 0 && stores.input.active_count() == 0 {
            let exception = Exception::new("SliceFailure", "one or more slices failed and none remain queued");
            job_store.with_job_mut(job_id, |j| j.fail(exception, clock));
            warn!(job_id = %job_id, "sliced job failed: slices exhausted with failures outstanding");
            return Ok(());
        }

        if Instant::now() >= loop_deadline {
            // §4.6 "Preemption is cooperative": re-enter the dispatcher so a
            // higher-priority job gets a chance before more of this job's
            // slices are claimed.
            return Ok(());
        }
    }

    evaluate_completion(job_store, &worker, stores, job_id, clock).await
}

/// `processSlice(worker, slice)` (§4.4).
async fn process_slice(
    worker: &dyn Worker,
    job: &Job,
    input: &dyn SliceStore,
    output: &dyn SliceStore,
    mut slice: stratum_core::Slice,
    inline_mode: bool,
) -> Result<(), EngineError> {
    let mut results: Vec<Value> = Vec::with_capacity(slice.records.len());
    for (i, record) in slice.records.clone().iter().enumerate() {
        let record_number = (i + 1) as u32;
        match worker.perform_record(&job.arguments, record).await {
            Ok(value) => results.push(value.unwrap_or(Value::Null)),
            Err(err) => {
                worker.on_exception(&err).await;
                slice.failure(Exception::new("WorkerError", err.message.clone()), record_number);
                input.update(slice);
                if inline_mode {
                    return Err(err.into());
                }
                return Ok(());
            }
        }
    }

    let collect_nil = job.kind.sliced().map(|d| d.collect_nil_output).unwrap_or(false);
    if job.collect_output {
        let to_write = if collect_nil { results } else { results.into_iter().filter(|v| !v.is_null()).collect() };
        if collect_nil || !to_write.is_empty() {
            output.insert_derived(&slice, to_write);
        }
    }

    input.remove(slice.id);
    info!(job_id = %job.id, slice_id = %slice.id, "slice completed");
    Ok(())
}

/// Completion check (§4.4): once the input collection is drained, CAS
/// `processing -> after`; the winner runs `after` and completes the job.
async fn evaluate_completion<J: stratum_storage::JobStore, C: Clock>(
    job_store: &J,
    worker: &dyn Worker,
    stores: &SlicedJobStores,
    job_id: JobId,
    clock: &C,
) -> Result<(), EngineError> {
    if stores.input.count() > 0 {
        return Ok(());
    }

    let won = job_store.with_job_mut(job_id, |j| j.cas_sub_state(SubState::Processing, SubState::After));
    match won {
        Some(true) => {
            let Some(job) = job_store.find(job_id) else { return Ok(()) };
            finish_after(job_store, worker, job_id, &job.arguments, clock).await
        }
        Some(false) => {
            // Another worker already moved past `processing`, or the job
            // was aborted; drop our slice collections if so (§4.4).
            if let Some(job) = job_store.find(job_id) {
                if job.state == stratum_core::JobState::Aborted {
                    stores.drop_collections();
                }
            }
            Ok(())
        }
        None => Ok(()),
    }
}

async fn finish_after<J: stratum_storage::JobStore, C: Clock>(
    job_store: &J,
    worker: &dyn Worker,
    job_id: JobId,
    arguments: &[Value],
    clock: &C,
) -> Result<(), EngineError> {
    if let Err(err) = worker.after(arguments).await {
        worker.on_exception(&err).await;
        let exception = Exception::new("WorkerError", err.message.clone());
        job_store.with_job_mut(job_id, |j| j.fail(exception, clock));
        return Err(err.into());
    }
    job_store.with_job_mut(job_id, |j| j.complete(clock));
    info!(job_id = %job_id, "sliced job completed");
    Ok(())
}

#[cfg(test)]
#[path = "sliced_runtime_tests.rs"]
mod tests;
