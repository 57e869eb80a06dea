// SPDX-License-Identifier: MIT

//! Unix-socket IPC listener (§10.5): accepts `stratum-wire` framed
//! [`Request`]s and answers against the shared in-memory stores.

use std::sync::Arc;

use stratum_codec::CodecOptions;
use stratum_core::{build_status, Clock, Job, JobConfig, JobId, JobKind, SlicedJobData, SystemClock};
use stratum_storage::{JobStore, ServerStore, SliceStore};
use stratum_wire::{JobSubmission, JobSummary, Request, Response, ServerView};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, warn};

use crate::lifecycle::Daemon;

/// Runs until the listener socket is closed (on daemon shutdown, the
/// accept loop is simply dropped along with the listener task).
pub async fn run(listener: UnixListener, daemon: Arc<Daemon>) {
    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                let daemon = daemon.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_connection(stream, &daemon).await {
                        debug!(error = %err, "connection closed");
                    }
                });
            }
            Err(err) => error!(error = %err, "accept error"),
        }
    }
}

async fn handle_connection(mut stream: UnixStream, daemon: &Daemon) -> Result<(), stratum_wire::ProtocolError> {
    let request = stratum_wire::read_request(&mut stream).await?;
    let response = handle_request(daemon, request);
    stratum_wire::write_response(&mut stream, &response).await
}

fn handle_request(daemon: &Daemon, request: Request) -> Response {
    match request {
        Request::Ping => Response::Pong,
        Request::SubmitJob { submission } => submit_job(daemon, submission),
        Request::JobStatus { id } => job_status(daemon, &id),
        Request::ListJobs => Response::Jobs { jobs: daemon.job_store.list().iter().map(JobSummary::from).collect() },
        Request::RetryJob { id } => retry_job(daemon, &id),
        Request::AbortJob { id } => {
            let clock = SystemClock;
            transition(daemon, &id, |j| j.abort(&clock))
        }
        Request::PauseJob { id } => {
            let clock = SystemClock;
            transition(daemon, &id, |j| j.pause(&clock))
        }
        Request::ResumeJob { id } => transition(daemon, &id, |j| j.resume()),
        Request::ServerStatus => server_status(daemon),
    }
}

fn submit_job(daemon: &Daemon, submission: JobSubmission) -> Response {
    let kind = match &submission.sliced {
        Some(sliced) => JobKind::Sliced(SlicedJobData {
            sub_state: None,
            compress: sliced.compress,
            encrypt: sliced.encrypt,
            slice_size: sliced.slice_size,
            record_count: 0,
            max_active_workers: sliced.max_active_workers,
            collect_nil_output: sliced.collect_nil_output,
            ..Default::default()
        }),
        None => JobKind::Singleton,
    };

    let mut builder = JobConfig::builder(submission.class_name)
        .perform_method(submission.perform_method)
        .arguments(submission.arguments)
        .priority(submission.priority)
        .kind(kind)
        .collect_output(submission.collect_output)
        .destroy_on_complete(submission.destroy_on_complete)
        .repeatable(submission.repeatable);
    if let Some(t) = submission.run_at_epoch_ms {
        builder = builder.run_at_epoch_ms(t);
    }
    if let Some(t) = submission.expires_at_epoch_ms {
        builder = builder.expires_at_epoch_ms(t);
    }
    if let Some(group) = submission.group {
        builder = builder.group(group);
    }

    let config = match builder.build() {
        Ok(config) => config,
        Err(err) => return Response::Error { message: err.to_string() },
    };

    let clock = SystemClock;
    let job = Job::new(config, &clock);
    let id = job.id;
    match daemon.job_store.insert(job) {
        Ok(()) => Response::JobSubmitted { id: id.to_string() },
        Err(err) => Response::Error { message: err.to_string() },
    }
}

fn job_status(daemon: &Daemon, id: &str) -> Response {
    let job_id = JobId::from_string(id);
    let Some(job) = daemon.job_store.find(job_id) else {
        return Response::Error { message: format!("no such job: {id}") };
    };

    let now = SystemClock.epoch_ms();
    let (queued, active, failed, output, record_count) = match job.kind.sliced() {
        Some(data) => {
            let options = CodecOptions { compress: data.compress, encrypt: data.encrypt };
            let stores = daemon.slice_stores.stores_for(job.id, options, &daemon.codec_keyring);
            (
                stores.input.queued_count(),
                stores.input.active_count(),
                stores.input.failed_count(),
                stores.output.count(),
                data.record_count,
            )
        }
        None => (0, 0, 0, 0, 0),
    };

    let status = build_status(&job, now, queued, active, failed, output, record_count);
    Response::JobStatus { status }
}

fn transition(daemon: &Daemon, id: &str, f: impl FnOnce(&mut Job) -> Result<(), stratum_core::IllegalTransition>) -> Response {
    let job_id = JobId::from_string(id);
    match daemon.job_store.with_job_mut(job_id, f) {
        Some(Ok(())) => Response::Ack,
        Some(Err(err)) => Response::Error { message: err.to_string() },
        None => Response::Error { message: format!("no such job: {id}") },
    }
}

/// `job retry` (§4.4): the `failed -> running` CAS plus its
/// `requeueFailed` side effect on the input slice collection.
fn retry_job(daemon: &Daemon, id: &str) -> Response {
    let job_id = JobId::from_string(id);
    match daemon.job_store.with_job_mut(job_id, |j| j.retry()) {
        Some(Ok(())) => {
            if let Some(job) = daemon.job_store.find(job_id) {
                requeue_failed_slices(daemon, &job);
            }
            Response::Ack
        }
        Some(Err(err)) => Response::Error { message: err.to_string() },
        None => Response::Error { message: format!("no such job: {id}") },
    }
}

fn server_status(daemon: &Daemon) -> Response {
    let now = SystemClock.epoch_ms();
    let servers = daemon.server_store.list().iter().map(|s| ServerView::from_server(s, now)).collect();
    Response::Servers { servers }
}

/// `job retry`'s (§4.4) `requeueFailed` side effect on the input slice
/// collection, which `Job::retry` itself does not perform since slice
/// bookkeeping is out of `stratum-core`'s scope.
fn requeue_failed_slices(daemon: &Daemon, job: &Job) {
    if let Some(data) = job.kind.sliced() {
        let options = CodecOptions { compress: data.compress, encrypt: data.encrypt };
        let stores = daemon.slice_stores.stores_for(job.id, options, &daemon.codec_keyring);
        let requeued = stores.input.requeue_failed();
        if requeued > 0 {
            warn!(job_id = %job.id, requeued, "requeued failed slices for retry");
        }
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
