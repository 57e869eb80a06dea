// SPDX-License-Identifier: MIT

//! Singleton `Job.work(server)` (§4.4).

use stratum_core::{Clock, Exception, JobId};
use stratum_storage::JobStore;
use tracing::{info, warn};

use crate::error::EngineError;
use crate::worker::WorkerRegistry;

/// Runs one already-claimed, `running` singleton job to completion: resolve
/// the worker, `before`, `perform`, capture output, `after`, then
/// `complete`. On any failure, records the exception and transitions the
/// job to `failed` instead of propagating (§4.4, §5).
pub async fn run_singleton<J: JobStore, C: Clock>(
    job_store: &J,
    registry: &WorkerRegistry,
    job_id: JobId,
    clock: &C,
) -> Result<(), EngineError> {
    let Some(job) = job_store.find(job_id) else {
        return Ok(());
    };

    let Some(worker) = registry.resolve(&job.class_name) else {
        let exception = Exception::new("WorkerNotRegistered", format!("no worker registered for {}", job.class_name));
        job_store.with_job_mut(job_id, |j| j.fail(exception, clock));
        return Err(EngineError::WorkerNotRegistered(job.class_name));
    };

    if let Err(err) = worker.before(&job.arguments).await {
        worker.on_exception(&err).await;
        let exception = Exception::new("WorkerError", err.message.clone());
        let _ = job_store.with_job_mut(job_id, |j| j.fail(exception, clock));
        return Err(err.into());
    }

    match worker.perform(&job.arguments).await {
        Ok(output) => {
            if job.collect_output {
                job_store.with_job_mut(job_id, |j| j.output = output);
            }
            if let Err(err) = worker.after(&job.arguments).await {
                worker.on_exception(&err).await;
                let exception = Exception::new("WorkerError", err.message.clone());
                let _ = job_store.with_job_mut(job_id, |j| j.fail(exception, clock));
                return Err(err.into());
            }
            let _ = job_store.with_job_mut(job_id, |j| j.complete(clock));
            info!(job_id = %job_id, class = %job.class_name, "singleton job completed");
            Ok(())
        }
        Err(err) => {
            worker.on_exception(&err).await;
            let exception = Exception::new("WorkerError", err.message.clone());
            let _ = job_store.with_job_mut(job_id, |j| j.fail(exception, clock));
            warn!(job_id = %job_id, class = %job.class_name, error = %err, "singleton job failed");
            Err(err.into())
        }
    }
}

#[cfg(test)]
#[path = "job_runtime_tests.rs"]
mod tests;
