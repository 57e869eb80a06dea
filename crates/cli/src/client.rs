// SPDX-License-Identifier: MIT

//! Unix-socket connection to the `stratumd` daemon (§10.5).
//!
//! The socket path is resolved the same way the daemon resolves it
//! (`stratum_daemon::lifecycle::Paths`), so the CLI and the daemon always
//! agree on where to find each other without either side overriding the
//! other's path-resolution rules.

use std::path::PathBuf;

use stratum_daemon::lifecycle::{LifecycleError, Paths};
use stratum_wire::{ProtocolError, Request, Response};
use tokio::net::UnixStream;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("could not resolve daemon socket path: {0}")]
    Paths(#[from] LifecycleError),

    #[error("could not connect to daemon at {path}: {source}\nis `stratumd` running?")]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("protocol error talking to daemon: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("daemon returned an unexpected response: {0:?}")]
    UnexpectedResponse(Response),

    #[error("{0}")]
    Daemon(String),
}

/// A connection to the daemon, opened fresh for each request (the daemon's
/// listener is a simple accept-per-request loop, so there is no persistent
/// session to keep alive between commands).
pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    /// Resolve the daemon's socket path without connecting yet.
    pub fn resolve() -> Result<Self, ClientError> {
        let paths = Paths::resolve()?;
        Ok(Self { socket_path: paths.socket_path })
    }

    /// Connect to a specific socket path, bypassing resolution (`--socket`).
    pub fn at(socket_path: PathBuf) -> Self {
        Self { socket_path }
    }

    async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|source| ClientError::Connect { path: self.socket_path.clone(), source })?;
        stratum_wire::write_request(&mut stream, request).await?;
        let response = stratum_wire::read_response(&mut stream).await?;
        Ok(response)
    }

    fn reject<T>(response: Response) -> Result<T, ClientError> {
        match response {
            Response::Error { message } => Err(ClientError::Daemon(message)),
            other => Err(ClientError::UnexpectedResponse(other)),
        }
    }

    pub async fn ping(&self) -> Result<(), ClientError> {
        match self.send(&Request::Ping).await? {
            Response::Pong => Ok(()),
            other => Self::reject(other),
        }
    }

    pub async fn submit_job(&self, submission: stratum_wire::JobSubmission) -> Result<String, ClientError> {
        match self.send(&Request::SubmitJob { submission }).await? {
            Response::JobSubmitted { id } => Ok(id),
            other => Self::reject(other),
        }
    }

    pub async fn job_status(&self, id: &str) -> Result<stratum_wire::JobStatusView, ClientError> {
        match self.send(&Request::JobStatus { id: id.to_string() }).await? {
            Response::JobStatus { status } => Ok(status),
            other => Self::reject(other),
        }
    }

    pub async fn list_jobs(&self) -> Result<Vec<stratum_wire::JobSummary>, ClientError> {
        match self.send(&Request::ListJobs).await? {
            Response::Jobs { jobs } => Ok(jobs),
            other => Self::reject(other),
        }
    }

    pub async fn retry_job(&self, id: &str) -> Result<(), ClientError> {
        self.ack(Request::RetryJob { id: id.to_string() }).await
    }

    pub async fn abort_job(&self, id: &str) -> Result<(), ClientError> {
        self.ack(Request::AbortJob { id: id.to_string() }).await
    }

    pub async fn pause_job(&self, id: &str) -> Result<(), ClientError> {
        self.ack(Request::PauseJob { id: id.to_string() }).await
    }

    pub async fn resume_job(&self, id: &str) -> Result<(), ClientError> {
        self.ack(Request::ResumeJob { id: id.to_string() }).await
    }

    pub async fn server_status(&self) -> Result<Vec<stratum_wire::ServerView>, ClientError> {
        match self.send(&Request::ServerStatus).await? {
            Response::Servers { servers } => Ok(servers),
            other => Self::reject(other),
        }
    }

    async fn ack(&self, request: Request) -> Result<(), ClientError> {
        match self.send(&request).await? {
            Response::Ack => Ok(()),
            other => Self::reject(other),
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
