// src/error.rs
//! Error types for the benchmark coordinator.
//!
//! Every failure the core can produce is fatal; the variants exist so callers
//! (and tests) can tell configuration mistakes apart from failures of the
//! external tools.

use thiserror::Error;

/// Coarse category of a [`BenchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    ExternalProcess,
    ResultDiscovery,
    IncompleteResult,
    PollExhausted,
    Io,
    Parse,
    Remote,
}

/// Errors raised while expanding, running or reporting a benchmark.
#[derive(Debug, Error)]
pub enum BenchError {
    /// Invalid or inconsistent run configuration, detected before any process is spawned.
    #[error("configuration error: {0}")]
    Config(String),

    /// An external tool exited unsuccessfully; `stderr` is passed through verbatim.
    #[error("{program} failed ({status}): {stderr}")]
    ExternalProcess {
        program: String,
        status: String,
        stderr: String,
    },

    /// The result artifact for a job was missing or ambiguous.
    #[error("cannot collect results for job {job_id}: {reason}")]
    ResultDiscovery { job_id: String, reason: String },

    /// A result is missing one of its directions and must not be reported.
    #[error("incomplete result for job {job_id}: no {direction} statistics")]
    IncompleteResult {
        job_id: String,
        direction: &'static str,
    },

    #[error("gave up waiting after {0} polls")]
    PollExhausted(u32),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("ssh error: {0}")]
    Ssh(#[from] ssh2::Error),

    #[error("remote command on {host} failed: {message}")]
    Remote { host: String, message: String },
}

impl BenchError {
    pub fn config(msg: impl Into<String>) -> Self {
        BenchError::Config(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BenchError::Config(_) => ErrorKind::Config,
            BenchError::ExternalProcess { .. } => ErrorKind::ExternalProcess,
            BenchError::ResultDiscovery { .. } => ErrorKind::ResultDiscovery,
            BenchError::IncompleteResult { .. } => ErrorKind::IncompleteResult,
            BenchError::PollExhausted(_) => ErrorKind::PollExhausted,
            BenchError::Io(_) => ErrorKind::Io,
            BenchError::Csv(_) | BenchError::Json(_) | BenchError::Yaml(_) => ErrorKind::Parse,
            BenchError::Ssh(_) | BenchError::Remote { .. } => ErrorKind::Remote,
        }
    }
}

pub type Result<T, E = BenchError> = std::result::Result<T, E>;
