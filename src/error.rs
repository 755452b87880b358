//! Error types shared by the pool, the recurring driver and the coordinator

use std::time::Duration;

use thiserror::Error;

/// Failure reported by a task body.
///
/// Returned instead of panicking; the worker logs it and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TaskError(String);

impl TaskError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// Submission attempted after shutdown began
    #[error("submission rejected: `{0}` is shutting down")]
    RejectedSubmission(String),

    #[error("task failed: {0}")]
    TaskInternalFailure(#[from] TaskError),

    /// Grace period elapsed before every target drained
    #[error("grace period of {0:?} elapsed before drain")]
    ShutdownTimeout(Duration),

    #[error("shutdown handler fault: {0}")]
    SignalHandlerFault(String),

    #[error("failed to install signal handler: {0}")]
    SignalRegistration(#[source] std::io::Error),

    #[error("failed to spawn thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("`{0}` is already started")]
    AlreadyStarted(String),
}

pub type Result<T> = std::result::Result<T, Error>;
