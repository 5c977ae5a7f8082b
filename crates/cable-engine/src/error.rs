//! Typed error surfaces for the engine, per the `thiserror`-for-libraries split.

use cable_core::CoreError;

/// A classified transport failure, produced by the retry engine's classifier.
#[derive(Debug, thiserror::Error)]
pub(crate) enum TransportError {
    /// Connect/read timeout, connection error, or HTTP 5xx — worth retrying.
    #[error("retryable transport error: {0}")]
    Retryable(String),
    /// HTTP 4xx or other non-success status, or a malformed/unparseable body.
    #[error("terminal transport error: {0}")]
    Terminal(String),
    /// The controller parsed the request but rejected it: a truthy `error`
    /// field, an unrecognized `status`, or `success: false` in the ack body.
    #[error("controller rejected batch: {0}")]
    Rejected(String),
}

impl TransportError {
    pub(crate) fn into_message(self) -> String {
        match self {
            TransportError::Retryable(msg) | TransportError::Terminal(msg) | TransportError::Rejected(msg) => msg,
        }
    }
}

/// The job-facing error surface: returned synchronously by `start_job` or
/// stashed in `job.error` for asynchronous failures.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum EngineError {
    /// Caller-supplied input was rejected (empty points, malformed shape, missing start position).
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Another job is already active; only one job may run at a time.
    #[error("another job is already active")]
    Busy,
    /// The controller's acknowledgement carried an error field or unrecognized status.
    #[error("controller rejected batch: {0}")]
    ControllerRejected(String),
    /// The job was cancelled before reaching a different terminal state.
    #[error("cancelled")]
    Cancelled,
    /// A retry or poll loop exceeded its configured deadline.
    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(String),
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidInput(msg) => EngineError::InvalidInput(msg),
        }
    }
}
