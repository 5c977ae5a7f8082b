//! Transport failure classification and the deadline-bounded retry loop
//! shared by batch sends and status polls.

use std::future::Future;
use std::time::{Duration, Instant};

use reqwest::StatusCode;

use crate::error::TransportError;
use crate::job::JobSignals;

/// Classify a `reqwest` transport-level error (never reached the server, or
/// the server didn't finish responding).
pub(crate) fn classify_reqwest_error(err: &reqwest::Error) -> TransportError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        TransportError::Retryable(err.to_string())
    } else {
        // Body decode errors and the like don't improve on retry.
        TransportError::Terminal(err.to_string())
    }
}

/// Classify an HTTP response status. 5xx is retryable; everything else
/// (4xx, informational, redirects we don't follow) is terminal.
pub(crate) fn classify_status(status: StatusCode, body: &str) -> TransportError {
    if status.is_server_error() {
        TransportError::Retryable(format!("http {status}: {body}"))
    } else {
        TransportError::Terminal(format!("http {status}: {body}"))
    }
}

/// Outcome of a retry loop that did not produce a success value.
#[derive(Debug)]
pub(crate) enum RetryOutcome {
    /// Cancel was requested mid-retry.
    Cancelled,
    /// A terminal transport error was returned by the attempt.
    Terminal(String),
    /// The controller parsed the request but rejected its contents.
    Rejected(String),
    /// The configured deadline elapsed while only retryable errors occurred.
    DeadlineExceeded(String),
}

/// Retry `attempt` at `interval` until it succeeds, returns a terminal
/// error, is cancelled, or `deadline` elapses. Checks cancel before each
/// attempt and honours pause between attempts, per the suspension-point list.
pub(crate) async fn retry_with_deadline<T, F, Fut>(
    interval: Duration,
    deadline: Duration,
    signals: &JobSignals,
    mut attempt: F,
) -> Result<T, RetryOutcome>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let start = Instant::now();
    loop {
        if signals.is_cancelled() {
            return Err(RetryOutcome::Cancelled);
        }
        signals.wait_while_paused().await;
        if signals.is_cancelled() {
            return Err(RetryOutcome::Cancelled);
        }

        match attempt().await {
            Ok(value) => return Ok(value),
            Err(TransportError::Terminal(msg)) => return Err(RetryOutcome::Terminal(msg)),
            Err(TransportError::Rejected(msg)) => return Err(RetryOutcome::Rejected(msg)),
            Err(TransportError::Retryable(msg)) => {
                if start.elapsed() >= deadline {
                    return Err(RetryOutcome::DeadlineExceeded(msg));
                }
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = signals.cancelled() => return Err(RetryOutcome::Cancelled),
                }
            }
        }
    }
}
