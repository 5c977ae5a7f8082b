//! The per-job worker task: waits for a ready queue, builds and sends
//! batches, and drives the job to a terminal state.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument, warn};

use crate::config::EngineConfig;
use crate::controller::{BatchPayload, ControllerClient, QueueTelemetry};
use crate::error::EngineError;
use crate::flow::FlowController;
use crate::job::Job;
use crate::retry::{RetryOutcome, retry_with_deadline};

/// Drive `job` to completion, failure, or cancellation. Spawned once per
/// job by the coordinator; never returns early except through one of the
/// three terminal transitions.
#[instrument(skip(job, controller, cfg), fields(job_id = %job.job_id))]
pub(crate) async fn run_worker(job: Arc<Job>, controller: ControllerClient, cfg: EngineConfig) {
    job.mark_running();
    info!(total_points = job.points.len(), "job started");

    let mut flow = FlowController::new(cfg.flow);
    let mut is_first_batch = true;

    loop {
        if job.signals.is_cancelled() {
            finish_cancelled(&job, &controller).await;
            return;
        }
        job.signals.wait_while_paused().await;
        if job.signals.is_cancelled() {
            finish_cancelled(&job, &controller).await;
            return;
        }

        let remaining = job.points.len().saturating_sub(job.sent_points());
        if remaining == 0 {
            job.finish_completed();
            info!("job completed");
            return;
        }

        let queue = match poll_until_ready(&job, &controller, &mut flow, &cfg).await {
            Ok(queue) => queue,
            Err(EngineError::Cancelled) => {
                finish_cancelled(&job, &controller).await;
                return;
            }
            Err(err) => {
                job.finish_failed(err.to_string());
                warn!(error = %err, "job failed while waiting for controller readiness");
                return;
            }
        };

        let chunk = flow.decide_chunk(is_first_batch, remaining, job.batch_size, queue);
        if chunk == 0 {
            tokio::select! {
                _ = tokio::time::sleep(cfg.timing.status_poll_interval) => {}
                _ = job.signals.cancelled() => {
                    finish_cancelled(&job, &controller).await;
                    return;
                }
            }
            continue;
        }

        let sent_points = job.sent_points();
        let slice = &job.points[sent_points..sent_points + chunk];
        let cable_points: Vec<_> = slice.iter().map(|p| cfg.geometry.to_cable(*p)).collect();
        let include_start_position = is_first_batch && job.reset;
        let payload = BatchPayload {
            reset: is_first_batch && job.reset,
            speed: job.speed,
            points: cable_points,
            start_position: if include_start_position {
                job.start_position.map(|p| cfg.geometry.to_cable(p))
            } else {
                None
            },
        };

        let send_result = retry_with_deadline(
            cfg.timing.send_retry_interval,
            cfg.timing.send_retry_timeout,
            &job.signals,
            || controller.send_batch(&job.controller_url, &payload),
        )
        .await;

        match send_result {
            Ok(()) => {
                job.record_batch_sent(chunk);
                is_first_batch = false;
            }
            Err(RetryOutcome::Cancelled) => {
                finish_cancelled(&job, &controller).await;
                return;
            }
            Err(RetryOutcome::Terminal(msg)) => {
                warn!(error = %msg, "batch send failed, failing job");
                job.finish_failed(msg);
                return;
            }
            Err(RetryOutcome::Rejected(msg)) => {
                warn!(error = %msg, "controller rejected batch, failing job");
                job.finish_failed(EngineError::ControllerRejected(msg).to_string());
                return;
            }
            Err(RetryOutcome::DeadlineExceeded(msg)) => {
                warn!(error = %msg, "send retry deadline exceeded, failing job");
                job.finish_failed(format!("send retry deadline exceeded: {msg}"));
                return;
            }
        }
    }
}

/// Poll the status endpoint until the flow controller says it's safe to
/// send, the configured deadline elapses, or cancel is requested. A job
/// with no status URL configured proceeds immediately (no telemetry at all).
async fn poll_until_ready(
    job: &Job,
    controller: &ControllerClient,
    flow: &mut FlowController,
    cfg: &EngineConfig,
) -> Result<Option<QueueTelemetry>, EngineError> {
    let Some(status_url) = job.status_url.as_ref() else {
        return Ok(None);
    };

    let start = Instant::now();
    loop {
        if job.signals.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        job.signals.wait_while_paused().await;
        if job.signals.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        match controller.fetch_status(status_url).await {
            Ok(None) => {
                flow.record_status_success();
                return Ok(None);
            }
            Ok(Some(telemetry)) => {
                flow.record_status_success();
                if flow.is_ready(telemetry.queue) {
                    return Ok(telemetry.queue);
                }
            }
            Err(err) => {
                flow.record_status_failure();
                warn!(error = %err.into_message(), "status fetch failed");
                if flow.degraded() {
                    return Ok(None);
                }
            }
        }

        if start.elapsed() >= cfg.timing.status_timeout {
            return Err(EngineError::DeadlineExceeded("status poll timed out".to_string()));
        }

        tokio::select! {
            _ = tokio::time::sleep(cfg.timing.status_poll_interval) => {}
            _ = job.signals.cancelled() => return Err(EngineError::Cancelled),
        }
    }
}

async fn finish_cancelled(job: &Job, controller: &ControllerClient) {
    if let Some(cancel_url) = job.cancel_url.as_ref() {
        if let Err(err) = controller.cancel(cancel_url).await {
            warn!(error = %err, "best-effort controller cancel failed");
        }
    }
    job.finish_cancelled();
    info!("job cancelled");
}
