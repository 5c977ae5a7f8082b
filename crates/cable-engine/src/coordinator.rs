//! The public façade: single-job exclusivity, job construction, and the
//! pause/resume/cancel control surface.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::Url;
use tracing::info;

use cable_core::normalize_points;

use crate::api::{StartJobRequest, StatusSnapshot};
use crate::config::EngineConfig;
use crate::controller::{ControllerClient, EndpointKind, derive_endpoint};
use crate::error::EngineError;
use crate::job::Job;
use crate::worker::run_worker;

struct CoordinatorState {
    current: Option<Arc<Job>>,
    last_job: Option<Arc<Job>>,
    last_job_observed: bool,
}

/// Single-job-at-a-time scheduler. Cheap to clone (internally `Arc`-backed);
/// one instance should be shared across a host process the way the teacher
/// shares one `reqwest::Client` across all its workers.
pub struct JobCoordinator {
    http: reqwest::Client,
    cfg: EngineConfig,
    state: Mutex<CoordinatorState>,
}

impl JobCoordinator {
    /// Build a coordinator. `cfg` is clamped to sane minimums immediately,
    /// mirroring the teacher's `run_engine` clamp-on-construction pattern.
    pub fn new(cfg: EngineConfig) -> Result<Self, EngineError> {
        let cfg = cfg.clamped();
        let http = reqwest::Client::builder()
            .timeout(cfg.timing.request_timeout)
            .build()
            .map_err(|err| EngineError::InvalidInput(format!("build http client: {err}")))?;

        Ok(Self {
            http,
            cfg,
            state: Mutex::new(CoordinatorState {
                current: None,
                last_job: None,
                last_job_observed: false,
            }),
        })
    }

    /// Validate and normalize `request`, derive any missing URLs and start
    /// position, install the job as the single active job (failing with
    /// `Busy` if one is already running), and spawn its worker task.
    pub async fn start_job(&self, request: StartJobRequest) -> Result<StatusSnapshot, EngineError> {
        let points = normalize_points(&request.points)?;
        if points.is_empty() {
            return Err(EngineError::InvalidInput("points must not be empty".to_string()));
        }

        let controller_url = Url::parse(&request.controller_url)
            .map_err(|err| EngineError::InvalidInput(format!("invalid controller_url: {err}")))?;
        let status_url = match request.status_url {
            Some(raw) => {
                Some(Url::parse(&raw).map_err(|err| EngineError::InvalidInput(format!("invalid status_url: {err}")))?)
            }
            None => Some(derive_endpoint(&controller_url, EndpointKind::Status)),
        };
        let cancel_url = match request.cancel_url {
            Some(raw) => {
                Some(Url::parse(&raw).map_err(|err| EngineError::InvalidInput(format!("invalid cancel_url: {err}")))?)
            }
            None => Some(derive_endpoint(&controller_url, EndpointKind::Cancel)),
        };

        let controller = ControllerClient::new(self.http.clone());

        let start_position = match request.start_position {
            Some(point) => Some(point),
            None => self.derive_start_position(&controller, status_url.as_ref()).await?,
        };
        if start_position.is_none() {
            return Err(EngineError::InvalidInput(
                "no start_position supplied and none could be fetched from the controller".to_string(),
            ));
        }

        let job_id = uuid::Uuid::new_v4().to_string();
        let job = Arc::new(Job::new(
            job_id,
            controller_url,
            status_url,
            cancel_url,
            request.speed,
            request.reset,
            start_position,
            points,
            self.cfg.job.batch_size,
        ));

        {
            let mut state = self.state.lock().unwrap();
            if let Some(existing) = &state.current {
                if existing.status().is_active() {
                    return Err(EngineError::Busy);
                }
            }
            state.current = Some(job.clone());
            state.last_job = None;
            state.last_job_observed = false;
        }

        info!(job_id = %job.job_id, points = job.points.len(), "starting job");
        tokio::spawn(run_worker(job.clone(), controller, self.cfg));

        Ok(build_snapshot(&job))
    }

    /// Read the current or most-recently-finished job's status. A job that
    /// just reached a terminal state is returned once more, then forgotten.
    pub fn status(&self) -> Option<StatusSnapshot> {
        let mut state = self.state.lock().unwrap();

        if let Some(job) = state.current.clone() {
            let snapshot = build_snapshot(&job);
            if job.status().is_terminal() {
                state.current = None;
                state.last_job = Some(job);
                state.last_job_observed = false;
            }
            return Some(snapshot);
        }

        if let Some(job) = state.last_job.clone() {
            if !state.last_job_observed {
                state.last_job_observed = true;
                return Some(build_snapshot(&job));
            }
            state.last_job = None;
        }

        None
    }

    /// Pause the active job. No-op if no job is active.
    pub fn pause(&self) {
        if let Some(job) = self.active_job() {
            job.signals.pause();
        }
    }

    /// Resume a paused job. No-op if no job is active.
    pub fn resume(&self) {
        if let Some(job) = self.active_job() {
            job.signals.resume();
        }
    }

    /// Request cancellation of the active job. No-op if no job is active.
    pub fn cancel(&self) {
        if let Some(job) = self.active_job() {
            job.mark_cancelling();
            job.signals.request_cancel();
        }
    }

    fn active_job(&self) -> Option<Arc<Job>> {
        let state = self.state.lock().unwrap();
        state
            .current
            .clone()
            .filter(|job| job.status().is_active())
    }

    async fn derive_start_position(
        &self,
        controller: &ControllerClient,
        status_url: Option<&Url>,
    ) -> Result<Option<cable_core::Point>, EngineError> {
        let Some(status_url) = status_url else {
            return Ok(None);
        };
        match tokio::time::timeout(Duration::from_secs(10), controller.fetch_status(status_url)).await {
            Ok(Ok(Some(telemetry))) => Ok(telemetry
                .state
                .map(|state| cable_core::Point::new(state.x_mm, state.y_mm, state.pen_down))),
            _ => Ok(None),
        }
    }
}

fn build_snapshot(job: &Job) -> StatusSnapshot {
    StatusSnapshot {
        job_id: job.job_id.clone(),
        status: job.status().as_str().to_string(),
        sent_points: job.sent_points(),
        total_points: job.points.len(),
        sent_batches: job.sent_batches(),
        total_batches: job.total_batches(),
        paused: job.signals.is_paused(),
        started_at: job.started_at(),
        finished_at: job.finished_at(),
        error: job.error(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn request(controller_url: &str) -> StartJobRequest {
        let mut req = StartJobRequest::new(
            controller_url,
            vec![serde_json::json!([1.0, 2.0]), serde_json::json!([3.0, 4.0])],
            1800,
        );
        req.start_position = Some(cable_core::Point::new(0.0, 0.0, false));
        req
    }

    #[tokio::test]
    async fn rejects_empty_points() {
        let coordinator = JobCoordinator::new(EngineConfig::default()).unwrap();
        let mut req = request("http://device.local/api/path");
        req.points.clear();
        let err = coordinator.start_job(req).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn second_job_is_rejected_while_first_is_active() {
        let coordinator = JobCoordinator::new(EngineConfig::default()).unwrap();
        let first = coordinator.start_job(request("http://127.0.0.1:1/api/path")).await;
        assert!(first.is_ok());

        let second = coordinator.start_job(request("http://127.0.0.1:1/api/path")).await;
        assert!(matches!(second, Err(EngineError::Busy)));
    }

    #[tokio::test]
    async fn requires_start_position_when_none_derivable() {
        let coordinator = JobCoordinator::new(EngineConfig::default()).unwrap();
        let mut req = request("http://127.0.0.1:1/api/path");
        req.start_position = None;
        req.status_url = Some("http://127.0.0.1:1/api/status".to_string());
        let err = coordinator.start_job(req).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    /// The missing-`start_position` check applies regardless of `reset`:
    /// a `reset: false` job still needs a pen position to compute cable
    /// lengths from, so it must fail the same way a `reset: true` job does.
    #[tokio::test]
    async fn requires_start_position_even_when_reset_is_false() {
        let coordinator = JobCoordinator::new(EngineConfig::default()).unwrap();
        let mut req = request("http://127.0.0.1:1/api/path");
        req.reset = false;
        req.start_position = None;
        req.status_url = Some("http://127.0.0.1:1/api/status".to_string());
        let err = coordinator.start_job(req).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }
}
