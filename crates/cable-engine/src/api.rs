//! Public API types and the [`JobCoordinator`] façade.

use cable_core::Point;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use crate::config::{EngineConfig, FlowConfig, JobConfig, TimingConfig};
pub use crate::coordinator::JobCoordinator;
pub use crate::error::EngineError;
pub use crate::job::JobStatus;

/// Inputs to [`JobCoordinator::start_job`]. `points` accepts the same
/// heterogeneous shapes the point normalizer understands (objects, pairs,
/// triples); see `cable_core::normalize_points`.
#[derive(Debug, Clone)]
pub struct StartJobRequest {
    /// Base URL the controller receives batch sends on.
    pub controller_url: String,
    /// Heterogeneous point list, normalized before the job is created.
    pub points: Vec<serde_json::Value>,
    /// Starting pen position, in board millimetres. Derived from controller
    /// telemetry when omitted.
    pub start_position: Option<Point>,
    /// Motor speed passed through to the controller, unvalidated.
    pub speed: u32,
    /// Whether the controller should re-home to `start_position` before drawing.
    pub reset: bool,
    /// Status endpoint override; derived from `controller_url` when absent.
    pub status_url: Option<String>,
    /// Cancel endpoint override; derived from `controller_url` when absent.
    pub cancel_url: Option<String>,
}

impl StartJobRequest {
    /// Construct a request with `reset: true` and no URL overrides, the
    /// common case for a single straight-through job.
    pub fn new(controller_url: impl Into<String>, points: Vec<serde_json::Value>, speed: u32) -> Self {
        Self {
            controller_url: controller_url.into(),
            points,
            start_position: None,
            speed,
            reset: true,
            status_url: None,
            cancel_url: None,
        }
    }
}

/// A read-only projection of a job suitable for polling clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusSnapshot {
    /// Job identifier.
    pub job_id: String,
    /// Current lifecycle state, as its lowercase name.
    pub status: String,
    /// Points acknowledged by the controller so far.
    pub sent_points: usize,
    /// Total points in the job.
    pub total_points: usize,
    /// Batches acknowledged so far.
    pub sent_batches: usize,
    /// Estimated total batch count; recomputed as chunk sizes vary.
    pub total_batches: usize,
    /// Whether the job is currently paused.
    pub paused: bool,
    /// When the worker picked up the job.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal state.
    pub finished_at: Option<DateTime<Utc>>,
    /// The last error, if the job failed or was cancelled.
    pub error: Option<String>,
}

/// `{"status": "idle"}` — returned by `status()` once there is no job to report.
pub fn idle_status() -> serde_json::Value {
    serde_json::json!({ "status": "idle" })
}
