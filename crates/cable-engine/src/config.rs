//! Layered tuning configuration for the engine.
//!
//! Every knob has a `Default` matching the reference values; construction
//! always clamps to sane minimums the same way the teacher's `EngineConfig`
//! clamps worker/backend settings in `run_engine`.

use std::time::Duration;

use cable_core::Geometry;

/// Controller queue pacing knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowConfig {
    /// Hard capacity of the controller's internal point queue.
    pub capacity: usize,
    /// Desired steady-state queue occupancy.
    pub fill_target: usize,
    /// Queue depth below which the worker aggressively refills.
    pub low_watermark: usize,
    /// Smallest chunk the flow controller will size a batch to, telemetry permitting.
    pub min_chunk: usize,
    /// Hard ceiling on points per HTTP request, independent of queue telemetry.
    pub max_per_request: usize,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            capacity: 3000,
            fill_target: 3000 - 500,
            low_watermark: 200,
            min_chunk: 200,
            max_per_request: 200,
        }
    }
}

impl FlowConfig {
    fn clamp(mut self) -> Self {
        self.capacity = self.capacity.max(1);
        self.fill_target = self.fill_target.clamp(1, self.capacity);
        self.low_watermark = self.low_watermark.min(self.fill_target);
        self.min_chunk = self.min_chunk.max(1);
        self.max_per_request = self.max_per_request.max(1);
        self
    }
}

/// Timeouts and polling cadence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingConfig {
    /// Per-HTTP-request timeout.
    pub request_timeout: Duration,
    /// Delay between consecutive status polls.
    pub status_poll_interval: Duration,
    /// Deadline for a single "wait until ready" poll loop.
    pub status_timeout: Duration,
    /// Delay between consecutive send retries.
    pub send_retry_interval: Duration,
    /// Deadline for a single batch's retry loop.
    pub send_retry_timeout: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            status_poll_interval: Duration::from_millis(500),
            status_timeout: Duration::from_secs(300),
            send_retry_interval: Duration::from_secs(2),
            send_retry_timeout: Duration::from_secs(120),
        }
    }
}

impl TimingConfig {
    const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

    fn clamp(mut self) -> Self {
        if self.request_timeout == Duration::ZERO {
            self.request_timeout = TimingConfig::default().request_timeout;
        }
        if self.status_poll_interval < Self::MIN_POLL_INTERVAL {
            self.status_poll_interval = Self::MIN_POLL_INTERVAL;
        }
        if self.status_timeout == Duration::ZERO {
            self.status_timeout = TimingConfig::default().status_timeout;
        }
        if self.send_retry_interval < Self::MIN_POLL_INTERVAL {
            self.send_retry_interval = Self::MIN_POLL_INTERVAL;
        }
        if self.send_retry_timeout == Duration::ZERO {
            self.send_retry_timeout = TimingConfig::default().send_retry_timeout;
        }
        self
    }
}

/// Per-job batching knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JobConfig {
    /// Target batch size absent other constraints.
    pub batch_size: usize,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self { batch_size: 200 }
    }
}

impl JobConfig {
    fn clamp(mut self) -> Self {
        self.batch_size = self.batch_size.max(1);
        self
    }
}

/// Aggregate configuration handed to a [`crate::coordinator::JobCoordinator`] at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Device calibration used to convert board points to cable lengths.
    pub geometry: Geometry,
    /// Controller queue pacing knobs.
    pub flow: FlowConfig,
    /// Timeouts and polling cadence.
    pub timing: TimingConfig,
    /// Per-job batching knobs.
    pub job: JobConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            geometry: Geometry::default(),
            flow: FlowConfig::default(),
            timing: TimingConfig::default(),
            job: JobConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Apply the clamping rules described per field above; called once at
    /// [`crate::coordinator::JobCoordinator::new`].
    pub(crate) fn clamped(self) -> Self {
        Self {
            geometry: self.geometry,
            flow: self.flow.clamp(),
            timing: self.timing.clamp(),
            job: self.job.clamp(),
        }
    }
}
