//! Flow control: how many points to send next, and whether now is a good
//! time to send anything at all, based on the controller's queue telemetry.

use crate::config::FlowConfig;
use crate::controller::QueueTelemetry;

/// Owned exclusively by a single job's worker task; tracks the run of
/// consecutive status-fetch failures used to degrade the readiness gate.
pub(crate) struct FlowController {
    cfg: FlowConfig,
    consecutive_status_failures: u32,
}

const DEGRADE_AFTER_FAILURES: u32 = 3;

impl FlowController {
    pub(crate) fn new(cfg: FlowConfig) -> Self {
        Self {
            cfg,
            consecutive_status_failures: 0,
        }
    }

    pub(crate) fn record_status_failure(&mut self) {
        self.consecutive_status_failures = self.consecutive_status_failures.saturating_add(1);
    }

    pub(crate) fn record_status_success(&mut self) {
        self.consecutive_status_failures = 0;
    }

    /// True once three consecutive status fetches have failed to parse or
    /// transport-failed; forces the readiness gate open to avoid deadlocking
    /// against a silent device.
    pub(crate) fn degraded(&self) -> bool {
        self.consecutive_status_failures >= DEGRADE_AFTER_FAILURES
    }

    /// "May we push now?" Collapses to `size < fill_target` when telemetry
    /// is present: size at or past the low watermark but below fill target
    /// still says yes (keep the pipeline full), size at or past fill target
    /// says no. Absent telemetry (including a 404, which is a successful
    /// "no telemetry" outcome, not a failure) always says yes.
    pub(crate) fn is_ready(&self, queue: Option<QueueTelemetry>) -> bool {
        if self.degraded() {
            return true;
        }
        match queue {
            Some(queue) => queue.size < self.cfg.fill_target,
            None => true,
        }
    }

    /// Decide how many points the next batch should carry.
    ///
    /// The first batch of a job is always exactly one point (the synthetic
    /// pen-up travel to the first user point), independent of telemetry.
    /// `batch_size` is the job's target batch size (`JobConfig::batch_size`).
    pub(crate) fn decide_chunk(
        &self,
        is_first_batch: bool,
        remaining: usize,
        batch_size: usize,
        queue: Option<QueueTelemetry>,
    ) -> usize {
        if is_first_batch {
            return remaining.min(1);
        }
        if remaining == 0 {
            return 0;
        }

        match queue {
            Some(queue) => {
                let available = self.cfg.capacity.saturating_sub(queue.size);
                if available == 0 {
                    return 0;
                }
                let desired_fill = self.cfg.fill_target.saturating_sub(queue.size);
                remaining
                    .min(desired_fill.max(self.cfg.min_chunk))
                    .min(available)
                    .min(batch_size)
                    .min(self.cfg.max_per_request)
            }
            None => remaining
                .min(self.cfg.min_chunk.max(batch_size))
                .min(self.cfg.max_per_request),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> FlowConfig {
        FlowConfig {
            capacity: 3000,
            fill_target: 2500,
            low_watermark: 200,
            min_chunk: 200,
            max_per_request: 200,
        }
    }

    #[test]
    fn first_batch_is_always_one_point() {
        let flow = FlowController::new(cfg());
        assert_eq!(flow.decide_chunk(true, 9999, 200, None), 1);
        assert_eq!(
            flow.decide_chunk(true, 9999, 200, Some(QueueTelemetry { size: 0, is_executing: false })),
            1
        );
    }

    #[test]
    fn no_telemetry_uses_min_chunk_capped_by_max_per_request() {
        let flow = FlowController::new(cfg());
        assert_eq!(flow.decide_chunk(false, 9999, 200, None), 200);
        assert_eq!(flow.decide_chunk(false, 50, 200, None), 50);
    }

    #[test]
    fn empty_idle_queue_fills_to_target() {
        let flow = FlowController::new(cfg());
        let queue = QueueTelemetry { size: 0, is_executing: false };
        let chunk = flow.decide_chunk(false, 9999, 200, Some(queue));
        assert_eq!(chunk, 200); // capped by max_per_request
    }

    #[test]
    fn near_capacity_queue_limits_chunk_to_available_space() {
        // S6: size = capacity - 100, min_chunk = 200 -> next chunk <= 100.
        let flow = FlowController::new(cfg());
        let queue = QueueTelemetry { size: 3000 - 100, is_executing: true };
        let chunk = flow.decide_chunk(false, 9999, 200, Some(queue));
        assert!(chunk <= 100);
    }

    #[test]
    fn full_queue_defers_to_zero() {
        let flow = FlowController::new(cfg());
        let queue = QueueTelemetry { size: 3000, is_executing: true };
        assert_eq!(flow.decide_chunk(false, 9999, 200, Some(queue)), 0);
    }

    #[test]
    fn readiness_yes_below_fill_target_no_at_or_above() {
        let flow = FlowController::new(cfg());
        assert!(flow.is_ready(Some(QueueTelemetry { size: 0, is_executing: false })));
        assert!(flow.is_ready(Some(QueueTelemetry { size: 200, is_executing: true })));
        assert!(flow.is_ready(Some(QueueTelemetry { size: 2499, is_executing: true })));
        assert!(!flow.is_ready(Some(QueueTelemetry { size: 2500, is_executing: true })));
    }

    #[test]
    fn readiness_proceeds_without_telemetry() {
        let flow = FlowController::new(cfg());
        assert!(flow.is_ready(None));
    }

    #[test]
    fn readiness_degrades_to_permissive_after_three_failures() {
        let mut flow = FlowController::new(cfg());
        let bad_queue = Some(QueueTelemetry { size: 2999, is_executing: true });
        assert!(!flow.is_ready(bad_queue));
        flow.record_status_failure();
        flow.record_status_failure();
        assert!(!flow.is_ready(bad_queue));
        flow.record_status_failure();
        assert!(flow.is_ready(bad_queue));
    }

    #[test]
    fn status_success_resets_failure_streak() {
        let mut flow = FlowController::new(cfg());
        flow.record_status_failure();
        flow.record_status_failure();
        flow.record_status_failure();
        assert!(flow.degraded());
        flow.record_status_success();
        assert!(!flow.degraded());
    }
}
