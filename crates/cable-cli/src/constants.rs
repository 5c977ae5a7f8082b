use std::time::Duration;

/// How often the event loop polls `status()` while a job is active.
pub const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Delay before resuming a job paused via `--pause-after`.
pub const PAUSE_AFTER_DEMO_DELAY: Duration = Duration::from_secs(1);
