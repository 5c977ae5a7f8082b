//! Job identity, progress counters, and the cancel/pause coordination signals.
//!
//! Progress counters are atomics with relaxed visibility, sufficient for a
//! polling `status()` to observe monotonic progress; only the worker task
//! ever writes them. Status transitions use `SeqCst` since they gate
//! terminal-state logic read by both the worker and the coordinator.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

use cable_core::Point;
use chrono::{DateTime, Utc};
use reqwest::Url;

/// Lifecycle state of a job. See the module-level state table in the design notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum JobStatus {
    /// Created, not yet picked up by the worker.
    Pending = 0,
    /// Worker is actively dispatching batches.
    Running = 1,
    /// Cancel requested; worker is unwinding.
    Cancelling = 2,
    /// All points acknowledged.
    Completed = 3,
    /// Cancelled before completion.
    Cancelled = 4,
    /// Terminal error (retry deadline exceeded, controller rejection, etc).
    Failed = 5,
}

impl JobStatus {
    /// Whether this status is one of the three terminal states.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Cancelled | JobStatus::Failed)
    }

    /// Whether this status counts toward the single-active-job exclusivity rule.
    pub fn is_active(self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Running | JobStatus::Cancelling)
    }

    /// Lowercase name used in [`crate::api::StatusSnapshot`].
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Cancelling => "cancelling",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Failed => "failed",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => JobStatus::Pending,
            1 => JobStatus::Running,
            2 => JobStatus::Cancelling,
            3 => JobStatus::Completed,
            4 => JobStatus::Cancelled,
            _ => JobStatus::Failed,
        }
    }
}

/// Cooperative cancel/pause signals shared between the coordinator and the worker task.
pub(crate) struct JobSignals {
    cancel_requested: AtomicBool,
    paused: AtomicBool,
    notify: tokio::sync::Notify,
}

impl JobSignals {
    pub(crate) fn new() -> Self {
        Self {
            cancel_requested: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            notify: tokio::sync::Notify::new(),
        }
    }

    pub(crate) fn request_cancel(&self) {
        self.cancel_requested.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }

    pub(crate) fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub(crate) fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst) && !self.is_cancelled()
    }

    /// Resolves once cancel has been requested. Intended for racing against
    /// sleeps/other suspension points in `tokio::select!`.
    pub(crate) async fn cancelled(&self) {
        loop {
            if self.is_cancelled() {
                return;
            }
            let notified = self.notify.notified();
            tokio::pin!(notified);
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Blocks while paused; returns immediately once resumed or cancelled
    /// (cancel always force-opens the gate).
    pub(crate) async fn wait_while_paused(&self) {
        loop {
            if !self.is_paused() {
                return;
            }
            let notified = self.notify.notified();
            tokio::pin!(notified);
            if !self.is_paused() {
                return;
            }
            notified.await;
        }
    }
}

/// Mutex-guarded fields that change rarely and are read together (timestamps, error).
struct ProgressExtras {
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    error: Option<String>,
}

/// A single in-flight (or just-finished) job. Immutable identity fields plus
/// atomic progress counters and coordination signals. Only the worker task
/// mutates progress; the coordinator mutex gates job creation/replacement.
pub(crate) struct Job {
    pub(crate) job_id: String,
    pub(crate) controller_url: Url,
    pub(crate) status_url: Option<Url>,
    pub(crate) cancel_url: Option<Url>,
    pub(crate) speed: u32,
    pub(crate) reset: bool,
    pub(crate) start_position: Option<Point>,
    pub(crate) points: Vec<Point>,
    pub(crate) batch_size: usize,

    status: AtomicU8,
    sent_points: AtomicUsize,
    sent_batches: AtomicUsize,
    total_batches: AtomicUsize,
    pub(crate) signals: JobSignals,
    extras: Mutex<ProgressExtras>,
}

impl Job {
    pub(crate) fn new(
        job_id: String,
        controller_url: Url,
        status_url: Option<Url>,
        cancel_url: Option<Url>,
        speed: u32,
        reset: bool,
        start_position: Option<Point>,
        points: Vec<Point>,
        batch_size: usize,
    ) -> Self {
        let total_batches = total_batches_estimate(points.len(), batch_size);
        Self {
            job_id,
            controller_url,
            status_url,
            cancel_url,
            speed,
            reset,
            start_position,
            points,
            batch_size,
            status: AtomicU8::new(JobStatus::Pending as u8),
            sent_points: AtomicUsize::new(0),
            sent_batches: AtomicUsize::new(0),
            total_batches: AtomicUsize::new(total_batches),
            signals: JobSignals::new(),
            extras: Mutex::new(ProgressExtras {
                started_at: None,
                finished_at: None,
                error: None,
            }),
        }
    }

    pub(crate) fn status(&self) -> JobStatus {
        JobStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    pub(crate) fn sent_points(&self) -> usize {
        self.sent_points.load(Ordering::Relaxed)
    }

    pub(crate) fn sent_batches(&self) -> usize {
        self.sent_batches.load(Ordering::Relaxed)
    }

    pub(crate) fn total_batches(&self) -> usize {
        self.total_batches.load(Ordering::Relaxed)
    }

    pub(crate) fn mark_running(&self) {
        self.status.store(JobStatus::Running as u8, Ordering::SeqCst);
        let mut extras = self.extras.lock().unwrap();
        extras.started_at = Some(Utc::now());
    }

    /// CAS loop rather than check-then-set: the worker may concurrently
    /// store a terminal status between a plain load and a plain store,
    /// which would otherwise let this overwrite `Completed`/`Failed` with
    /// `Cancelling` and strand the job there forever.
    pub(crate) fn mark_cancelling(&self) {
        let mut current = self.status.load(Ordering::SeqCst);
        loop {
            let status = JobStatus::from_u8(current);
            if !status.is_active() {
                return;
            }
            match self.status.compare_exchange(
                current,
                JobStatus::Cancelling as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }

    /// Records a fully-acknowledged batch and refreshes the `total_batches`
    /// estimate, since flow-controller-driven chunk sizes vary run to run.
    pub(crate) fn record_batch_sent(&self, batch_len: usize) {
        let sent_points = self.sent_points.fetch_add(batch_len, Ordering::Relaxed) + batch_len;
        let sent_batches = self.sent_batches.fetch_add(1, Ordering::Relaxed) + 1;
        let remaining = self.points.len().saturating_sub(sent_points);
        let estimate = sent_batches + total_batches_estimate(remaining, self.batch_size.max(batch_len.max(1)));
        self.total_batches.store(estimate.max(sent_batches), Ordering::Relaxed);
    }

    fn finish(&self, status: JobStatus, error: Option<String>) {
        self.status.store(status as u8, Ordering::SeqCst);
        let mut extras = self.extras.lock().unwrap();
        extras.finished_at = Some(Utc::now());
        if extras.error.is_none() {
            extras.error = error;
        }
    }

    pub(crate) fn finish_completed(&self) {
        self.total_batches.store(self.sent_batches(), Ordering::Relaxed);
        self.finish(JobStatus::Completed, None);
    }

    pub(crate) fn finish_failed(&self, error: String) {
        self.finish(JobStatus::Failed, Some(error));
    }

    pub(crate) fn finish_cancelled(&self) {
        self.finish(JobStatus::Cancelled, Some("Cancelled".to_string()));
    }

    pub(crate) fn error(&self) -> Option<String> {
        self.extras.lock().unwrap().error.clone()
    }

    pub(crate) fn started_at(&self) -> Option<DateTime<Utc>> {
        self.extras.lock().unwrap().started_at
    }

    pub(crate) fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.extras.lock().unwrap().finished_at
    }
}

fn total_batches_estimate(remaining_points: usize, chunk_size: usize) -> usize {
    if remaining_points == 0 {
        return 0;
    }
    let chunk_size = chunk_size.max(1);
    remaining_points.div_ceil(chunk_size)
}
