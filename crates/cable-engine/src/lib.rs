#![forbid(unsafe_code)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]

//! Async single-job scheduler for a polargraph controller: turns a
//! normalized polyline into cable-length batches, paces them against the
//! controller's queue telemetry, and exposes a start/status/pause/resume/cancel surface.

/// Public API for the engine crate.
pub mod api;

mod config;
mod controller;
mod coordinator;
mod error;
mod flow;
mod job;
mod retry;
mod worker;

pub use api::{EngineConfig, EngineError, FlowConfig, JobConfig, JobCoordinator, JobStatus, StartJobRequest, StatusSnapshot, TimingConfig};
