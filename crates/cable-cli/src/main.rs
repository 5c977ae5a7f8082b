mod cli;
mod constants;
mod shutdown;

use std::fs;
use std::sync::Arc;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use cable_engine::api::{EngineConfig, JobCoordinator, StartJobRequest, StatusSnapshot};

use crate::cli::Cli;
use crate::constants::{PAUSE_AFTER_DEMO_DELAY, STATUS_POLL_INTERVAL};
use crate::shutdown::{ShutdownController, ShutdownEvent, spawn_ctrl_c_handler};

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

fn load_points(path: &std::path::Path) -> anyhow::Result<Vec<serde_json::Value>> {
    let raw = fs::read_to_string(path).map_err(|err| anyhow::anyhow!("reading {}: {err}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    let points = value
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("{} must contain a JSON array of points", path.display()))?
        .clone();
    Ok(points)
}

fn progress_bar(total_points: usize) -> ProgressBar {
    let bar = ProgressBar::new(total_points as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} points — {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );
    bar
}

fn summary_line(snapshot: &StatusSnapshot) -> String {
    match snapshot.status.as_str() {
        "completed" => format!(
            "done: {} points in {} batches",
            snapshot.sent_points, snapshot.sent_batches
        ),
        "failed" => format!("failed: {}", snapshot.error.as_deref().unwrap_or("unknown error")),
        "cancelled" => "cancelled".to_string(),
        other => format!("unexpected terminal status: {other}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let points = load_points(&cli.points_file)?;
    let total_points = points.len();

    let coordinator = Arc::new(JobCoordinator::new(EngineConfig::default())?);

    let mut request = StartJobRequest::new(cli.controller_url.to_string(), points, cli.speed);
    request.reset = !cli.no_reset;
    request.status_url = cli.status_url.map(|url| url.to_string());
    request.cancel_url = cli.cancel_url.map(|url| url.to_string());

    let started = coordinator.start_job(request).await?;
    tracing::info!(job_id = %started.job_id, total_points, "job started");

    let shutdown = Arc::new(ShutdownController::new());
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::unbounded_channel::<ShutdownEvent>();
    spawn_ctrl_c_handler(shutdown.clone(), shutdown_tx);

    let bar = progress_bar(total_points);
    bar.set_message(started.status.clone());

    let mut paused_for_demo = false;
    let mut ticker = tokio::time::interval(STATUS_POLL_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let final_snapshot = loop {
        tokio::select! {
            ev = shutdown_rx.recv() => {
                match ev {
                    Some(ShutdownEvent::Graceful) => {
                        bar.set_message("cancelling...".to_string());
                        coordinator.cancel();
                    }
                    Some(ShutdownEvent::Immediate) => {
                        bar.abandon_with_message("interrupted");
                        std::process::exit(130);
                    }
                    None => {}
                }
            }
            _ = ticker.tick() => {
                let Some(snapshot) = coordinator.status() else {
                    warn!("job disappeared before reaching a terminal state");
                    break None;
                };

                bar.set_position(snapshot.sent_points as u64);
                bar.set_message(snapshot.status.clone());

                if let Some(threshold) = cli.pause_after {
                    if !paused_for_demo && snapshot.sent_points >= threshold && snapshot.status == "running" {
                        paused_for_demo = true;
                        bar.set_message("pausing (--pause-after demo)".to_string());
                        coordinator.pause();
                        let coordinator = coordinator.clone();
                        tokio::spawn(async move {
                            tokio::time::sleep(PAUSE_AFTER_DEMO_DELAY).await;
                            coordinator.resume();
                        });
                    }
                }

                if snapshot.status.as_str() != "running" && snapshot.status.as_str() != "cancelling" && snapshot.status.as_str() != "pending" {
                    break Some(snapshot);
                }
            }
        }
    };

    bar.finish_and_clear();

    match final_snapshot {
        Some(snapshot) => {
            println!("{}", summary_line(&snapshot));
            if snapshot.status == "failed" {
                std::process::exit(1);
            }
        }
        None => println!("job status unavailable"),
    }

    Ok(())
}
