use std::path::PathBuf;

use clap::Parser;
use reqwest::Url;

fn parse_url(input: &str) -> Result<Url, String> {
    Url::parse(input).map_err(|err| format!("invalid URL: {err}"))
}

#[derive(Debug, Clone, Parser)]
#[command(name = "cable-cli", version, about = "Polargraph path transmission worker")]
pub struct Cli {
    /// Path to a JSON file holding an array of points (objects, [x,y] pairs, or [x,y,penDown] triples).
    pub points_file: PathBuf,

    /// Base URL the controller receives batch sends on.
    #[arg(long, env = "CABLE_CONTROLLER_URL", value_parser = parse_url)]
    pub controller_url: Url,

    /// Status endpoint override; derived from `controller-url` when absent.
    #[arg(long, env = "CABLE_STATUS_URL", value_parser = parse_url)]
    pub status_url: Option<Url>,

    /// Cancel endpoint override; derived from `controller-url` when absent.
    #[arg(long, env = "CABLE_CANCEL_URL", value_parser = parse_url)]
    pub cancel_url: Option<Url>,

    /// Motor speed passed through to the controller, unvalidated.
    #[arg(long, env = "CABLE_SPEED", default_value_t = 1800)]
    pub speed: u32,

    /// Send each batch with `reset: false` instead of `reset: true`. The
    /// controller's start position is always fetched or required either way.
    #[arg(long, default_value_t = false)]
    pub no_reset: bool,

    /// Pause the job after this many points have been sent, then resume a
    /// second later — exercises the pause/resume control surface.
    #[arg(long, value_name = "N")]
    pub pause_after: Option<usize>,
}
