use crate::types::Stage;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const SPINNER_TICK: Duration = Duration::from_millis(120);

/// Logs go to stderr so they never interleave with the summary on stdout.
/// RUST_LOG wins over the verbosity flag.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// "Running network quality test... |" spinner
pub fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{prefix:.yellow} {spinner:.yellow} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("|/-\\ ");
    pb.set_style(style);
    pb.set_prefix("Running network quality test...");
    pb.enable_steady_tick(SPINNER_TICK);
    pb
}

pub fn stage_message(stage: Stage) -> String {
    match stage {
        Stage::IdleLatency => "measuring idle latency".to_string(),
        Stage::Download => "measuring download and loaded latency".to_string(),
        Stage::Upload => "measuring upload".to_string(),
    }
}
