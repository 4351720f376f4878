mod config;
mod error;
mod latency;
mod quality;
mod report;
mod throughput;
mod traits;
mod transport;
mod types;
mod utils;
mod workers;

#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use clap::Parser;
use quality::QualityTest;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use transport::HttpTransport;
use types::TestConfig;

const QUICK_TEST_DURATION: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "netquality", version)]
#[command(about = "Test network quality and performance", long_about = None)]
struct Cli {
    /// Test duration in seconds (default: 10)
    #[arg(short, long)]
    duration: Option<u64>,

    /// Number of parallel connections (default: 4)
    #[arg(short, long)]
    connections: Option<usize>,

    /// Quick test (5 seconds)
    #[arg(short, long)]
    quick: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Settings file (defaults to the user config.toml, if present)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    utils::init_logging(cli.verbose);

    let config = build_config(&cli)?;
    config.validate()?;

    println!("Networkquality");
    println!("==============");

    if cli.verbose {
        println!("Configuration:");
        println!("  Test duration: {:?}", config.test_duration);
        println!("  Connections: {}", config.connections);
        println!("  Download: {}", config.download_endpoint());
        println!("  Latency probe: {}", config.latency_endpoint());
        println!("  Upload: {}", config.upload_endpoints.join(", "));
        println!();
    }

    let cancel = CancellationToken::new();
    watch_interrupt(cancel.clone());

    let transport = Arc::new(
        HttpTransport::new(config.transfer_timeout).context("Failed to create HTTP client")?,
    );

    let pb = utils::spinner();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let progress = {
        let pb = pb.clone();
        tokio::spawn(async move {
            while let Some(stage) = rx.recv().await {
                pb.set_message(utils::stage_message(stage));
            }
        })
    };

    let start = Instant::now();
    let outcome = QualityTest::new(transport, config, cancel)
        .with_progress(tx)
        .run()
        .await;
    // the sender went away with the test, so this returns right away
    let _ = progress.await;
    let elapsed = start.elapsed();

    match outcome {
        Ok(result) => {
            pb.finish_with_message("done");
            println!();
            print!("{}", report::render(&result));
            if cli.verbose {
                println!("\nTest completed in {:.2} seconds", elapsed.as_secs_f64());
            }
            Ok(())
        }
        Err(e) if e.is_cancelled() => {
            pb.abandon_with_message("interrupted");
            println!("\n\nTest interrupted by user");
            Ok(())
        }
        Err(e) => {
            pb.abandon_with_message("failed");
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// defaults < config file < command-line flags
fn build_config(cli: &Cli) -> Result<TestConfig> {
    let mut config = config::resolve(cli.config.as_deref())?;

    if let Some(secs) = cli.duration {
        config.test_duration = Duration::from_secs(secs);
    }
    if cli.quick {
        config.test_duration = QUICK_TEST_DURATION;
    }
    if let Some(connections) = cli.connections {
        config.connections = connections;
    }

    Ok(config)
}

/// Ctrl-C or SIGTERM asks the running test to stop after its in-flight requests.
fn watch_interrupt(cancel: CancellationToken) {
    tokio::spawn(async move {
        shutdown_signal().await;
        cancel.cancel();
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Unable to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Unable to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
