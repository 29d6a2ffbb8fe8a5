//! Lifecycle demo.
//!
//! Builds a dispatcher of simulated components from a TOML file, starts it,
//! holds it running, stops it and prints the final status.
//!
//! ```text
//!   config.toml ─▶ loader ─▶ Dispatcher::from_config
//!                                   │
//!        start: transports ─▶ outbounds ─▶ inbounds
//!                                   │
//!                      hold (--hold-ms or Ctrl-C/SIGTERM)
//!                                   │
//!        stop:  inbounds ─▶ outbounds ─▶ transports
//!                                   │
//!                           status (text or --json)
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::time::Instant;

use transport_lifecycle::config::{load_config, DemoConfig};
use transport_lifecycle::dispatcher::DispatcherError;
use transport_lifecycle::lifecycle::signals::shutdown_signal;
use transport_lifecycle::observability::{logging, metrics};
use transport_lifecycle::Dispatcher;

#[derive(Parser)]
#[command(name = "lifecycle-demo")]
#[command(about = "Start and stop simulated transports in dependency order", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stay running this long before stopping; waits for Ctrl-C when omitted.
    #[arg(long)]
    hold_ms: Option<u64>,

    /// Print the final status as JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => DemoConfig::default(),
    };

    logging::init_logging(&config.observability)?;

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let dispatcher = Dispatcher::from_config(&config);
    tracing::info!(
        id = %dispatcher.id(),
        name = %dispatcher.name(),
        components = config.components.len(),
        "Dispatcher built"
    );

    let deadline = Instant::now() + Duration::from_millis(config.dispatcher.ready_timeout_ms);
    let (started, ready) = tokio::join!(dispatcher.start(), dispatcher.when_running(Some(deadline)));

    if let Err(e) = started {
        if let Some(failure) = DispatcherError::from_lifecycle(&e) {
            for (name, action, source) in failure.failures() {
                tracing::error!(component = name, %action, error = %source, "Component failed");
            }
        }
        print_status(&dispatcher, cli.json)?;
        return Err(e.into());
    }
    if let Err(e) = ready {
        tracing::warn!(error = %e, "Dispatcher was not ready within the configured timeout");
    }

    match cli.hold_ms {
        Some(ms) => {
            tracing::info!(hold_ms = ms, "Holding dispatcher running");
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        None => {
            tracing::info!("Running until Ctrl-C or SIGTERM");
            shutdown_signal().await;
        }
    }

    let stopped = dispatcher.stop().await;
    print_status(&dispatcher, cli.json)?;
    stopped?;
    Ok(())
}

fn print_status(dispatcher: &Dispatcher, json: bool) -> Result<(), serde_json::Error> {
    let status = dispatcher.status();
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{} ({}): {}", status.name, status.id, status.state);
    for component in &status.components {
        println!(
            "  {:<9} {:<24} {}",
            component.kind.as_str(),
            component.name,
            component.state.as_str()
        );
    }
    Ok(())
}
