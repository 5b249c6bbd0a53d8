//! cloudshell gateway (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌───────────────────────────────────────────────────┐
//!                      │                    GATEWAY                        │
//!                      │                                                   │
//!   Browser            │  ┌───────────┐   ┌──────────────┐   ┌──────────┐  │
//!   ───────────────────┼─▶│ lifecycle │──▶│ http request │──▶│  routes  │  │
//!                      │  │  server   │   │   logging    │   │          │  │
//!                      │  └───────────┘   └──────────────┘   └────┬─────┘  │
//!                      │                                          │        │
//!                      │        ┌───────────────┬─────────────────┼──────┐ │
//!                      │        ▼               ▼                 ▼      │ │
//!                      │  ┌───────────┐  ┌─────────────┐  ┌────────────┐ │ │
//!                      │  │ embedded  │  │ healthz /   │  │  session   │─┼─┼──▶ terminal
//!                      │  │    UI     │  │ readyz /    │  │   bridge   │ │ │
//!                      │  │           │  │ metric      │  │            │ │ │
//!                      │  └───────────┘  └─────────────┘  └────────────┘ │ │
//!                      │                                                   │
//!                      │  config · observability (logs, metrics, memory)   │
//!                      └───────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use cloudshell::config::{load_config, Config};
use cloudshell::http::{Gateway, Unattached};
use cloudshell::lifecycle::{signals, startup, ServerLifecycle};
use cloudshell::observability::{alloc::CountingAlloc, logging, memory::MemoryTelemetry, metrics};

#[global_allocator]
static GLOBAL: CountingAlloc = CountingAlloc;

#[derive(Parser)]
#[command(name = "cloudshell")]
#[command(about = "Browser terminal gateway", long_about = None)]
struct Cli {
    /// Path to the configuration file (YAML or TOML).
    #[arg(short, long, env = "CLOUDSHELL_CONFIG", default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to parse configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(config.log_format, config.log_level) {
        eprintln!("failed to initialise logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("cloudshell v{} starting", env!("CARGO_PKG_VERSION"));
    if let Ok(wd) = std::env::current_dir() {
        tracing::info!("working directory     : '{}'", wd.display());
    }
    Gateway::log_summary(&config);

    let metrics = metrics::install_recorder()?;
    let gateway = Gateway::new(&config, Arc::new(Unattached), metrics);

    let mut lifecycle = ServerLifecycle::new(config.shutdown_timeout());
    lifecycle.spawn_background("memory telemetry", |stop| MemoryTelemetry::default().run(stop));

    let address = config.listen_address();
    tracing::info!("starting server on interface:port '{}'...", address);
    let listener = startup::bind(&address)?;
    lifecycle.start(listener, gateway.router()).await?;

    match signals::interruption().await {
        Ok(signal) => tracing::info!(signal = %signal, "got interruption signal"),
        Err(e) => tracing::error!(error = %e, "failed to listen for signals, shutting down"),
    }

    lifecycle.stop().await;

    tracing::info!("server exit");
    Ok(())
}
