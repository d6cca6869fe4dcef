//! Crosspost CLI entry point.
//!
//! This binary is the composition root for the entire system:
//!
//! 1. **Parse arguments** with `clap`.
//! 2. **Load configuration** from defaults, TOML files and `CROSSPOST_*`
//!    variables, and validate it before anything else runs.
//! 3. **Wire observability**: `tracing-subscriber` console output plus an
//!    optional OpenTelemetry OTLP exporter. Every span and audit event emitted
//!    by the workspace crates flows through this subscriber.
//! 4. **Construct infrastructure** (fingerprint cache, failure store, platform
//!    registry, chat-completions client) and dispatch the command.
//!
//! Publishing to real platforms is not wired here; no deliverers are
//! registered, so the CLI covers analysis, generation and maintenance.

use anyhow::Context;
use clap::Parser;

mod cli;
mod commands;
mod config;
mod telemetry;

use crate::cli::Cli;
use crate::config::CrosspostConfig;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("crosspost error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = CrosspostConfig::load().context("failed to load configuration")?;
    let _telemetry = telemetry::init(&config.telemetry, cli.verbose)?;

    let app = commands::App::open(config)?;
    commands::dispatch(cli.command, &app).await
}
