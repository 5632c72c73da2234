// Path: crates/cli/src/main.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # oraclegate CLI
//!
//! The operator toolchain for oraclegate: derive query identifiers, report and
//! dispute values, inspect the store, and evaluate conditions.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod util;

use commands::*;

#[derive(Parser, Debug)]
#[clap(
    name = "oraclegate",
    version,
    about = "Query/response tooling for oracle-gated releases.",
    long_about = "Derives query identifiers, submits and disputes reported values, inspects retrieval results and evaluates release conditions against a local value store."
)]
struct Cli {
    /// Path to the TOML configuration.
    #[clap(long, global = true, default_value = "oraclegate.toml")]
    config: PathBuf,

    /// Print Prometheus metrics to stdout after the command completes.
    #[clap(long, global = true)]
    metrics: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate and validate configuration files.
    Config(config::ConfigCmdArgs),

    /// Derive identifiers and read reported values.
    Query(query::QueryArgs),

    /// Submit, dispute and encode values as a reporter.
    Report(report::ReportArgs),

    /// Evaluate a registered condition, optionally acting on it once.
    Evaluate(evaluate::EvaluateArgs),
}

fn install_metrics() -> Result<()> {
    let sink = oraclegate_telemetry::prometheus::install().context("failed to register metrics")?;
    if oraclegate_telemetry::sinks::SINK.set(sink).is_err() {
        tracing::warn!("metrics sink already installed");
    }
    if oraclegate_storage::metrics::SINK.set(sink).is_err() {
        tracing::warn!("storage metrics sink already installed");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    oraclegate_telemetry::init::init_tracing("info")?;
    if cli.metrics {
        install_metrics()?;
    }

    let result = match cli.command {
        Commands::Config(args) => config::run(args, &cli.config),
        Commands::Query(args) => query::run(args, &cli.config).await,
        Commands::Report(args) => report::run(args, &cli.config),
        Commands::Evaluate(args) => evaluate::run(args, &cli.config).await,
    };

    if cli.metrics {
        print!("{}", oraclegate_telemetry::prometheus::render()?);
    }
    result
}
