//! gadgetforge CLI
//!
//! Generates every gadget payload artifact in one run.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// gadgetforge - gadget-chain payload generator
#[derive(Parser, Debug)]
#[command(name = "gadgetforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Gadget classification config
    #[arg(long, env = "GADGETFORGE_CONFIG", default_value = "../static/config.yaml")]
    config: PathBuf,

    /// Directory artifacts are written to
    #[arg(long, env = "GADGETFORGE_OUTPUT", default_value = "../static/gadgets")]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    commands::generate::run(&cli.config, &cli.output).await
}
