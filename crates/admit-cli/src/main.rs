//! `admit`: drive the admission wizard from the command line
//!
//! Every invocation resumes the session from the configured store, performs
//! one action and prints the resulting state.

mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use commands::Command;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "admit", version, about = "Resumable university admission wizard")]
struct Args {
    /// Path to the TOML configuration
    #[arg(short, long, default_value = "admit.toml", env = "ADMIT_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = admit_flow::WizardConfig::load(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    if config.storage.backend == admit_flow::StorageBackend::Memory {
        tracing::warn!("Memory storage does not outlive this invocation");
    }

    let ports = commands::build_ports(&config)?;
    let report = commands::execute(args.command, ports).await?;
    println!("{report}");
    Ok(())
}
