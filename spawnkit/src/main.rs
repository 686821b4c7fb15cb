//! spawnkit - agent fleet telemetry from the terminal.
//!
//! Reads an OpenClaw state directory (or a relay), reconciles it into a
//! canonical snapshot and prints it, its changes, or structured sub-task names.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod cli;
mod commands;
mod config;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so JSON output stays clean.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("spawnkit=info".parse()?))
        .init();

    let cli = Cli::parse();

    let mut config = config::Config::load()?;
    config.apply_flags(&cli.provider);

    match cli.command {
        Commands::Watch { json } => commands::watch::execute(json, &config).await,
        Commands::Snapshot { compact } => commands::snapshot::execute(compact, &config).await,
        Commands::Status { json } => commands::status::execute(json, &config).await,
        Commands::Name(cmd) => commands::name::execute(cmd, &config).await,
        Commands::Version => {
            println!("spawnkit {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
