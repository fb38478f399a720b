//! worldhost - world and dimension lifecycle host
//!
//! Boots the world manager from `worldhost.toml` and runs its control loop,
//! or performs one administrative world operation.

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use commands::Command;
use config::HostConfig;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "World and dimension lifecycle host", long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    info!("Starting worldhost v{}", env!("CARGO_PKG_VERSION"));
    let config = HostConfig::load_from_path(&args.config);
    commands::execute(args.command, &config).await
}
