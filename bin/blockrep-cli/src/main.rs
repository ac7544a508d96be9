//! blockrep CLI - Replicated block client
//!
//! Writes or reads the block behind one path against a primary/backup pair
//! of block stores, retrying and failing over between them.

use anyhow::{Context, Result};
use blockrep_client::ReplicationCoordinator;
use blockrep_common::ClientConfig;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "blockrep")]
#[command(about = "Replicated block store client")]
#[command(version)]
struct Args {
    /// Primary replica address (default localhost:50051)
    #[arg(long)]
    primary: Option<String>,

    /// Backup replica address (default localhost:50052)
    #[arg(long)]
    backup: Option<String>,

    /// Configuration file path (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Attempts per replica before failing over
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store data as the content of the block behind a path
    Write {
        /// File path naming the block
        path: String,
        /// Inline data to store
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        data: Option<String>,
        /// Local file whose content is stored
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Fetch the content of the block behind a path
    Read {
        /// File path naming the block
        path: String,
        /// Write the payload here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

/// Load the config file if one was given, then let CLI flags take precedence
fn load_config(args: &Args) -> Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            ClientConfig::from_toml(&contents)
                .with_context(|| format!("failed to parse config file {}", path.display()))?
        }
        None => ClientConfig::default(),
    };

    if let Some(primary) = &args.primary {
        config.primary.clone_from(primary);
    }
    if let Some(backup) = &args.backup {
        config.backup.clone_from(backup);
    }
    if let Some(max_attempts) = args.max_attempts {
        config.retry.max_attempts = max_attempts;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(&args).inspect_err(|e| error!("{:#}", e))?;
    let client = ReplicationCoordinator::connect(&config)
        .inspect_err(|e| error!("Failed to initialize client: {}", e))
        .context("invalid client configuration")?;
    info!("Primary: {}, backup: {}", config.primary, config.backup);

    match args.command {
        Commands::Write { path, data, file } => {
            let payload = match (data, file) {
                (Some(data), _) => data.into_bytes(),
                (None, Some(file)) => std::fs::read(&file)
                    .with_context(|| format!("failed to read {}", file.display()))?,
                (None, None) => anyhow::bail!("one of --data or --file is required"),
            };
            let receipt = client.write(&path, &payload).await?;
            info!(
                "Block {} stored on {} ({} bytes)",
                receipt.block_id,
                receipt.replica,
                payload.len()
            );
            println!("{receipt}");
        }
        Commands::Read { path, out } => {
            let receipt = client.read(&path).await?;
            info!(
                "Block {} served by {} ({} bytes)",
                receipt.block_id,
                receipt.replica,
                receipt.payload.len()
            );
            match out {
                Some(out) => {
                    std::fs::write(&out, &receipt.payload)
                        .with_context(|| format!("failed to write {}", out.display()))?;
                    println!("{receipt}");
                }
                None => {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(&receipt.payload)?;
                    stdout.flush()?;
                    eprintln!("{receipt}");
                }
            }
        }
    }

    Ok(())
}
