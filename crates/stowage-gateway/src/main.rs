mod cli;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use stowage_gateway::{BackendRegistry, GatewayConfig};
use stowage_storage_core::{ProtocolDriver, StorageBackend};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{format_entry, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so listings stay clean on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = GatewayConfig::load(&cli.config)?;
    let registry = BackendRegistry::from_config(&config)
        .with_context(|| format!("unable to configure paths from {}", cli.config.display()))?;
    info!("Configured {} paths: {}", registry.len(), registry.segments().join(", "));

    let driver: Arc<dyn ProtocolDriver> = Arc::new(registry.into_router());

    match cli.command {
        Command::Check => {
            for entry in driver.read_directory("/").await? {
                println!("{}", entry.name);
            }
        }
        Command::Ls { path } => {
            for entry in driver.read_directory(&path).await? {
                println!("{}", format_entry(&entry));
            }
        }
        Command::Stat { path } => {
            let entry = driver.stat(&path).await?;
            println!("{}", format_entry(&entry));
        }
        Command::Mkdir { path } => {
            driver.create_directory(&path).await?;
            info!("Created {}", path);
        }
        Command::Put {
            local,
            path,
            append,
        } => {
            let mut file = tokio::fs::File::open(&local)
                .await
                .with_context(|| format!("failed to open {}", local.display()))?;
            let written = driver.write_file(&path, &mut file, append).await?;
            println!("{} bytes written to {}", written, path);
        }
    }

    Ok(())
}
