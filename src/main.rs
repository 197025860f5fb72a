//! Keystation32 demo driver
//!
//! Opens the keyboard and prints every key and button press.

use clap::Parser;
use tracing::debug;

use keystation::KeystationConfig;

// CLI definitions
mod cli;
use cli::{Cli, Commands};

// Command handlers
mod commands;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Some(Commands::List) => commands::utility::list(),
        None => {
            let config = load_config(cli.config.as_deref())?;
            commands::listen::listen(config)
        }
        Some(Commands::Listen { vid, pid }) => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(vid) = vid {
                config.vendor_id = vid;
            }
            if let Some(pid) = pid {
                config.product_id = pid;
            }
            commands::listen::listen(config)
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<KeystationConfig> {
    let path = path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(KeystationConfig::default_path);
    debug!("Loading config from {:?}", path);
    Ok(KeystationConfig::load(&path)?)
}
