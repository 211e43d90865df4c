//! ckb animation host CLI
//!
//! Lists, inspects and runs keyboard animation scripts without a device.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use anim_driver::DriverConfig;

// CLI definitions
mod cli;
use cli::{Cli, Commands};

// Command handlers
mod commands;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load config
    let config_path = cli.config.unwrap_or_else(DriverConfig::default_path);
    info!("Loading config from {:?}", config_path);
    let mut config = DriverConfig::load(&config_path)?;
    if let Some(dir) = cli.dir {
        config.animations_dir = Some(dir);
    }

    match cli.command {
        Commands::List { json } => commands::catalog::list(&config, json),
        Commands::Info { path } => commands::catalog::info(&config, &path),
        Commands::Run {
            animation,
            keys,
            params,
            seconds,
            fps,
            presses,
        } => {
            if let Some(fps) = fps {
                config.fps = fps;
            }
            let options = commands::run::RunOptions {
                animation,
                keys,
                params,
                seconds,
                presses,
            };
            commands::run::run(&config, &options)
        }
    }
}
