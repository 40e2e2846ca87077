//! CLI command definitions and handlers.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use orderboard_core::BoardConfig;

pub mod serve;
pub mod watch;

/// Live order board for restaurant pickup screens
#[derive(Parser)]
#[command(name = "orderboard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true, env = "ORDERBOARD_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the order board server
    Serve(serve::ServeArgs),

    /// Connect as a board display and print every snapshot
    Watch(watch::WatchArgs),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = load_config(self.config.as_deref())?;
        match self.command {
            Commands::Serve(args) => serve::execute(args, config).await,
            Commands::Watch(args) => watch::execute(args, config).await,
        }
    }
}

/// Defaults, overlaid with the config file when one is given.
fn load_config(path: Option<&Path>) -> Result<BoardConfig> {
    match path {
        Some(path) => BoardConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(BoardConfig::default()),
    }
}
