//! Web server command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use orderboard_core::{BoardConfig, OrderBoardRegistry, OrderBoardState};
use tracing::info;

#[derive(Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(long, env = "ORDERBOARD_PORT")]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long, env = "ORDERBOARD_HOST")]
    pub host: Option<String>,

    /// Board snapshot (JSON) of orders still in flight, loaded before serving
    #[arg(long)]
    pub restore: Option<PathBuf>,

    /// Also write logs to a file
    #[arg(long)]
    pub log: bool,

    /// Log file used with --log (defaults to ./orderboard.log)
    #[arg(long, requires = "log")]
    pub log_file: Option<PathBuf>,
}

pub async fn execute(args: ServeArgs, mut config: BoardConfig) -> Result<()> {
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    let registry = Arc::new(OrderBoardRegistry::new());
    if let Some(path) = &args.restore {
        restore_from(&registry, path)?;
    }

    println!();
    println!("  {} {}", "Order".cyan().bold(), "Board".bold());
    println!();
    println!(
        "  {}        http://{}:{}/api/board",
        "API".green(),
        config.host,
        config.port
    );
    println!(
        "  {}  ws://{}:{}{}",
        "WebSocket".green(),
        config.host,
        config.port,
        config.ws_path
    );
    println!(
        "  {}      {}",
        "Topic".green(),
        config.topic
    );
    println!();
    println!("  {}", "Ctrl+C to stop".dimmed());
    println!();

    orderboard_web::run_server(config, registry).await?;

    Ok(())
}

/// Seed the registry from a board snapshot file.
fn restore_from(registry: &OrderBoardRegistry, path: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let state = OrderBoardState::from_json(&raw)
        .with_context(|| format!("Invalid board snapshot in {}", path.display()))?;
    registry.restore(state.live_codes, state.ready_codes);
    info!(path = %path.display(), "Restored in-flight orders");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use orderboard_core::BoardCode;

    fn code(n: u8) -> BoardCode {
        BoardCode::new(n).unwrap()
    }

    #[test]
    fn test_restore_from_snapshot_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"liveOrderBoardCodes":["03","07"],"liveOrderBoardReadyCodes":["05"]}}"#
        )
        .unwrap();

        let registry = OrderBoardRegistry::new();
        restore_from(&registry, file.path()).unwrap();

        let board = registry.snapshot();
        assert_eq!(board.live_codes, vec![code(3), code(7)]);
        assert_eq!(board.ready_codes, vec![code(5)]);
        assert_eq!(registry.generate_code(), code(8));
    }

    #[test]
    fn test_restore_rejects_bad_files() {
        let registry = OrderBoardRegistry::new();
        assert!(restore_from(&registry, Path::new("/nonexistent/board.json")).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(restore_from(&registry, file.path()).is_err());
        assert!(registry.is_empty());
    }
}
