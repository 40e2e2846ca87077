//! Terminal board display.

use std::time::Duration;

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use futures::{SinkExt, StreamExt};
use orderboard_core::stomp::{BoardClient, ClientEvent, ClientState};
use orderboard_core::{BoardConfig, OrderBoardState};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Args)]
pub struct WatchArgs {
    /// WebSocket endpoint of the order board server
    #[arg(long, default_value = "ws://127.0.0.1:8080/ws")]
    pub url: String,

    /// Print the first board and exit
    #[arg(long)]
    pub once: bool,
}

pub async fn execute(args: WatchArgs, config: BoardConfig) -> Result<()> {
    let mut backoff = INITIAL_BACKOFF;

    loop {
        let mut subscribed = false;
        let session = run_session(&args.url, &config, args.once, &mut subscribed);
        let result = tokio::select! {
            result = session => result,
            _ = tokio::signal::ctrl_c() => return Ok(()),
        };

        match result {
            Ok(()) => return Ok(()),
            Err(e) if args.once => return Err(e),
            Err(e) => {
                let delay = retry_delay(backoff, subscribed);
                warn!(error = %e, retry_in = ?delay, "Board connection lost");
                tokio::time::sleep(delay).await;
                backoff = (delay * 2).min(MAX_BACKOFF);
            }
        }
    }
}

/// Delay before the next reconnect. A session that got as far as
/// subscribing starts the sequence over.
fn retry_delay(backoff: Duration, subscribed: bool) -> Duration {
    if subscribed {
        INITIAL_BACKOFF
    } else {
        backoff
    }
}

/// One connection. Returns `Ok` only on a clean, requested close.
async fn run_session(
    url: &str,
    config: &BoardConfig,
    once: bool,
    subscribed: &mut bool,
) -> Result<()> {
    let (ws, _) = tokio_tungstenite::connect_async(url).await?;
    let (mut sink, mut stream) = ws.split();
    let mut client = BoardClient::from_config(host_of(url), config);
    info!(url, "Connected to order board");

    sink.send(Message::text(client.connect().encode())).await?;

    while let Some(msg) = stream.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                client.on_transport_failure();
                return Err(e.into());
            }
        };
        let text = match msg {
            Message::Text(_) | Message::Binary(_) => msg.to_text()?.to_string(),
            Message::Close(_) => break,
            _ => continue,
        };

        for event in client.handle_text(&text)? {
            match event {
                ClientEvent::Send(frame) => {
                    sink.send(Message::text(frame.encode())).await?;
                    if client.state() == ClientState::Subscribed {
                        *subscribed = true;
                    }
                }
                ClientEvent::Board(board) => {
                    print_board(&board);
                    if once {
                        if let Some(frame) = client.disconnect() {
                            sink.send(Message::text(frame.encode())).await?;
                        }
                        let _ = sink.close().await;
                        return Ok(());
                    }
                }
                ClientEvent::Receipt(id) => debug!(receipt = %id, "Receipt received"),
                ClientEvent::ServerError(message) => bail!("server rejected session: {message}"),
            }
        }
    }

    client.on_transport_failure();
    bail!("connection closed by server")
}

/// Host part of a `ws://host:port/path` URL, sent in the CONNECT frame.
fn host_of(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split('/').next().unwrap_or(rest);
    authority.rsplit_once(':').map_or(authority, |(host, _)| host)
}

fn print_board(board: &OrderBoardState) {
    let join = |codes: &[orderboard_core::BoardCode]| {
        codes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    };

    println!();
    println!("  {}  {}", "Preparing".yellow().bold(), join(&board.live_codes));
    println!("  {}      {}", "Ready".green().bold(), join(&board.ready_codes));
}
