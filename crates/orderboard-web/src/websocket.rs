//! STOMP-over-WebSocket endpoint for board displays.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use orderboard_core::stomp::{Frame, SessionAction, StompSession};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{interval_at, Instant, Interval};
use tracing::{debug, error, info, warn};

use crate::state::AppState;

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Drive one display connection until either side closes it.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut updates = state.broadcaster.subscribe();
    let mut session = StompSession::new(&state.config);
    let mut heartbeat: Option<Interval> = None;

    info!(
        receiver_count = state.broadcaster.receiver_count(),
        "Board display connected"
    );

    loop {
        tokio::select! {
            inbound = receiver.next() => {
                let text = match inbound {
                    Some(Ok(Message::Text(text))) => text.to_string(),
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => text,
                        Err(_) => {
                            debug!("Dropping non UTF-8 binary message");
                            continue;
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("Board display closed the socket");
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        debug!(error = %e, "WebSocket receive failed");
                        break;
                    }
                };

                let mut closing = false;
                for action in session.handle_text(&text) {
                    match action {
                        SessionAction::Reply(frame) => {
                            if !send_frame(&mut sender, &frame).await {
                                closing = true;
                                break;
                            }
                        }
                        SessionAction::RefreshBoard => {
                            if let Err(e) = state.broadcaster.on_client_message(&text) {
                                error!(error = %e, "Failed to publish order board");
                            }
                        }
                        SessionAction::Close => closing = true,
                    }
                }
                if closing {
                    let _ = sender.close().await;
                    break;
                }

                if heartbeat.is_none() {
                    if let Some(period) = session.heartbeat_interval() {
                        heartbeat = Some(interval_at(Instant::now() + period, period));
                    }
                }
            }
            update = updates.recv() => {
                match update {
                    Ok(update) => {
                        let mut delivered = true;
                        for frame in session.render_update(&update) {
                            if !send_frame(&mut sender, &frame).await {
                                delivered = false;
                                break;
                            }
                        }
                        if !delivered {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Board display fell behind, skipping to newest snapshot");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            _ = next_heartbeat(&mut heartbeat) => {
                if sender.send(Message::Text(String::from("\n").into())).await.is_err() {
                    break;
                }
            }
        }
    }

    info!("Board display disconnected");
}

async fn send_frame(sender: &mut SplitSink<WebSocket, Message>, frame: &Frame) -> bool {
    debug!(command = %frame.command, "Sending STOMP frame");
    match sender.send(Message::Text(frame.encode().into())).await {
        Ok(()) => true,
        Err(e) => {
            debug!(error = %e, "WebSocket send failed, client disconnected");
            false
        }
    }
}

/// Resolves on the next heart-beat tick, or never if heart-beats are off.
async fn next_heartbeat(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
