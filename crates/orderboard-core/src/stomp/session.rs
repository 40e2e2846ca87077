//! Server side of one STOMP connection.
//!
//! The session holds no I/O. It turns inbound frames into [`SessionAction`]s
//! for the transport to carry out and renders board updates into MESSAGE
//! frames for the subscriptions it holds.

use std::time::Duration;

use tracing::{debug, warn};

use crate::broadcaster::BoardUpdate;
use crate::config::BoardConfig;
use crate::stomp::frame::{Command, Frame};

/// Protocol versions offered in CONNECTED, preferred first.
const SUPPORTED_VERSIONS: [&str; 3] = ["1.2", "1.1", "1.0"];

/// What the transport should do after a frame was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Send this frame back to the client.
    Reply(Frame),
    /// Publish the current board to every subscriber.
    RefreshBoard,
    /// Close the connection once earlier replies are flushed.
    Close,
}

#[derive(Debug, Clone)]
struct Subscription {
    id: String,
    destination: String,
}

/// Per-connection STOMP state.
#[derive(Debug)]
pub struct StompSession {
    topic: String,
    app_destination: String,
    server_heartbeat_ms: u64,
    connected: bool,
    subscriptions: Vec<Subscription>,
    heartbeat: Option<Duration>,
    next_message_id: u64,
}

impl StompSession {
    pub fn new(config: &BoardConfig) -> Self {
        Self {
            topic: config.topic.clone(),
            app_destination: config.app_destination.clone(),
            server_heartbeat_ms: config.heartbeat_ms,
            connected: false,
            subscriptions: Vec::new(),
            heartbeat: None,
            next_message_id: 0,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Subscriptions that receive board updates.
    pub fn board_subscriptions(&self) -> usize {
        self.subscriptions
            .iter()
            .filter(|s| s.destination == self.topic)
            .count()
    }

    /// Negotiated interval for server heart-beats, if any.
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        self.heartbeat
    }

    /// Handle one WebSocket text message, which may hold several frames.
    pub fn handle_text(&mut self, raw: &str) -> Vec<SessionAction> {
        match Frame::parse_all(raw) {
            Ok(frames) => {
                let mut actions = Vec::new();
                for frame in frames {
                    let closing = self.handle(frame, &mut actions);
                    if closing {
                        break;
                    }
                }
                actions
            }
            Err(e) => {
                warn!(error = %e, "Rejecting malformed STOMP frame");
                self.fail("malformed frame", &e.to_string())
            }
        }
    }

    /// Handle a parsed frame. Returns `true` when the session is closing.
    fn handle(&mut self, frame: Frame, actions: &mut Vec<SessionAction>) -> bool {
        debug!(command = %frame.command, "STOMP frame received");

        if !self.connected && !matches!(frame.command, Command::Connect | Command::Stomp) {
            actions.extend(self.fail("not connected", "send CONNECT first"));
            return true;
        }

        match frame.command {
            Command::Connect | Command::Stomp => match self.on_connect(&frame) {
                Some(reply) => actions.push(SessionAction::Reply(reply)),
                None => {
                    actions.extend(self.fail(
                        "unsupported protocol version",
                        &format!("supported versions are {}", SUPPORTED_VERSIONS.join(",")),
                    ));
                    return true;
                }
            },
            Command::Subscribe => {
                let (Some(id), Some(destination)) = (frame.get("id"), frame.get("destination"))
                else {
                    actions.extend(self.fail("invalid SUBSCRIBE", "id and destination are required"));
                    return true;
                };
                self.subscriptions.retain(|s| s.id != id);
                self.subscriptions.push(Subscription {
                    id: id.to_string(),
                    destination: destination.to_string(),
                });
                debug!(id, destination, "Client subscribed");
            }
            Command::Unsubscribe => {
                let Some(id) = frame.get("id") else {
                    actions.extend(self.fail("invalid UNSUBSCRIBE", "id is required"));
                    return true;
                };
                self.subscriptions.retain(|s| s.id != id);
            }
            Command::Send => {
                let Some(destination) = frame.get("destination") else {
                    actions.extend(self.fail("invalid SEND", "destination is required"));
                    return true;
                };
                if destination == self.app_destination || destination == self.topic {
                    actions.push(SessionAction::RefreshBoard);
                } else {
                    debug!(destination, "Dropping SEND to unknown destination");
                }
            }
            Command::Disconnect => {
                if let Some(receipt) = frame.get("receipt") {
                    actions.push(SessionAction::Reply(receipt_frame(receipt)));
                }
                self.connected = false;
                self.subscriptions.clear();
                actions.push(SessionAction::Close);
                return true;
            }
            // Subscriptions are auto-ack and there are no transactions.
            Command::Ack | Command::Nack | Command::Begin | Command::Commit | Command::Abort => {}
            Command::Connected | Command::Message | Command::Receipt | Command::Error => {
                actions.extend(self.fail(
                    "unexpected frame",
                    &format!("{} is a server frame", frame.command),
                ));
                return true;
            }
        }

        if let Some(receipt) = frame.get("receipt") {
            actions.push(SessionAction::Reply(receipt_frame(receipt)));
        }
        false
    }

    fn on_connect(&mut self, frame: &Frame) -> Option<Frame> {
        let version = match frame.get("accept-version") {
            Some(accepted) => {
                let accepted: Vec<&str> = accepted.split(',').map(str::trim).collect();
                SUPPORTED_VERSIONS
                    .iter()
                    .find(|v| accepted.contains(*v))
                    .copied()?
            }
            None => "1.0",
        };

        // heart-beat: cx,cy where cy is how often the client wants to hear from us.
        let client_wants_ms = frame
            .get("heart-beat")
            .and_then(|hb| hb.split_once(','))
            .and_then(|(_, cy)| cy.trim().parse::<u64>().ok())
            .unwrap_or(0);
        self.heartbeat = (self.server_heartbeat_ms > 0 && client_wants_ms > 0)
            .then(|| Duration::from_millis(self.server_heartbeat_ms.max(client_wants_ms)));

        self.connected = true;
        debug!(version, heartbeat = ?self.heartbeat, "STOMP session connected");

        Some(
            Frame::new(Command::Connected)
                .header("version", version)
                .header("heart-beat", format!("{},0", self.server_heartbeat_ms)),
        )
    }

    /// One MESSAGE frame per subscription to the board topic.
    pub fn render_update(&mut self, update: &BoardUpdate) -> Vec<Frame> {
        let topic = self.topic.clone();
        let ids: Vec<String> = self
            .subscriptions
            .iter()
            .filter(|s| s.destination == topic)
            .map(|s| s.id.clone())
            .collect();

        ids.into_iter()
            .map(|id| {
                self.next_message_id += 1;
                Frame::new(Command::Message)
                    .header("destination", topic.as_str())
                    .header("content-type", "application/json")
                    .header("subscription", id)
                    .header("message-id", format!("{}-{}", update.sequence, self.next_message_id))
                    .header("content-length", update.body.len().to_string())
                    .body(&*update.body)
            })
            .collect()
    }

    fn fail(&mut self, message: &str, detail: &str) -> Vec<SessionAction> {
        self.connected = false;
        self.subscriptions.clear();
        vec![
            SessionAction::Reply(error_frame(message, detail)),
            SessionAction::Close,
        ]
    }
}

fn receipt_frame(receipt: &str) -> Frame {
    Frame::new(Command::Receipt).header("receipt-id", receipt)
}

fn error_frame(message: &str, detail: &str) -> Frame {
    Frame::new(Command::Error)
        .header("message", message)
        .header("content-type", "text/plain")
        .header("content-length", detail.len().to_string())
        .body(detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const CONNECT: &str = "CONNECT\naccept-version:1.2\nhost:localhost\nheart-beat:0,0\n\n\u{0}";
    const SUBSCRIBE: &str = "SUBSCRIBE\nid:sub-0\ndestination:/topic/orderBoard\nack:auto\n\n\u{0}";

    fn session() -> StompSession {
        StompSession::new(&BoardConfig::default())
    }

    fn connected() -> StompSession {
        let mut s = session();
        s.handle_text(CONNECT);
        s.handle_text(SUBSCRIBE);
        s
    }

    fn replies(actions: &[SessionAction]) -> Vec<&Frame> {
        actions
            .iter()
            .filter_map(|a| match a {
                SessionAction::Reply(f) => Some(f),
                _ => None,
            })
            .collect()
    }

    fn update(body: &str) -> BoardUpdate {
        BoardUpdate {
            sequence: 7,
            body: Arc::from(body),
        }
    }

    #[test]
    fn test_connect_replies_connected() {
        let mut s = session();
        let actions = s.handle_text(CONNECT);
        let frames = replies(&actions);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].command, Command::Connected);
        assert_eq!(frames[0].get("version"), Some("1.2"));
        assert_eq!(frames[0].get("heart-beat"), Some("0,0"));
        assert!(s.is_connected());
        assert_eq!(s.heartbeat_interval(), None);
    }

    #[test]
    fn test_version_negotiation() {
        let mut s = session();
        let actions = s.handle_text("CONNECT\naccept-version:1.0,1.1\n\n\u{0}");
        assert_eq!(replies(&actions)[0].get("version"), Some("1.1"));

        let mut s = session();
        let actions = s.handle_text("STOMP\n\n\u{0}");
        assert_eq!(replies(&actions)[0].get("version"), Some("1.0"));

        let mut s = session();
        let actions = s.handle_text("CONNECT\naccept-version:2.0\n\n\u{0}");
        assert_eq!(replies(&actions)[0].command, Command::Error);
        assert_eq!(actions.last(), Some(&SessionAction::Close));
    }

    #[test]
    fn test_heartbeat_negotiation() {
        let config = BoardConfig {
            heartbeat_ms: 10_000,
            ..BoardConfig::default()
        };
        let mut s = StompSession::new(&config);
        let actions = s.handle_text("CONNECT\naccept-version:1.2\nheart-beat:0,20000\n\n\u{0}");
        assert_eq!(replies(&actions)[0].get("heart-beat"), Some("10000,0"));
        assert_eq!(s.heartbeat_interval(), Some(Duration::from_millis(20_000)));
    }

    #[test]
    fn test_frames_before_connect_are_rejected() {
        let mut s = session();
        let actions = s.handle_text(SUBSCRIBE);
        assert_eq!(replies(&actions)[0].command, Command::Error);
        assert_eq!(actions.last(), Some(&SessionAction::Close));
        assert!(!s.is_connected());
    }

    #[test]
    fn test_subscribe_requires_id_and_destination() {
        let mut s = session();
        s.handle_text(CONNECT);
        let actions = s.handle_text("SUBSCRIBE\ndestination:/topic/orderBoard\n\n\u{0}");
        assert_eq!(replies(&actions)[0].command, Command::Error);
        assert_eq!(s.board_subscriptions(), 0);
    }

    #[test]
    fn test_send_to_app_destination_refreshes() {
        let mut s = connected();
        let raw = "SEND\ndestination:/app/sendMessage\ncontent-type:text/plain\ncontent-length:13\n\nHello Server!\u{0}";
        assert_eq!(s.handle_text(raw), vec![SessionAction::RefreshBoard]);
    }

    #[test]
    fn test_send_to_topic_refreshes() {
        let mut s = connected();
        let raw = "SEND\ndestination:/topic/orderBoard\n\nanything\u{0}";
        assert_eq!(s.handle_text(raw), vec![SessionAction::RefreshBoard]);
    }

    #[test]
    fn test_send_elsewhere_is_dropped() {
        let mut s = connected();
        assert!(s.handle_text("SEND\ndestination:/app/other\n\nx\u{0}").is_empty());
    }

    #[test]
    fn test_receipts() {
        let mut s = connected();
        let actions = s.handle_text("SEND\ndestination:/app/sendMessage\nreceipt:r-1\n\n\u{0}");
        assert_eq!(actions[0], SessionAction::RefreshBoard);
        let frames = replies(&actions);
        assert_eq!(frames[0].command, Command::Receipt);
        assert_eq!(frames[0].get("receipt-id"), Some("r-1"));
    }

    #[test]
    fn test_disconnect_with_receipt() {
        let mut s = connected();
        let actions = s.handle_text("DISCONNECT\nreceipt:bye\n\n\u{0}");
        assert_eq!(actions.len(), 2);
        assert_eq!(replies(&actions)[0].get("receipt-id"), Some("bye"));
        assert_eq!(actions[1], SessionAction::Close);
        assert!(!s.is_connected());
    }

    #[test]
    fn test_malformed_frame_closes() {
        let mut s = connected();
        let actions = s.handle_text("GARBAGE\n\n\u{0}");
        assert_eq!(replies(&actions)[0].command, Command::Error);
        assert_eq!(actions.last(), Some(&SessionAction::Close));
    }

    #[test]
    fn test_heartbeats_are_ignored() {
        let mut s = connected();
        assert!(s.handle_text("\n").is_empty());
    }

    #[test]
    fn test_render_update_per_subscription() {
        let mut s = connected();
        s.handle_text("SUBSCRIBE\nid:sub-1\ndestination:/topic/orderBoard\n\n\u{0}");
        s.handle_text("SUBSCRIBE\nid:other\ndestination:/topic/elsewhere\n\n\u{0}");

        let body = r#"{"liveOrderBoardCodes":["01"],"liveOrderBoardReadyCodes":[]}"#;
        let frames = s.render_update(&update(body));
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].command, Command::Message);
        assert_eq!(frames[0].get("destination"), Some("/topic/orderBoard"));
        assert_eq!(frames[0].get("subscription"), Some("sub-0"));
        assert_eq!(frames[1].get("subscription"), Some("sub-1"));
        assert_ne!(frames[0].get("message-id"), frames[1].get("message-id"));
        assert_eq!(frames[0].body, body);

        let wire = frames[0].encode();
        assert_eq!(Frame::parse(&wire).unwrap().unwrap().body, body);
    }

    #[test]
    fn test_unsubscribe_stops_updates() {
        let mut s = connected();
        s.handle_text("UNSUBSCRIBE\nid:sub-0\n\n\u{0}");
        assert_eq!(s.board_subscriptions(), 0);
        assert!(s.render_update(&update("{}")).is_empty());
    }
}
