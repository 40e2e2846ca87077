//! Board display side of the STOMP exchange.
//!
//! `Disconnected -> Connecting -> Connected -> Subscribed`. The client sends
//! CONNECT, waits for CONNECTED, then subscribes to the board topic and sends
//! one trigger message so the server publishes an initial snapshot. Any
//! transport failure drops it back to `Disconnected`; reconnecting is up to
//! the caller.

use tracing::{debug, warn};

use crate::config::BoardConfig;
use crate::error::{BoardError, BoardResult};
use crate::snapshot::OrderBoardState;
use crate::stomp::frame::{Command, Frame};

const SUBSCRIPTION_ID: &str = "sub-0";
const DISCONNECT_RECEIPT: &str = "bye";
const REFRESH_BODY: &str = "refresh";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Disconnected,
    Connecting,
    Connected,
    Subscribed,
}

/// Outcome of handling one server frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Frame to write to the socket.
    Send(Frame),
    /// A fresh board snapshot.
    Board(OrderBoardState),
    Receipt(String),
    /// The server closed the session with an ERROR frame.
    ServerError(String),
}

#[derive(Debug)]
pub struct BoardClient {
    host: String,
    topic: String,
    app_destination: String,
    state: ClientState,
}

impl BoardClient {
    pub fn new(
        host: impl Into<String>,
        topic: impl Into<String>,
        app_destination: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            topic: topic.into(),
            app_destination: app_destination.into(),
            state: ClientState::Disconnected,
        }
    }

    pub fn from_config(host: impl Into<String>, config: &BoardConfig) -> Self {
        Self::new(host, config.topic.clone(), config.app_destination.clone())
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    /// The socket is open; returns the CONNECT frame to send.
    pub fn connect(&mut self) -> Frame {
        self.state = ClientState::Connecting;
        Frame::new(Command::Connect)
            .header("accept-version", "1.2")
            .header("host", self.host.as_str())
            .header("heart-beat", "0,0")
    }

    /// Ask for a fresh snapshot. Only valid once subscribed.
    pub fn refresh(&self) -> Option<Frame> {
        (self.state == ClientState::Subscribed).then(|| self.trigger_frame())
    }

    /// Start a graceful close. Returns `None` if already disconnected.
    pub fn disconnect(&mut self) -> Option<Frame> {
        if self.state == ClientState::Disconnected {
            return None;
        }
        self.state = ClientState::Disconnected;
        Some(Frame::new(Command::Disconnect).header("receipt", DISCONNECT_RECEIPT))
    }

    /// The underlying socket failed or closed.
    pub fn on_transport_failure(&mut self) {
        if self.state != ClientState::Disconnected {
            debug!(state = ?self.state, "Board client lost its transport");
        }
        self.state = ClientState::Disconnected;
    }

    /// Handle one WebSocket text message from the server.
    pub fn handle_text(&mut self, raw: &str) -> BoardResult<Vec<ClientEvent>> {
        let mut events = Vec::new();
        for frame in Frame::parse_all(raw)? {
            events.extend(self.handle_frame(frame)?);
        }
        Ok(events)
    }

    pub fn handle_frame(&mut self, frame: Frame) -> BoardResult<Vec<ClientEvent>> {
        match frame.command {
            Command::Connected => {
                if self.state != ClientState::Connecting {
                    return Err(BoardError::protocol(format!(
                        "CONNECTED received while {:?}",
                        self.state
                    )));
                }
                self.state = ClientState::Connected;
                let subscribe = Frame::new(Command::Subscribe)
                    .header("id", SUBSCRIPTION_ID)
                    .header("destination", self.topic.as_str())
                    .header("ack", "auto");
                let trigger = self.trigger_frame();
                self.state = ClientState::Subscribed;
                Ok(vec![ClientEvent::Send(subscribe), ClientEvent::Send(trigger)])
            }
            Command::Message => {
                if frame.get("destination") != Some(self.topic.as_str()) {
                    debug!(destination = ?frame.get("destination"), "Ignoring message for another destination");
                    return Ok(Vec::new());
                }
                let state = OrderBoardState::from_json(&frame.body)?;
                Ok(vec![ClientEvent::Board(state)])
            }
            Command::Receipt => {
                let id = frame.get("receipt-id").unwrap_or_default().to_string();
                if id == DISCONNECT_RECEIPT {
                    self.state = ClientState::Disconnected;
                }
                Ok(vec![ClientEvent::Receipt(id)])
            }
            Command::Error => {
                let message = frame.get("message").unwrap_or("unknown error").to_string();
                warn!(message = %message, body = %frame.body, "Server rejected board session");
                self.state = ClientState::Disconnected;
                Ok(vec![ClientEvent::ServerError(message)])
            }
            other => Err(BoardError::protocol(format!(
                "{other} is not a server frame"
            ))),
        }
    }

    fn trigger_frame(&self) -> Frame {
        Frame::new(Command::Send)
            .header("destination", self.app_destination.as_str())
            .header("content-type", "text/plain")
            .header("content-length", REFRESH_BODY.len().to_string())
            .body(REFRESH_BODY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcaster::BoardUpdate;
    use crate::code::BoardCode;
    use crate::stomp::session::{SessionAction, StompSession};
    use std::sync::Arc;

    fn client() -> BoardClient {
        BoardClient::from_config("localhost", &BoardConfig::default())
    }

    fn sent(events: &[ClientEvent]) -> Vec<&Frame> {
        events
            .iter()
            .filter_map(|e| match e {
                ClientEvent::Send(f) => Some(f),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_connect_frame() {
        let mut c = client();
        assert_eq!(c.state(), ClientState::Disconnected);
        let frame = c.connect();
        assert_eq!(
            frame.encode(),
            "CONNECT\naccept-version:1.2\nhost:localhost\nheart-beat:0,0\n\n\u{0}"
        );
        assert_eq!(c.state(), ClientState::Connecting);
    }

    #[test]
    fn test_connected_subscribes_and_triggers() {
        let mut c = client();
        c.connect();
        let events = c.handle_text("CONNECTED\nversion:1.2\nheart-beat:0,0\n\n\u{0}").unwrap();
        let frames = sent(&events);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].command, Command::Subscribe);
        assert_eq!(frames[0].get("destination"), Some("/topic/orderBoard"));
        assert_eq!(frames[0].get("ack"), Some("auto"));
        assert_eq!(frames[1].command, Command::Send);
        assert_eq!(frames[1].get("destination"), Some("/app/sendMessage"));
        assert_eq!(c.state(), ClientState::Subscribed);
        assert!(c.refresh().is_some());
    }

    #[test]
    fn test_unexpected_connected() {
        let mut c = client();
        assert!(c.handle_text("CONNECTED\nversion:1.2\n\n\u{0}").is_err());
    }

    #[test]
    fn test_message_yields_board() {
        let mut c = client();
        c.connect();
        c.handle_text("CONNECTED\nversion:1.2\n\n\u{0}").unwrap();

        let raw = "MESSAGE\ndestination:/topic/orderBoard\nsubscription:sub-0\nmessage-id:1\n\n{\"liveOrderBoardCodes\":[\"02\"],\"liveOrderBoardReadyCodes\":[\"01\"]}\u{0}";
        let events = c.handle_text(raw).unwrap();
        let ClientEvent::Board(state) = &events[0] else {
            panic!("expected a board event, got {events:?}");
        };
        assert_eq!(state.live_codes, vec![BoardCode::new(2).unwrap()]);
        assert_eq!(state.ready_codes, vec![BoardCode::new(1).unwrap()]);
    }

    #[test]
    fn test_message_for_other_destination_ignored() {
        let mut c = client();
        let raw = "MESSAGE\ndestination:/topic/other\n\nnot json\u{0}";
        assert!(c.handle_text(raw).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_board_is_an_error() {
        let mut c = client();
        let raw = "MESSAGE\ndestination:/topic/orderBoard\n\nnot json\u{0}";
        assert!(c.handle_text(raw).is_err());
    }

    #[test]
    fn test_error_frame_disconnects() {
        let mut c = client();
        c.connect();
        let events = c.handle_text("ERROR\nmessage:not connected\n\n\u{0}").unwrap();
        assert_eq!(events, vec![ClientEvent::ServerError("not connected".into())]);
        assert_eq!(c.state(), ClientState::Disconnected);
    }

    #[test]
    fn test_transport_failure_and_disconnect() {
        let mut c = client();
        c.connect();
        c.on_transport_failure();
        assert_eq!(c.state(), ClientState::Disconnected);
        assert!(c.disconnect().is_none());
        assert!(c.refresh().is_none());

        c.connect();
        let frame = c.disconnect().unwrap();
        assert_eq!(frame.encode(), "DISCONNECT\nreceipt:bye\n\n\u{0}");
    }

    #[test]
    fn test_full_exchange_with_server_session() {
        let config = BoardConfig::default();
        let mut server = StompSession::new(&config);
        let mut c = client();

        let actions = server.handle_text(&c.connect().encode());
        let SessionAction::Reply(connected) = &actions[0] else {
            panic!("expected CONNECTED");
        };

        let events = c.handle_text(&connected.encode()).unwrap();
        let mut refreshes = 0;
        for frame in sent(&events) {
            for action in server.handle_text(&frame.encode()) {
                if action == SessionAction::RefreshBoard {
                    refreshes += 1;
                }
            }
        }
        assert_eq!(refreshes, 1);
        assert_eq!(server.board_subscriptions(), 1);

        let update = BoardUpdate {
            sequence: 1,
            body: Arc::from(r#"{"liveOrderBoardCodes":["00"],"liveOrderBoardReadyCodes":[]}"#),
        };
        let messages = server.render_update(&update);
        let events = c.handle_text(&messages[0].encode()).unwrap();
        assert!(matches!(&events[0], ClientEvent::Board(s) if s.live_codes.len() == 1));
    }
}
