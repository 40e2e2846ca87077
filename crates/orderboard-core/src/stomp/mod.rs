//! Minimal STOMP transport for board displays.
//!
//! Only what the board needs: CONNECT, SUBSCRIBE to the board topic, SEND to
//! request a refresh, MESSAGE carrying a snapshot, and DISCONNECT with a
//! receipt. Nothing here touches a socket.

pub mod client;
pub mod frame;
pub mod session;

pub use client::{BoardClient, ClientEvent, ClientState};
pub use frame::{Command, Frame};
pub use session::{SessionAction, StompSession};
