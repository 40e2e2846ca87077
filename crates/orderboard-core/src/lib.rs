//! Orderboard Core Library
//!
//! Live order board state, snapshot wire format, broadcast fan-out and the
//! STOMP framing used by board displays.

pub mod broadcaster;
pub mod code;
pub mod config;
pub mod error;
pub mod registry;
pub mod snapshot;
pub mod status;
pub mod stomp;

pub use broadcaster::{BoardBroadcaster, BoardUpdate};
pub use code::{BoardCode, CODE_SPACE};
pub use config::BoardConfig;
pub use error::{BoardError, BoardResult};
pub use registry::{CodeStatus, OrderBoardRegistry};
pub use snapshot::OrderBoardState;
pub use status::OrderStatus;
