//! Application state.

use std::sync::Arc;

use orderboard_core::{BoardBroadcaster, BoardConfig, OrderBoardRegistry};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub broadcaster: Arc<BoardBroadcaster>,
    pub config: Arc<BoardConfig>,
}

impl AppState {
    pub fn new(config: BoardConfig, registry: Arc<OrderBoardRegistry>) -> Self {
        let broadcaster = BoardBroadcaster::new(registry, config.channel_capacity);
        Self {
            broadcaster: Arc::new(broadcaster),
            config: Arc::new(config),
        }
    }

    pub fn registry(&self) -> &OrderBoardRegistry {
        self.broadcaster.registry()
    }
}
