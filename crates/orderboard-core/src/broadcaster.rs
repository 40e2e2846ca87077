//! Fan-out of board snapshots to every connected display.
//!
//! Each publish carries the whole board, never a delta. A display that misses
//! or reorders an update is corrected by the next one, so delivery order
//! between concurrent publishes is not guaranteed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, error};

use crate::code::BoardCode;
use crate::error::BoardResult;
use crate::registry::OrderBoardRegistry;
use crate::status::OrderStatus;

/// One serialized snapshot, shared by every receiver.
#[derive(Debug, Clone)]
pub struct BoardUpdate {
    /// Increases on every publish.
    pub sequence: u64,
    /// JSON body of an [`OrderBoardState`](crate::OrderBoardState).
    pub body: Arc<str>,
}

/// Publishes registry snapshots on a broadcast channel.
pub struct BoardBroadcaster {
    registry: Arc<OrderBoardRegistry>,
    tx: broadcast::Sender<BoardUpdate>,
    sequence: AtomicU64,
}

impl BoardBroadcaster {
    pub fn new(registry: Arc<OrderBoardRegistry>, capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self {
            registry,
            tx,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn registry(&self) -> &Arc<OrderBoardRegistry> {
        &self.registry
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BoardUpdate> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Snapshot the registry and send it to all subscribers.
    ///
    /// Returns how many receivers the update reached; no receivers is `Ok(0)`.
    pub fn publish_current_state(&self) -> BoardResult<usize> {
        let state = self.registry.snapshot();
        let body: Arc<str> = state.to_json()?.into();
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;

        match self.tx.send(BoardUpdate { sequence, body }) {
            Ok(receivers) => {
                debug!(
                    sequence,
                    receivers,
                    live = state.live_codes.len(),
                    ready = state.ready_codes.len(),
                    "Published order board"
                );
                Ok(receivers)
            }
            Err(_) => {
                debug!(sequence, "Published order board with no subscribers");
                Ok(0)
            }
        }
    }

    /// Any inbound client message is a refresh request; its content is ignored.
    pub fn on_client_message(&self, raw: &str) -> BoardResult<usize> {
        debug!(len = raw.len(), "Client requested order board refresh");
        self.publish_current_state()
    }

    /// Publish after a mutation. A failed publish never undoes the mutation.
    fn publish_after_change(&self) {
        if let Err(e) = self.publish_current_state() {
            error!(error = %e, "Failed to publish order board");
        }
    }

    /// A new order was accepted.
    pub fn order_created(&self) -> BoardCode {
        let code = self.registry.generate_code();
        self.publish_after_change();
        code
    }

    /// Preparation finished.
    pub fn order_ready(&self, code: BoardCode) -> bool {
        let changed = self.registry.move_to_ready(code);
        self.publish_after_change();
        changed
    }

    /// A ready order went back into preparation.
    pub fn order_reopened(&self, code: BoardCode) -> bool {
        let changed = self.registry.move_to_live(code);
        self.publish_after_change();
        changed
    }

    /// The order was picked up, cancelled or deleted.
    pub fn order_closed(&self, code: BoardCode) -> bool {
        let changed = self.registry.release(code);
        self.publish_after_change();
        changed
    }

    /// Apply a status reported by the order service to the board.
    pub fn apply_status(&self, code: BoardCode, status: OrderStatus) -> bool {
        if status.is_closed() {
            return self.order_closed(code);
        }
        match status {
            OrderStatus::ReadyForPickup => self.order_ready(code),
            _ => self.order_reopened(code),
        }
    }

    /// Allocate a code for a new order and persist it with `persist`.
    ///
    /// If `persist` fails the code is released again and the error is
    /// returned unchanged.
    pub fn reserve_code<T, E, F>(&self, persist: F) -> Result<(BoardCode, T), E>
    where
        F: FnOnce(BoardCode) -> Result<T, E>,
    {
        let code = self.order_created();
        match persist(code) {
            Ok(value) => Ok((code, value)),
            Err(e) => {
                debug!(code = %code, "Order persistence failed, releasing board code");
                self.order_closed(code);
                Err(e)
            }
        }
    }
}
