//! Order lifecycle statuses reported by the order service.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of an order as persisted by the order service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    InPreparation,
    ReadyForPickup,
    PickedUp,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InPreparation => "IN_PREPARATION",
            Self::ReadyForPickup => "READY_FOR_PICKUP",
            Self::PickedUp => "PICKED_UP",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Whether an order in this status no longer occupies a board code.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::PickedUp | Self::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        let json = serde_json::to_string(&OrderStatus::ReadyForPickup).unwrap();
        assert_eq!(json, "\"READY_FOR_PICKUP\"");
        let parsed: OrderStatus = serde_json::from_str("\"PICKED_UP\"").unwrap();
        assert_eq!(parsed, OrderStatus::PickedUp);
        assert_eq!(OrderStatus::InPreparation.to_string(), "IN_PREPARATION");
    }

    #[test]
    fn test_closed_statuses() {
        assert!(OrderStatus::PickedUp.is_closed());
        assert!(OrderStatus::Cancelled.is_closed());
        assert!(!OrderStatus::InPreparation.is_closed());
        assert!(!OrderStatus::ReadyForPickup.is_closed());
    }
}
