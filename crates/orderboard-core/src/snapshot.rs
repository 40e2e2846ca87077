//! Point-in-time board snapshot and its JSON wire shape.

use serde::{Deserialize, Serialize};

use crate::code::BoardCode;
use crate::error::BoardResult;

/// Immutable copy of the board published to displays.
///
/// Wire shape:
///
/// ```json
/// {"liveOrderBoardCodes":["03","04"],"liveOrderBoardReadyCodes":["01"]}
/// ```
///
/// Live codes are ascending. Ready codes are in the order they became ready;
/// consumers must not rely on that order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderBoardState {
    #[serde(rename = "liveOrderBoardCodes")]
    pub live_codes: Vec<BoardCode>,
    #[serde(rename = "liveOrderBoardReadyCodes")]
    pub ready_codes: Vec<BoardCode>,
}

impl OrderBoardState {
    pub fn new(live_codes: Vec<BoardCode>, ready_codes: Vec<BoardCode>) -> Self {
        Self { live_codes, ready_codes }
    }

    pub fn to_json(&self) -> BoardResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> BoardResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn contains_live(&self, code: BoardCode) -> bool {
        self.live_codes.contains(&code)
    }

    pub fn contains_ready(&self, code: BoardCode) -> bool {
        self.ready_codes.contains(&code)
    }

    pub fn is_empty(&self) -> bool {
        self.live_codes.is_empty() && self.ready_codes.is_empty()
    }
}
