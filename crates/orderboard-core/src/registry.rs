//! Process-wide registry of board codes.
//!
//! A code is *live* while the order is being prepared, *ready* once it can be
//! picked up, and *released* when it is in neither set. Codes are issued from
//! a wrapping counter; a released code is only reissued after the counter
//! comes back around to it.
//!
//! The counter does not skip codes that are still in use. With more than
//! [`CODE_SPACE`](crate::CODE_SPACE) orders in flight a new order can be
//! handed a code that another order still holds. That collision is logged
//! but not prevented.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::code::BoardCode;
use crate::snapshot::OrderBoardState;

/// Which set a code currently belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeStatus {
    Live,
    Ready,
}

#[derive(Debug, Default)]
struct BoardSets {
    live: BTreeSet<BoardCode>,
    /// Oldest-ready first.
    ready: Vec<BoardCode>,
    /// Last code handed out; `None` until the first allocation.
    last_issued: Option<BoardCode>,
}

impl BoardSets {
    fn remove_ready(&mut self, code: BoardCode) -> bool {
        match self.ready.iter().position(|c| *c == code) {
            Some(pos) => {
                self.ready.remove(pos);
                true
            }
            None => false,
        }
    }
}

/// Thread-safe allocation, transition and release of board codes.
///
/// Both sets and the counter sit behind one lock so every operation is
/// linearizable with respect to every other.
#[derive(Debug, Default)]
pub struct OrderBoardRegistry {
    sets: Mutex<BoardSets>,
}

impl OrderBoardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BoardSets> {
        // Every critical section leaves the sets consistent, so a panic in
        // another holder does not invalidate them.
        self.sets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Issue the next code and mark it live.
    pub fn generate_code(&self) -> BoardCode {
        let mut sets = self.lock();
        let code = match sets.last_issued {
            Some(last) => last.next(),
            None => BoardCode::default(),
        };
        sets.last_issued = Some(code);

        if sets.live.contains(&code) {
            warn!(code = %code, "Board code reissued while still live");
        }
        if sets.remove_ready(code) {
            warn!(code = %code, "Board code reissued while still awaiting pickup");
        }
        sets.live.insert(code);

        debug!(code = %code, live = sets.live.len(), "Board code issued");
        code
    }

    /// Move a live code to the ready set. Returns `false` if the code was not live.
    pub fn move_to_ready(&self, code: BoardCode) -> bool {
        let mut sets = self.lock();
        if !sets.live.remove(&code) {
            debug!(code = %code, "Ignoring ready transition for code that is not live");
            return false;
        }
        sets.ready.push(code);
        debug!(code = %code, "Board code ready for pickup");
        true
    }

    /// Move a ready code back to the live set. Returns `false` if the code was not ready.
    pub fn move_to_live(&self, code: BoardCode) -> bool {
        let mut sets = self.lock();
        if !sets.remove_ready(code) {
            debug!(code = %code, "Ignoring live transition for code that is not ready");
            return false;
        }
        sets.live.insert(code);
        debug!(code = %code, "Board code back in preparation");
        true
    }

    /// Drop a code from both sets. Returns `false` if it was already released.
    pub fn release(&self, code: BoardCode) -> bool {
        let mut sets = self.lock();
        let was_live = sets.live.remove(&code);
        let was_ready = sets.remove_ready(code);
        if was_live || was_ready {
            debug!(code = %code, "Board code released");
        }
        was_live || was_ready
    }

    /// Consistent copy of both sets.
    pub fn snapshot(&self) -> OrderBoardState {
        let sets = self.lock();
        OrderBoardState::new(sets.live.iter().copied().collect(), sets.ready.clone())
    }

    /// Replace the board with the in-flight orders known to persistence.
    ///
    /// A code listed in both inputs is kept as ready. The counter resumes
    /// after the highest restored code.
    pub fn restore(
        &self,
        live: impl IntoIterator<Item = BoardCode>,
        ready: impl IntoIterator<Item = BoardCode>,
    ) {
        let mut sets = self.lock();
        sets.live.clear();
        sets.ready.clear();

        for code in ready {
            if !sets.ready.contains(&code) {
                sets.ready.push(code);
            }
        }
        for code in live {
            if !sets.ready.contains(&code) {
                sets.live.insert(code);
            }
        }

        let highest_live = sets.live.iter().next_back().copied();
        let highest_ready = sets.ready.iter().max().copied();
        sets.last_issued = highest_live.max(highest_ready);

        info!(
            live = sets.live.len(),
            ready = sets.ready.len(),
            last_issued = ?sets.last_issued.map(|c| c.to_string()),
            "Order board restored"
        );
    }

    pub fn status_of(&self, code: BoardCode) -> Option<CodeStatus> {
        let sets = self.lock();
        if sets.live.contains(&code) {
            Some(CodeStatus::Live)
        } else if sets.ready.contains(&code) {
            Some(CodeStatus::Ready)
        } else {
            None
        }
    }

    /// Number of codes currently live or ready.
    pub fn len(&self) -> usize {
        let sets = self.lock();
        sets.live.len() + sets.ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
