use std::collections::HashSet;

use maze_rooms_core::WallKey;

/// Walls awaiting reconciliation on the next tick.
///
/// Keys are kept in the order they were first flagged; flagging the same wall
/// again within a batch is a no-op.
#[derive(Debug, Default)]
pub(crate) struct WallUpdateQueue {
    pending: Vec<WallKey>,
    flagged: HashSet<WallKey>,
}

impl WallUpdateQueue {
    /// Returns `true` when the wall was not already pending.
    pub(crate) fn flag(&mut self, key: WallKey) -> bool {
        if !self.flagged.insert(key) {
            return false;
        }
        self.pending.push(key);
        true
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    /// Takes the whole batch, leaving the queue empty.
    pub(crate) fn drain(&mut self) -> Vec<WallKey> {
        self.flagged.clear();
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use maze_rooms_core::{RoomCoord, WallSide};

    use super::*;

    #[test]
    fn repeated_flags_collapse_within_a_batch() {
        let mut queue = WallUpdateQueue::default();
        let key = WallKey::new(RoomCoord::new(0, 0), WallSide::South);
        assert!(queue.flag(key));
        assert!(!queue.flag(key));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.drain(), vec![key]);
        assert_eq!(queue.len(), 0);
        assert!(queue.flag(key), "drained keys can be flagged again");
    }
}
