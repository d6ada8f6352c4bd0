use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::item::{NodeDataType, SyncItem};

/// Depth, in state-trie levels, below which an item is considered "deep" rather than
/// "shallow". Shallow-first draining surfaces breadth early in a round.
const SHALLOW_DEPTH_THRESHOLD: u8 = 3;

/// Prioritized multi-stream work queue. Items are grouped into four streams
/// (state-nodes-shallow, state-nodes-deep, storage-nodes, codes); `take_batch` drains
/// predominantly from the highest-priority non-empty stream but interleaves so slow
/// streams still advance.
pub struct PendingSyncItems {
    state_shallow: VecDeque<SyncItem>,
    state_deep: VecDeque<SyncItem>,
    storage: VecDeque<SyncItem>,
    codes: VecDeque<SyncItem>,
    max_state_level: u8,
    max_storage_level: u8,
    last_recalculated: Option<Instant>,
    closing_out: bool,
}

impl PendingSyncItems {
    pub fn new() -> Self {
        Self {
            state_shallow: VecDeque::new(),
            state_deep: VecDeque::new(),
            storage: VecDeque::new(),
            codes: VecDeque::new(),
            max_state_level: 0,
            max_storage_level: 0,
            last_recalculated: None,
            closing_out: false,
        }
    }

    pub fn push(&mut self, item: SyncItem) {
        match item.kind {
            NodeDataType::StateNode => {
                self.max_state_level = self.max_state_level.max(item.level);
                if item.level <= SHALLOW_DEPTH_THRESHOLD {
                    self.state_shallow.push_back(item);
                } else {
                    self.state_deep.push_back(item);
                }
            }
            NodeDataType::StorageNode => {
                self.max_storage_level = self.max_storage_level.max(item.level);
                self.storage.push_back(item);
            }
            NodeDataType::Code => self.codes.push_back(item),
        }
    }

    fn take_one(stream: &mut VecDeque<SyncItem>, closing_out: bool) -> Option<SyncItem> {
        if !closing_out {
            return stream.pop_front();
        }
        let rightest = stream
            .iter()
            .enumerate()
            .max_by_key(|(_, item)| item.rightness)
            .map(|(i, _)| i)?;
        stream.remove(rightest)
    }

    /// Pops up to `max` items, drawing from streams in priority order but interleaving
    /// one item at a time so a single deep stream cannot starve the others.
    pub fn take_batch(&mut self, max: usize) -> Vec<SyncItem> {
        let mut batch = Vec::with_capacity(max.min(self.count()));
        loop {
            if batch.len() >= max {
                break;
            }
            let mut progressed = false;
            for stream in [
                &mut self.state_shallow,
                &mut self.state_deep,
                &mut self.storage,
                &mut self.codes,
            ] {
                if batch.len() >= max {
                    break;
                }
                if let Some(item) = Self::take_one(stream, self.closing_out) {
                    batch.push(item);
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }
        batch
    }

    pub fn peek_state(&self) -> Option<&SyncItem> {
        self.state_shallow.front().or(self.state_deep.front())
    }

    pub fn count(&self) -> usize {
        self.state_shallow.len() + self.state_deep.len() + self.storage.len() + self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn clear(&mut self) {
        self.state_shallow.clear();
        self.state_deep.clear();
        self.storage.clear();
        self.codes.clear();
        self.max_state_level = 0;
        self.max_storage_level = 0;
        self.closing_out = false;
    }

    pub fn max_state_level(&self) -> u8 {
        self.max_state_level
    }

    pub fn max_storage_level(&self) -> u8 {
        self.max_storage_level
    }

    /// Hints that the bottom of the trie has been reached (used by the leaf handlers to
    /// bias the scheduler toward closing out trailing subtrees).
    pub fn hint_max_state_level(&mut self, level: u8) {
        self.max_state_level = self.max_state_level.max(level);
    }

    pub fn hint_max_storage_level(&mut self, level: u8) {
        self.max_storage_level = self.max_storage_level.max(level);
    }

    /// Re-weights streams based on observed progress. Runs at most once per `period` of
    /// wall time; returns `None` (no-op) otherwise, or a human-readable summary.
    pub fn recalculate_priorities(&mut self, period: Duration) -> Option<String> {
        let now = Instant::now();
        if let Some(last) = self.last_recalculated {
            if now.duration_since(last) < period {
                return None;
            }
        }
        self.last_recalculated = Some(now);
        self.closing_out = self.state_shallow.is_empty() && self.state_deep.len() < 16;
        Some(format!(
            "pending: shallow={} deep={} storage={} codes={} max_state_level={} max_storage_level={} closing_out={}",
            self.state_shallow.len(),
            self.state_deep.len(),
            self.storage.len(),
            self.codes.len(),
            self.max_state_level,
            self.max_storage_level,
            self.closing_out,
        ))
    }
}

impl Default for PendingSyncItems {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use ethereum_types::H256;

    fn state_item(level: u8) -> SyncItem {
        SyncItem {
            hash: H256::repeat_byte(level),
            kind: NodeDataType::StateNode,
            level,
            rightness: 0,
            parent_branch_child_index: -1,
            branch_child_index: -1,
            is_root: false,
        }
    }

    #[test]
    fn shallow_stream_drains_before_deep() {
        let mut pending = PendingSyncItems::new();
        pending.push(state_item(10));
        pending.push(state_item(1));
        let batch = pending.take_batch(1);
        assert_eq!(batch[0].level, 1);
    }

    #[test]
    fn take_batch_respects_max() {
        let mut pending = PendingSyncItems::new();
        for _ in 0..10 {
            pending.push(state_item(1));
        }
        assert_eq!(pending.take_batch(4).len(), 4);
        assert_eq!(pending.count(), 6);
    }

    #[test]
    fn clear_resets_levels() {
        let mut pending = PendingSyncItems::new();
        pending.push(state_item(5));
        pending.clear();
        assert_eq!(pending.max_state_level(), 0);
        assert!(pending.is_empty());
    }
}
