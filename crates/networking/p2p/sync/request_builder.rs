use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::item::SyncItem;

/// A bounded group of `SyncItem`s requested together from a single peer.
#[derive(Debug, Clone)]
pub struct StateSyncBatch {
    pub id: u64,
    pub requested: Vec<SyncItem>,
}

/// Tracks batches handed to the dispatcher but not yet answered, so a response can be
/// matched back to its requested items and a stale/duplicate response is a safe no-op.
#[derive(Default)]
pub struct InFlightBatches {
    next_id: AtomicU64,
    batches: HashMap<u64, Vec<SyncItem>>,
}

impl InFlightBatches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, requested: Vec<SyncItem>) -> StateSyncBatch {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.batches.insert(id, requested.clone());
        StateSyncBatch { id, requested }
    }

    /// Removes and returns the batch's requested items, or `None` if it was already
    /// handled or cancelled.
    pub fn take(&mut self, id: u64) -> Option<Vec<SyncItem>> {
        self.batches.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Drains every in-flight batch's items (used when re-enqueuing after a reset that
    /// keeps the same root, or when exiting Active state).
    pub fn drain_all(&mut self) -> Vec<SyncItem> {
        self.batches.drain().flat_map(|(_, items)| items).collect()
    }

    pub fn clear(&mut self) {
        self.batches.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sync::item::{NodeDataType, SyncItem};
    use ethereum_types::H256;

    fn item() -> SyncItem {
        SyncItem {
            hash: H256::zero(),
            kind: NodeDataType::StateNode,
            level: 0,
            rightness: 0,
            parent_branch_child_index: -1,
            branch_child_index: -1,
            is_root: true,
        }
    }

    #[test]
    fn take_is_idempotent() {
        let mut in_flight = InFlightBatches::new();
        let batch = in_flight.register(vec![item()]);
        assert!(in_flight.take(batch.id).is_some());
        assert!(in_flight.take(batch.id).is_none());
    }

    #[test]
    fn distinct_registrations_get_distinct_ids() {
        let mut in_flight = InFlightBatches::new();
        let a = in_flight.register(vec![item()]);
        let b = in_flight.register(vec![item()]);
        assert_ne!(a.id, b.id);
    }
}
