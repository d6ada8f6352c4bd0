use std::collections::HashMap;
use std::sync::Arc;

use ethereum_types::H256;

use super::item::DependentItem;

/// Maps a not-yet-persisted hash to the parents blocked on it. Cleared only between
/// rounds and on a new root; a non-empty table right after the root is saved signals
/// corruption rather than being treated as a normal state.
#[derive(Default)]
pub struct DependencyTable {
    table: HashMap<H256, Vec<Arc<DependentItem>>>,
}

impl DependencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers that `dependent` needs `dep_hash` before it can be saved. A parent
    /// already registered under this hash is not duplicated.
    pub fn add(&mut self, dep_hash: H256, dependent: Arc<DependentItem>) {
        let entry = self.table.entry(dep_hash).or_default();
        if !entry.iter().any(|d| d.item.hash == dependent.item.hash) {
            entry.push(dependent);
        }
    }

    /// True if some parent is already waiting on `hash` (a second parent discovering the
    /// same hash should become a dependent, not re-enqueue the fetch).
    pub fn contains(&self, hash: &H256) -> bool {
        self.table.contains_key(hash)
    }

    /// Removes the entry for `hash`, decrements each dependent's counter, and returns
    /// those that just reached zero (ready to be saved).
    pub fn resolve(&mut self, hash: &H256) -> Vec<Arc<DependentItem>> {
        let Some(dependents) = self.table.remove(hash) else {
            return Vec::new();
        };
        dependents
            .into_iter()
            .filter(|dependent| dependent.decrement())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sync::item::{NodeDataType, SyncItem};

    fn item(hash: u8) -> SyncItem {
        SyncItem {
            hash: H256::repeat_byte(hash),
            kind: NodeDataType::StateNode,
            level: 1,
            rightness: 0,
            parent_branch_child_index: -1,
            branch_child_index: -1,
            is_root: false,
        }
    }

    #[test]
    fn second_parent_on_same_hash_becomes_dependent_not_lost() {
        let mut table = DependencyTable::new();
        let child = H256::repeat_byte(9);
        let parent_a = Arc::new(DependentItem::new(item(1), vec![], 1, false));
        let parent_b = Arc::new(DependentItem::new(item(2), vec![], 1, false));
        table.add(child, parent_a.clone());
        assert!(table.contains(&child));
        table.add(child, parent_b.clone());
        let ready = table.resolve(&child);
        assert_eq!(ready.len(), 2);
        assert!(!table.contains(&child));
    }

    #[test]
    fn resolve_missing_hash_is_a_no_op() {
        let mut table = DependencyTable::new();
        assert!(table.resolve(&H256::zero()).is_empty());
    }

    #[test]
    fn counter_above_one_is_not_ready_until_all_deps_resolve() {
        let mut table = DependencyTable::new();
        let parent = Arc::new(DependentItem::new(item(1), vec![], 2, false));
        let child_a = H256::repeat_byte(10);
        let child_b = H256::repeat_byte(11);
        table.add(child_a, parent.clone());
        table.add(child_b, parent.clone());
        assert!(table.resolve(&child_a).is_empty());
        let ready = table.resolve(&child_b);
        assert_eq!(ready.len(), 1);
    }
}
