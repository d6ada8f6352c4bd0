use ethereum_types::H256;

/// Which store a hash belongs to and how its bytes should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeDataType {
    StateNode,
    StorageNode,
    Code,
}

/// A unit of work: one hash the synchronizer still needs to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncItem {
    pub hash: H256,
    pub kind: NodeDataType,
    pub level: u8,
    pub rightness: u128,
    pub parent_branch_child_index: i8,
    pub branch_child_index: i8,
    pub is_root: bool,
}

impl SyncItem {
    pub fn root(hash: H256) -> Self {
        Self {
            hash,
            kind: NodeDataType::StateNode,
            level: 0,
            rightness: 0,
            parent_branch_child_index: -1,
            branch_child_index: -1,
            is_root: true,
        }
    }

    pub fn child(
        &self,
        hash: H256,
        kind: NodeDataType,
        branch_child_index: i8,
        rightness: u128,
    ) -> Self {
        Self {
            hash,
            kind,
            level: self.level.saturating_add(1),
            rightness,
            parent_branch_child_index: branch_child_index,
            branch_child_index: -1,
            is_root: false,
        }
    }

    /// Rightness of a branch child at `index`, per parent.rightness + 16^max(0,7-level) * index.
    pub fn branch_child_rightness(&self, index: u8) -> u128 {
        self.rightness + Self::level_weight(self.level) * index as u128
    }

    /// Rightness of an extension's single child.
    pub fn extension_child_rightness(&self) -> u128 {
        self.rightness + Self::level_weight(self.level) * 16 - 1
    }

    fn level_weight(level: u8) -> u128 {
        let shift = 7u32.saturating_sub(level as u32);
        16u128.pow(shift)
    }
}

/// A parent node held in memory because it has unsaved descendants. Shared between every
/// dependency-table entry it is registered under so a single atomic decrement suffices
/// regardless of how many children it is still waiting on.
#[derive(Debug)]
pub struct DependentItem {
    pub item: SyncItem,
    pub value: Vec<u8>,
    pub is_account: bool,
    counter: std::sync::atomic::AtomicU32,
}

impl DependentItem {
    pub fn new(item: SyncItem, value: Vec<u8>, counter: u32, is_account: bool) -> Self {
        Self {
            item,
            value,
            is_account,
            counter: std::sync::atomic::AtomicU32::new(counter),
        }
    }

    pub fn counter(&self) -> u32 {
        self.counter.load(std::sync::atomic::Ordering::Acquire)
    }

    /// Decrements the counter, returning true if it just reached zero.
    pub fn decrement(&self) -> bool {
        use std::sync::atomic::Ordering;
        self.counter.fetch_sub(1, Ordering::AcqRel) == 1
    }

    /// Increments the counter by one (a branch/leaf starts at 0 and bumps it once per
    /// child it discovers is still unsaved).
    pub fn bump(&self) {
        self.counter.fetch_add(1, std::sync::atomic::Ordering::AcqRel);
    }
}

impl PartialEq for DependentItem {
    fn eq(&self, other: &Self) -> bool {
        self.item.hash == other.item.hash
    }
}
impl Eq for DependentItem {}
