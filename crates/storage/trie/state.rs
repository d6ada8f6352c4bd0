use ethereum_rust_rlp::{decode::RLPDecode, encode::RLPEncode};

use crate::{db::TrieDB, error::TrieError, node::Node, node_hash::NodeHash};

/// Backs a trie with a key-value store, keyed by `NodeHash`.
///
/// Unlike the cache-then-commit model used for tries that are being mutated by block
/// execution, nodes fetched during sync are written as soon as they're known to belong
/// to the canonical trie, so `write_node` goes straight to the underlying `TrieDB`.
pub struct TrieState {
    db: Box<dyn TrieDB>,
}

impl TrieState {
    pub fn new(db: Box<dyn TrieDB>) -> Self {
        Self { db }
    }

    /// Retrieves a node based on its hash
    pub fn get_node(&self, hash: NodeHash) -> Result<Option<Node>, TrieError> {
        self.db
            .get(hash.into())?
            .map(|rlp| Node::decode(&rlp).map_err(TrieError::RLPDecode))
            .transpose()
    }

    /// Returns whether a node with the given hash is already present in the underlying store
    pub fn contains(&self, hash: &NodeHash) -> Result<bool, TrieError> {
        self.db.key_exists(hash.clone().into())
    }

    /// Writes a node under its hash. Idempotent: writing the same node twice is harmless.
    pub fn write_node(&self, node: Node, hash: NodeHash) -> Result<(), TrieError> {
        self.db.put(hash.into(), node.encode_to_vec())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::db::in_memory::InMemoryTrieDB;
    use crate::node::LeafNode;
    use crate::nibbles::Nibbles;

    #[test]
    fn write_then_read() {
        let state = TrieState::new(Box::new(InMemoryTrieDB::empty()));
        let node: Node = LeafNode::new(Nibbles::from_hex(vec![1, 2, 16]), vec![0xaa]).into();
        let hash = node.compute_hash();
        state.write_node(node.clone(), hash.clone()).unwrap();
        let fetched = state.get_node(hash.clone()).unwrap().unwrap();
        assert_eq!(fetched.compute_hash(), hash.clone());
        assert!(state.contains(&hash).unwrap());
    }

    #[test]
    fn missing_node_is_none() {
        let state = TrieState::new(Box::new(InMemoryTrieDB::empty()));
        assert!(state
            .get_node(NodeHash::Hashed(Default::default()))
            .unwrap()
            .is_none());
    }
}
