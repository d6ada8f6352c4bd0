pub mod db;
mod error;
mod nibbles;
mod node;
mod node_hash;
mod state;

use ethereum_rust_rlp::constants::RLP_NULL;
use ethereum_types::H256;
use lazy_static::lazy_static;
use sha3::{Digest, Keccak256};

pub use self::db::{in_memory::InMemoryTrieDB, TrieDB};
#[cfg(feature = "libmdbx")]
pub use self::db::libmdbx::Libmdbx;
pub use self::error::TrieError;
pub use self::nibbles::Nibbles;
pub use self::node::{BranchNode, ExtensionNode, LeafNode, Node};
pub use self::node_hash::NodeHash;
pub use self::state::TrieState;

lazy_static! {
    /// Hash value for an empty trie, equal to keccak(RLP_NULL)
    pub static ref EMPTY_TRIE_HASH: H256 = H256::from_slice(
        Keccak256::new()
            .chain_update([RLP_NULL])
            .finalize()
            .as_slice(),
    );
}

/// RLP-encoded trie path
pub type PathRLP = Vec<u8>;
/// RLP-encoded trie value
pub type ValueRLP = Vec<u8>;
/// RLP-encoded trie node
pub type NodeRLP = Vec<u8>;
