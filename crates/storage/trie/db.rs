pub mod in_memory;
#[cfg(feature = "libmdbx")]
pub mod libmdbx;

use crate::error::TrieError;

/// Byte-keyed storage backing a trie's nodes. Implementations must be safe to share
/// across the concurrent readers/writers a sync round runs (see `TrieState`).
pub trait TrieDB: Send + Sync {
    fn get(&self, key: Vec<u8>) -> Result<Option<Vec<u8>>, TrieError>;
    fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<(), TrieError>;
    /// Existence check that avoids deserializing the stored node, used by the
    /// recently-saved filter to confirm a possible cache hit before skipping a save.
    fn key_exists(&self, key: Vec<u8>) -> Result<bool, TrieError> {
        Ok(self.get(key)?.is_some())
    }
}
