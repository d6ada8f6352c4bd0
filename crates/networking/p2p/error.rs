use ethereum_rust_trie::TrieError;

/// Failures that abort a sync operation outright, as opposed to the per-batch quality
/// outcomes in [`crate::sync::response_handler::HandleOutcome`], which are recoverable
/// by construction.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("state store error: {0}")]
    StateDb(#[from] TrieError),
    #[error("attempted to reset the state root while the round is active")]
    ResetWhileActive,
    #[error("dependency table was not empty when the round ended: {0}")]
    Inconsistent(String),
}
