use ethereum_types::H256;
use tokio::sync::watch;

use super::request_builder::StateSyncBatch;

/// Bitmask carried by `SyncModeSource`'s `Changed` event.
pub type SyncModeBits = u8;
pub const SYNC_MODE_STATE_NODES: SyncModeBits = 0b0001;

/// Outcome of dispatching a batch to a peer.
#[derive(Debug, Clone)]
pub enum BatchOutcome {
    /// No peer was assigned to this batch.
    NoPeer,
    /// One response per requested item, in order; `None` means the peer didn't have it.
    /// A shorter vector than `requested` means the peer truncated its reply.
    Responses(Vec<Option<Vec<u8>>>),
}

/// The wire protocol and peer-selection layer, consumed only through this narrow
/// boundary — the real devp2p handshake/framing/discovery is out of scope.
pub trait BatchDispatcher: Send + Sync {
    fn dispatch(
        &self,
        batch: StateSyncBatch,
    ) -> impl std::future::Future<Output = BatchOutcome> + Send;
}

/// The sync-mode controller, consumed only through its `Changed` event.
pub trait SyncModeSource: Send + Sync {
    fn subscribe(&self) -> watch::Receiver<SyncModeBits>;
}

/// The block-tree, consumed only to learn which root to pursue next.
pub trait BlockTreeSource: Send + Sync {
    fn best_suggested_header(&self) -> Option<(u64, H256)>;
}

/// In-memory `SyncModeSource`: a `watch` channel whoever owns it can flip directly,
/// standing in for the real sync-mode controller's `Changed` event.
pub struct WatchSyncMode {
    tx: watch::Sender<SyncModeBits>,
}

impl WatchSyncMode {
    pub fn new(initial: SyncModeBits) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn set(&self, bits: SyncModeBits) {
        let _ = self.tx.send(bits);
    }
}

impl SyncModeSource for WatchSyncMode {
    fn subscribe(&self) -> watch::Receiver<SyncModeBits> {
        self.tx.subscribe()
    }
}

/// In-memory `BlockTreeSource`: a fixed best-suggested header, set once at construction.
pub struct StaticBlockTree {
    best: Option<(u64, H256)>,
}

impl StaticBlockTree {
    pub fn new(best: Option<(u64, H256)>) -> Self {
        Self { best }
    }
}

impl BlockTreeSource for StaticBlockTree {
    fn best_suggested_header(&self) -> Option<(u64, H256)> {
        self.best
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn watch_sync_mode_subscriber_sees_updates() {
        let source = WatchSyncMode::new(0);
        let mut rx = source.subscribe();
        assert_eq!(*rx.borrow(), 0);
        source.set(SYNC_MODE_STATE_NODES);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), SYNC_MODE_STATE_NODES);
    }

    #[test]
    fn static_block_tree_returns_its_fixed_header() {
        let tree = StaticBlockTree::new(Some((7, H256::repeat_byte(0x5))));
        assert_eq!(tree.best_suggested_header(), Some((7, H256::repeat_byte(0x5))));
    }
}
