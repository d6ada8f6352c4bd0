//! State-trie synchronization: pulls the account and storage tries for a target block
//! root from peers, node by node, tracking which branches are still incomplete so a
//! crash or a root change can resume without re-walking saved work.

mod branch_progress;
mod config;
mod controller;
mod dependencies;
mod external;
mod item;
mod pending_items;
mod progress;
mod recently_saved;
mod request_builder;
mod response_handler;

pub use config::SyncConfig;
pub use controller::{PrepareOutcome, SyncRoundController};
pub use external::{
    BatchDispatcher, BatchOutcome, BlockTreeSource, StaticBlockTree, SyncModeSource,
    WatchSyncMode, SYNC_MODE_STATE_NODES,
};
pub use item::{NodeDataType, SyncItem};
pub use progress::DetailedProgress;
pub use request_builder::StateSyncBatch;
pub use response_handler::HandleOutcome;
