use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use ethereum_rust_trie::TrieDB;
use ethereum_types::H256;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::branch_progress::BranchProgress;
use super::config::SyncConfig;
use super::dependencies::DependencyTable;
use super::external::BatchDispatcher;
use super::item::SyncItem;
use super::pending_items::PendingSyncItems;
use super::progress::DetailedProgress;
use super::recently_saved::RecentlySavedFilter;
use super::request_builder::{InFlightBatches, StateSyncBatch};
use crate::error::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Dormant,
    Active,
}

pub(super) struct Inner {
    status: Status,
    pub(super) root: H256,
    pub(super) pending: PendingSyncItems,
    pub(super) recently_saved: RecentlySavedFilter,
    pub(super) dependencies: DependencyTable,
    pub(super) codes_same_as_nodes: HashSet<H256>,
    pub(super) branch_progress: BranchProgress,
    pub(super) in_flight: InFlightBatches,
    pub(super) reset_root_hint: u32,
    pub(super) root_saved: bool,
    round_started_at: Option<Instant>,
}

/// Outcome of draining the pending-item queue for a new batch.
#[derive(Debug)]
pub enum PrepareOutcome {
    /// Nothing to send right now (sync mode inactive, or the queue is momentarily dry).
    Empty,
    /// The round has finished: the root is saved, or it was the empty-tree sentinel, or
    /// the reset-root hint threshold was reached.
    RoundComplete,
    Batch(StateSyncBatch),
}

/// Owns the synchronization feed's lifecycle: activation, root selection, exhaustion,
/// stall detection and resume.
///
/// The state/code-DB, dependency-table and codes-same-as-nodes locks named in the
/// concurrency contract are collapsed into the single mutex guarding `Inner` — the
/// design notes explicitly allow a single serialized actor in place of per-resource
/// locks, and a round's working set is small enough that this never becomes a
/// bottleneck. Responses for distinct batches still only serialize on the bookkeeping
/// tail, not on network I/O, since dispatch happens outside the lock.
pub struct SyncRoundController<D> {
    pub(super) config: SyncConfig,
    pub(super) state_db: Arc<dyn TrieDB>,
    pub(super) code_db: Arc<dyn TrieDB>,
    pub(super) dispatcher: Arc<D>,
    pub(super) progress: Arc<DetailedProgress>,
    pub(super) inner: Mutex<Inner>,
}

impl<D: BatchDispatcher> SyncRoundController<D> {
    /// Builds the controller. If the code DB already holds a checkpointed
    /// `DetailedProgress` record under `PROGRESS_KEY`, its counters replace `progress`
    /// so a restart resumes the running totals instead of zeroing them.
    pub fn new(
        config: SyncConfig,
        state_db: Arc<dyn TrieDB>,
        code_db: Arc<dyn TrieDB>,
        dispatcher: Arc<D>,
        progress: DetailedProgress,
    ) -> Self {
        let recently_saved = RecentlySavedFilter::new(config.recently_saved_capacity);
        let progress = code_db
            .get(super::response_handler::PROGRESS_KEY.to_vec())
            .ok()
            .flatten()
            .and_then(|bytes| DetailedProgress::from_bytes(&bytes))
            .map(|(_, restored)| {
                info!("resumed sync progress counters from checkpoint");
                restored
            })
            .unwrap_or(progress);
        Self {
            config,
            state_db,
            code_db,
            dispatcher,
            progress: Arc::new(progress),
            inner: Mutex::new(Inner {
                status: Status::Dormant,
                root: H256::zero(),
                pending: PendingSyncItems::new(),
                recently_saved,
                dependencies: DependencyTable::new(),
                codes_same_as_nodes: HashSet::new(),
                branch_progress: BranchProgress::new(),
                in_flight: InFlightBatches::new(),
                reset_root_hint: 0,
                root_saved: false,
                round_started_at: None,
            }),
        }
    }

    pub fn progress(&self) -> &DetailedProgress {
        &self.progress
    }

    pub fn dispatcher(&self) -> &Arc<D> {
        &self.dispatcher
    }

    /// Activates the feed for a new target root, as triggered by a sync-mode change
    /// that newly includes "state nodes" with a known best block.
    pub async fn activate(&self, block_number: u64, root: H256) -> Result<(), SyncError> {
        self.reset_state_root(root).await?;
        let mut inner = self.inner.lock().await;
        inner.status = Status::Active;
        inner.round_started_at = Some(Instant::now());
        info!(block_number, root = %root, "sync round activated");
        Ok(())
    }

    /// Re-targets the feed at `new_root`. Forbidden while Active. If `new_root` matches
    /// the current root, in-flight batches are re-enqueued in place; otherwise the
    /// round's working set is cleared and the new root seeded. The recently-saved
    /// filter is deliberately NOT cleared: a false positive there only costs a DB check,
    /// never correctness.
    pub async fn reset_state_root(&self, new_root: H256) -> Result<(), SyncError> {
        let mut inner = self.inner.lock().await;
        if inner.status == Status::Active {
            return Err(SyncError::ResetWhileActive);
        }
        if new_root == inner.root {
            for item in inner.in_flight.drain_all() {
                inner.pending.push(item);
            }
        } else {
            inner.dependencies.clear();
            inner.codes_same_as_nodes.clear();
            inner.pending.clear();
            inner.root_saved = false;
            inner.branch_progress.reset();
            inner.root = new_root;
        }
        inner.in_flight.clear();
        inner.reset_root_hint = 0;
        let empty_trie = *ethereum_rust_core::EMPTY_TRIE_HASH;
        let already_queued = inner.pending.peek_state().map(|item| item.hash) == Some(new_root);
        if new_root != empty_trie && !already_queued {
            inner.pending.push(SyncItem::root(new_root));
        }
        Ok(())
    }

    /// Drains up to `batch_size` items into a batch, or signals the round is complete.
    pub async fn prepare_request(&self, sync_mode_includes_state_nodes: bool) -> PrepareOutcome {
        let mut inner = self.inner.lock().await;
        if inner.status != Status::Active || !sync_mode_includes_state_nodes {
            return PrepareOutcome::Empty;
        }

        let empty_trie = *ethereum_rust_core::EMPTY_TRIE_HASH;
        let root_already_present = inner.root == empty_trie
            || inner.root_saved
            || matches!(
                self.state_db.key_exists(inner.root.as_bytes().to_vec()),
                Ok(true)
            );
        if root_already_present {
            self.finish_round(&mut inner);
            return PrepareOutcome::RoundComplete;
        }

        if inner.reset_root_hint >= self.config.reset_root_hint_threshold {
            self.finish_round(&mut inner);
            return PrepareOutcome::RoundComplete;
        }

        let requested = inner.pending.take_batch(self.config.batch_size);
        if requested.is_empty() {
            let stalled = inner
                .round_started_at
                .map(|t| t.elapsed() >= self.config.response_timeout_grace)
                .unwrap_or(false);
            if stalled {
                inner.reset_root_hint += 1;
            }
            return PrepareOutcome::Empty;
        }

        self.progress.add_requested(requested.len() as u64);
        let batch = inner.in_flight.register(requested);
        PrepareOutcome::Batch(batch)
    }

    /// `VerifyPostSyncCleanUp`: a non-empty dependency table at round end signals
    /// corruption; log and clear rather than fail the round.
    fn finish_round(&self, inner: &mut Inner) {
        if !inner.dependencies.is_empty() {
            warn!(
                pending = inner.dependencies.len(),
                "dependency table not empty at round end, clearing"
            );
            inner.dependencies.clear();
        }
        inner.status = Status::Dormant;
        inner.in_flight.clear();
    }

    pub async fn is_active(&self) -> bool {
        self.inner.lock().await.status == Status::Active
    }

    pub async fn pending_count(&self) -> usize {
        self.inner.lock().await.pending.count()
    }
}
