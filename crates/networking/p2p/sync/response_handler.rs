use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use ethereum_rust_core::{AccountState, EMPTY_KECCACK_HASH, EMPTY_TRIE_HASH};
use ethereum_rust_rlp::decode::RLPDecode;
use ethereum_rust_trie::{BranchNode, ExtensionNode, LeafNode, Node, NodeHash, TrieDB};
use ethereum_types::H256;
use sha3::{Digest, Keccak256};
use tracing::{debug, warn};

use super::branch_progress::ProgressState;
use super::controller::{Inner, SyncRoundController};
use super::external::{BatchDispatcher, BatchOutcome};
use super::item::{DependentItem, NodeDataType, SyncItem};
use super::request_builder::StateSyncBatch;

/// All-zero sentinel key the checkpointed `DetailedProgress` record lives under.
pub const PROGRESS_KEY: [u8; 32] = [0u8; 32];

/// Result of `handle_response`. Quality labels, not errors: every branch here is a
/// recoverable, expected outcome of talking to unreliable peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    Ok,
    Emptish,
    LesserQuality,
    NoProgress,
    NotAssigned,
    InternalError,
}

enum AddOutcome {
    Added,
    AlreadyRequested,
    AlreadySaved,
}

impl<D: BatchDispatcher> SyncRoundController<D> {
    pub async fn handle_response(
        &self,
        batch: StateSyncBatch,
        outcome: BatchOutcome,
    ) -> HandleOutcome {
        let mut inner = self.inner.lock().await;

        let Some(requested) = inner.in_flight.take(batch.id) else {
            return HandleOutcome::Ok;
        };

        if let Some(summary) = inner
            .pending
            .recalculate_priorities(self.config.priority_review_period)
        {
            debug!(%summary, "recalculated pending-item priorities");
        }

        let responses = match outcome {
            BatchOutcome::NoPeer => {
                for item in requested {
                    inner.pending.push(item);
                }
                self.progress.add_not_assigned(1);
                return HandleOutcome::NotAssigned;
            }
            BatchOutcome::Responses(responses) if responses.len() > requested.len() => {
                for item in requested {
                    inner.pending.push(item);
                }
                return HandleOutcome::InternalError;
            }
            BatchOutcome::Responses(responses) => responses,
        };

        let mut non_empty = 0usize;
        let mut invalid = 0usize;

        for (i, item) in requested.iter().enumerate() {
            match responses.get(i) {
                None | Some(None) => inner.pending.push(item.clone()),
                Some(Some(bytes)) => {
                    let hash = keccak(bytes);
                    if hash != item.hash {
                        // Peers routinely send wrong data; requeue, never write it.
                        inner.pending.push(item.clone());
                        invalid += 1;
                        continue;
                    }
                    non_empty += 1;
                    self.progress.add_consumed(1);
                    self.progress.add_data_size(bytes.len() as u64);
                    if self.process_item(&mut inner, item, bytes).is_err() {
                        invalid += 1;
                    }
                }
            }
        }

        self.progress.add_invalid_format(invalid as u64);
        self.progress.set_last_report_time(now_secs());
        if let Err(err) = self
            .code_db
            .put(PROGRESS_KEY.to_vec(), self.progress.to_bytes(0))
        {
            warn!(%err, "failed to persist sync progress checkpoint");
        }

        let requested_count = requested.len().max(1) as f64;
        let is_bad_quality = non_empty > self.config.bad_quality_min_responses
            && (invalid as f64 / requested_count) > self.config.bad_quality_ratio;
        let is_emptish = (non_empty as f64 / requested_count) < self.config.emptish_threshold;
        let is_empty = non_empty == 0 && !is_bad_quality;

        if is_emptish {
            inner.reset_root_hint += 1;
            self.progress.add_emptish(1);
        } else {
            inner.reset_root_hint = 0;
        }

        if is_bad_quality {
            self.progress.add_bad_quality(1);
            HandleOutcome::LesserQuality
        } else if is_empty {
            HandleOutcome::NoProgress
        } else if is_emptish {
            HandleOutcome::Emptish
        } else {
            self.progress.add_ok(1);
            HandleOutcome::Ok
        }
    }

    fn process_item(&self, inner: &mut Inner, item: &SyncItem, bytes: &[u8]) -> Result<(), ()> {
        match item.kind {
            NodeDataType::Code => {
                if let Err(err) = self.code_db.put(item.hash.as_bytes().to_vec(), bytes.to_vec()) {
                    warn!(%err, hash = %item.hash, "failed to write code");
                    return Err(());
                }
                self.progress.add_saved_code(1);
                self.progress.add_saved(1);
                self.possibly_save_dependent_nodes(inner, item.hash);
                Ok(())
            }
            NodeDataType::StateNode | NodeDataType::StorageNode => {
                let node = Node::decode(bytes).map_err(|_| ())?;
                match node {
                    Node::Branch(branch) => self.handle_branch(inner, item, branch, bytes),
                    Node::Extension(extension) => self.handle_extension(inner, item, extension, bytes),
                    Node::Leaf(leaf) => self.handle_leaf(inner, item, leaf, bytes)?,
                }
                Ok(())
            }
        }
    }

    fn handle_branch(&self, inner: &mut Inner, item: &SyncItem, branch: BranchNode, raw: &[u8]) {
        let dependent = Arc::new(DependentItem::new(item.clone(), raw.to_vec(), 0, false));
        let mut counted = 0u32;
        let mut seen = Vec::new();
        // Descending index order, deduplicating by child hash within this branch.
        for index in (0..16u8).rev() {
            let child_hash = &branch.choices[index as usize];
            let Some(child_hash) = as_hashed(child_hash) else {
                self.branch_progress_for(inner, item, index as i8, ProgressState::Empty);
                continue;
            };
            if seen.contains(&child_hash) {
                continue;
            }
            seen.push(child_hash);
            let rightness = item.branch_child_rightness(index);
            let child = item.child(child_hash, item.kind, index as i8, rightness);
            match self.add_node_to_pending(inner, child, Some(&dependent)) {
                AddOutcome::Added | AddOutcome::AlreadyRequested => counted += 1,
                AddOutcome::AlreadySaved => {
                    self.branch_progress_for(inner, item, index as i8, ProgressState::AlreadySaved);
                }
            }
        }
        if counted > 0 {
            bump_counter(&dependent, counted);
        }
        if dependent.counter() == 0 {
            self.save_node(inner, &dependent.item, &dependent.value);
        }
    }

    fn handle_extension(&self, inner: &mut Inner, item: &SyncItem, extension: ExtensionNode, raw: &[u8]) {
        let child_level = item.level.saturating_add(extension.prefix.len() as u8);
        let Some(child_hash) = as_hashed(&extension.child) else {
            // Embedded child: no fetch needed, save directly.
            self.save_node(inner, item, raw);
            return;
        };
        let mut child_item = item.child(child_hash, item.kind, -1, item.extension_child_rightness());
        child_item.level = child_level;
        let dependent = Arc::new(DependentItem::new(item.clone(), raw.to_vec(), 1, false));
        if let AddOutcome::AlreadySaved = self.add_node_to_pending(inner, child_item, Some(&dependent)) {
            self.save_node(inner, item, raw);
        }
    }

    fn handle_leaf(&self, inner: &mut Inner, item: &SyncItem, leaf: LeafNode, raw: &[u8]) -> Result<(), ()> {
        match item.kind {
            NodeDataType::StorageNode => {
                inner.pending.hint_max_storage_level(64);
                self.save_node(inner, item, raw);
            }
            NodeDataType::StateNode => {
                inner.pending.hint_max_state_level(64);
                let account = match AccountState::decode(&leaf.value) {
                    Ok(account) => account,
                    Err(err) => {
                        warn!(%err, hash = %item.hash, "state leaf decoded to an invalid account, requeueing");
                        inner.pending.push(item.clone());
                        self.branch_progress_for_item(inner, item, ProgressState::Requested);
                        return Err(());
                    }
                };
                let dependent = Arc::new(DependentItem::new(item.clone(), raw.to_vec(), 0, true));
                let mut counted = 0u32;

                if account.code_hash != *EMPTY_KECCACK_HASH {
                    if account.code_hash == account.storage_root {
                        inner.codes_same_as_nodes.insert(account.code_hash);
                    } else {
                        let code_item = SyncItem {
                            hash: account.code_hash,
                            kind: NodeDataType::Code,
                            level: 0,
                            rightness: item.rightness,
                            parent_branch_child_index: -1,
                            branch_child_index: -1,
                            is_root: false,
                        };
                        if !matches!(
                            self.add_node_to_pending(inner, code_item, Some(&dependent)),
                            AddOutcome::AlreadySaved
                        ) {
                            counted += 1;
                        }
                    }
                }

                if account.storage_root != *EMPTY_TRIE_HASH {
                    let storage_item = SyncItem {
                        hash: account.storage_root,
                        kind: NodeDataType::StorageNode,
                        level: 0,
                        rightness: item.rightness,
                        parent_branch_child_index: -1,
                        branch_child_index: -1,
                        is_root: false,
                    };
                    if !matches!(
                        self.add_node_to_pending(inner, storage_item, Some(&dependent)),
                        AddOutcome::AlreadySaved
                    ) {
                        counted += 1;
                    }
                }

                if counted > 0 {
                    bump_counter(&dependent, counted);
                }
                if dependent.counter() == 0 {
                    self.progress.add_saved_accounts(1);
                    self.save_node(inner, item, raw);
                }
            }
            NodeDataType::Code => unreachable!("leaves are never of kind Code"),
        }
        Ok(())
    }

    /// `AddNodeToPending`: checks the recently-saved filter, then the backing DB, then
    /// the dependency table, before finally enqueueing the item. The parent edge is
    /// always recorded before the "already requested" check so a second parent
    /// discovering the same hash becomes a dependent rather than being lost.
    fn add_node_to_pending(
        &self,
        inner: &mut Inner,
        item: SyncItem,
        dependent: Option<&Arc<DependentItem>>,
    ) -> AddOutcome {
        if inner.recently_saved.get(&item.hash) {
            self.progress.add_cache_hits(1);
            self.branch_progress_for_item(inner, &item, ProgressState::AlreadySaved);
            return AddOutcome::AlreadySaved;
        }
        let db = match item.kind {
            NodeDataType::Code => &self.code_db,
            _ => &self.state_db,
        };
        self.progress.add_db_checks(1);
        match db.key_exists(item.hash.as_bytes().to_vec()) {
            Ok(true) => {
                inner.recently_saved.set(item.hash);
                self.progress.add_state_was_there(1);
                self.branch_progress_for_item(inner, &item, ProgressState::AlreadySaved);
                return AddOutcome::AlreadySaved;
            }
            Ok(false) => self.progress.add_state_was_not_there(1),
            Err(err) => warn!(%err, hash = %item.hash, "existence check failed"),
        }
        let already_requested = inner.dependencies.contains(&item.hash);
        if let Some(dependent) = dependent {
            inner.dependencies.add(item.hash, dependent.clone());
        }
        if already_requested {
            return AddOutcome::AlreadyRequested;
        }
        self.branch_progress_for_item(inner, &item, ProgressState::Requested);
        inner.pending.push(item);
        AddOutcome::Added
    }

    /// Given a just-saved hash, resolves its dependency-table entry and recursively
    /// saves every dependent that just reached zero.
    fn possibly_save_dependent_nodes(&self, inner: &mut Inner, hash: H256) {
        let ready = inner.dependencies.resolve(&hash);
        for dependent in ready {
            if dependent.is_account {
                self.progress.add_saved_accounts(1);
            }
            self.save_node(inner, &dependent.item, &dependent.value);
        }
    }

    /// Writes the raw bytes to the appropriate store keyed by hash. A storage node whose
    /// hash coincides with a pending code hash is additionally written to the code DB.
    fn save_node(&self, inner: &mut Inner, item: &SyncItem, raw: &[u8]) {
        let db = match item.kind {
            NodeDataType::Code => &self.code_db,
            _ => &self.state_db,
        };
        if let Err(err) = db.put(item.hash.as_bytes().to_vec(), raw.to_vec()) {
            warn!(%err, hash = %item.hash, "failed to persist node");
            return;
        }
        inner.recently_saved.set(item.hash);
        self.progress.add_saved(1);
        match item.kind {
            NodeDataType::StateNode => self.progress.add_saved_state(1),
            NodeDataType::StorageNode => {
                self.progress.add_saved_storage(1);
                if inner.codes_same_as_nodes.remove(&item.hash) {
                    if let Err(err) = self.code_db.put(item.hash.as_bytes().to_vec(), raw.to_vec()) {
                        warn!(%err, hash = %item.hash, "failed to mirror code-as-node write");
                    }
                }
            }
            NodeDataType::Code => {}
        }
        if item.is_root {
            inner.root_saved = true;
        }
        self.branch_progress_for_item(inner, item, ProgressState::Saved);
        self.possibly_save_dependent_nodes(inner, item.hash);
    }

    fn branch_progress_for_item(&self, inner: &mut Inner, item: &SyncItem, state: ProgressState) {
        inner
            .branch_progress
            .report_synced(item.level, item.parent_branch_child_index, state);
    }

    fn branch_progress_for(&self, inner: &mut Inner, item: &SyncItem, index: i8, state: ProgressState) {
        inner
            .branch_progress
            .report_synced(item.level.saturating_add(1), index, state);
    }
}

fn as_hashed(node_hash: &NodeHash) -> Option<H256> {
    match node_hash {
        NodeHash::Hashed(h) => Some(*h),
        NodeHash::Inline(_) => None,
    }
}

fn bump_counter(dependent: &DependentItem, n: u32) {
    for _ in 0..n {
        dependent.bump();
    }
}

fn keccak(bytes: &[u8]) -> H256 {
    H256::from_slice(Keccak256::new().chain_update(bytes).finalize().as_slice())
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use ethereum_rust_core::AccountState;
    use ethereum_rust_rlp::encode::RLPEncode;
    use ethereum_rust_trie::{BranchNode, InMemoryTrieDB, LeafNode, Nibbles, Node, NodeHash, TrieDB};
    use ethereum_types::H256;

    use super::super::config::SyncConfig;
    use super::super::controller::{PrepareOutcome, SyncRoundController};
    use super::super::external::{BatchDispatcher, BatchOutcome};
    use super::super::progress::DetailedProgress;
    use super::super::request_builder::StateSyncBatch;
    use super::{keccak, HandleOutcome};

    struct NoopDispatcher;
    impl BatchDispatcher for NoopDispatcher {
        async fn dispatch(&self, _batch: StateSyncBatch) -> BatchOutcome {
            BatchOutcome::NoPeer
        }
    }

    fn controller() -> SyncRoundController<NoopDispatcher> {
        SyncRoundController::new(
            SyncConfig::default(),
            Arc::new(InMemoryTrieDB::empty()),
            Arc::new(InMemoryTrieDB::empty()),
            Arc::new(NoopDispatcher),
            DetailedProgress::default(),
        )
    }

    fn leaf_path() -> Nibbles {
        Nibbles::from_hex(vec![1, 2, 3, 4, 16])
    }

    async fn single_item_batch(controller: &SyncRoundController<NoopDispatcher>) -> StateSyncBatch {
        match controller.prepare_request(true).await {
            PrepareOutcome::Batch(batch) => batch,
            other => panic!("expected a batch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn single_leaf_eoa_account_is_saved_directly() {
        let account = AccountState::default(); // no code, empty storage
        let leaf = LeafNode::new(leaf_path(), account.encode_to_vec());
        let raw = Node::Leaf(leaf).encode_to_vec();
        let root = keccak(&raw);

        let controller = controller();
        controller.activate(1, root).await.unwrap();
        let batch = single_item_batch(&controller).await;
        assert_eq!(batch.requested.len(), 1);

        let outcome = controller
            .handle_response(batch, BatchOutcome::Responses(vec![Some(raw)]))
            .await;
        assert_eq!(outcome, HandleOutcome::Ok);
        assert_eq!(controller.pending_count().await, 0);
        assert!(controller
            .state_db
            .key_exists(root.as_bytes().to_vec())
            .unwrap());
    }

    #[tokio::test]
    async fn branch_with_duplicate_children_enqueues_once() {
        let child_hash = H256::repeat_byte(0x11);
        let mut choices: [NodeHash; 16] = Default::default();
        choices[3] = NodeHash::Hashed(child_hash);
        choices[7] = NodeHash::Hashed(child_hash);
        let raw = Node::Branch(BranchNode::new(choices)).encode_to_vec();
        let root = keccak(&raw);

        let controller = controller();
        controller.activate(1, root).await.unwrap();
        let batch = single_item_batch(&controller).await;

        let outcome = controller
            .handle_response(batch, BatchOutcome::Responses(vec![Some(raw)]))
            .await;
        assert_eq!(outcome, HandleOutcome::Ok);
        assert_eq!(controller.pending_count().await, 1);
    }

    #[tokio::test]
    async fn peer_returning_wrong_bytes_is_requeued_and_not_saved() {
        let root = H256::repeat_byte(0x09);
        let controller = controller();
        controller.activate(1, root).await.unwrap();
        let batch = single_item_batch(&controller).await;

        let outcome = controller
            .handle_response(batch, BatchOutcome::Responses(vec![Some(vec![0xaa, 0xbb])]))
            .await;
        assert_eq!(outcome, HandleOutcome::NoProgress);
        assert_eq!(controller.pending_count().await, 1);
        assert!(!controller
            .state_db
            .key_exists(root.as_bytes().to_vec())
            .unwrap());
    }

    #[tokio::test]
    async fn malformed_account_leaf_is_requeued_and_counted_as_invalid() {
        let leaf = LeafNode::new(leaf_path(), vec![0xff, 0xff, 0xff]); // not valid RLP-encoded AccountState
        let raw = Node::Leaf(leaf).encode_to_vec();
        let root = keccak(&raw);

        let controller = controller();
        controller.activate(1, root).await.unwrap();
        let batch = single_item_batch(&controller).await;

        let outcome = controller
            .handle_response(batch, BatchOutcome::Responses(vec![Some(raw)]))
            .await;
        assert_eq!(outcome, HandleOutcome::NoProgress);
        assert_eq!(controller.pending_count().await, 1);
        assert!(!controller
            .state_db
            .key_exists(root.as_bytes().to_vec())
            .unwrap());
        assert_eq!(
            controller
                .progress()
                .invalid_format_count
                .load(std::sync::atomic::Ordering::Relaxed),
            1
        );
    }

    #[tokio::test]
    async fn account_with_code_waits_for_both_dependents_before_saving() {
        let code_bytes = b"some evm bytecode".to_vec();
        let code_hash = keccak(&code_bytes);
        let storage_leaf = LeafNode::new(leaf_path(), vec![1, 2, 3]);
        let storage_raw = Node::Leaf(storage_leaf).encode_to_vec();
        let storage_root = keccak(&storage_raw);

        let account = AccountState {
            nonce: 1,
            code_hash,
            storage_root,
            ..AccountState::default()
        };
        let leaf = LeafNode::new(leaf_path(), account.encode_to_vec());
        let raw = Node::Leaf(leaf).encode_to_vec();
        let root = keccak(&raw);

        let controller = controller();
        controller.activate(1, root).await.unwrap();
        let batch = single_item_batch(&controller).await;
        let outcome = controller
            .handle_response(batch, BatchOutcome::Responses(vec![Some(raw)]))
            .await;
        assert_eq!(outcome, HandleOutcome::Ok);
        assert_eq!(controller.pending_count().await, 2);
        assert!(!controller
            .state_db
            .key_exists(root.as_bytes().to_vec())
            .unwrap());

        let batch = match controller.prepare_request(true).await {
            PrepareOutcome::Batch(batch) => batch,
            other => panic!("expected a batch, got {other:?}"),
        };
        assert_eq!(batch.requested.len(), 2);
        let responses = batch
            .requested
            .iter()
            .map(|item| {
                if item.hash == code_hash {
                    Some(code_bytes.clone())
                } else {
                    Some(storage_raw.clone())
                }
            })
            .collect();
        let outcome = controller
            .handle_response(batch, BatchOutcome::Responses(responses))
            .await;
        assert_eq!(outcome, HandleOutcome::Ok);

        assert!(controller
            .code_db
            .key_exists(code_hash.as_bytes().to_vec())
            .unwrap());
        assert!(controller
            .state_db
            .key_exists(storage_root.as_bytes().to_vec())
            .unwrap());
        assert!(controller
            .state_db
            .key_exists(root.as_bytes().to_vec())
            .unwrap());
    }
}
