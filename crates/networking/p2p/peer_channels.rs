use std::{sync::Arc, time::Duration};

use tokio::sync::{mpsc, Mutex};

use crate::sync::{BatchDispatcher, BatchOutcome, StateSyncBatch};

pub const PEER_REPLY_TIMEOUT: Duration = Duration::from_secs(45);
pub const MAX_MESSAGES_IN_PEER_CHANNEL: usize = 25;
pub const MAX_RESPONSE_BYTES: u64 = 512 * 1024;

/// The two message shapes that cross a peer's channel for state-trie synchronization.
/// Everything else the real devp2p wire carries (headers, bodies, handshakes) lives
/// outside this boundary.
#[derive(Debug, Clone)]
pub enum PeerMessage {
    GetTrieNodes {
        id: u64,
        hashes: Vec<ethereum_types::H256>,
        response_bytes: u64,
    },
    TrieNodes {
        id: u64,
        nodes: Vec<Option<Vec<u8>>>,
    },
}

#[derive(Debug, Clone)]
/// Holds the respective sender and receiver ends of the communication channels between
/// the peer data and its active connection.
pub struct PeerChannels {
    sender: mpsc::Sender<PeerMessage>,
    receiver: Arc<Mutex<mpsc::Receiver<PeerMessage>>>,
}

impl PeerChannels {
    /// Sets up the communication channels for the peer. Returns the channel endpoints to
    /// hand to the active connection's listen loop.
    pub fn create() -> (Self, mpsc::Sender<PeerMessage>, mpsc::Receiver<PeerMessage>) {
        let (sender, connection_receiver) =
            mpsc::channel::<PeerMessage>(MAX_MESSAGES_IN_PEER_CHANNEL);
        let (connection_sender, receiver) = mpsc::channel::<PeerMessage>(MAX_MESSAGES_IN_PEER_CHANNEL);
        (
            Self {
                sender,
                receiver: Arc::new(Mutex::new(receiver)),
            },
            connection_sender,
            connection_receiver,
        )
    }

    /// Requests trie nodes by hash. Returns one response slot per hash (in request
    /// order), `None` where the peer didn't have it, or `None` for the whole call if
    /// the peer never answered.
    pub async fn request_trie_nodes(
        &self,
        hashes: Vec<ethereum_types::H256>,
    ) -> Option<Vec<Option<Vec<u8>>>> {
        let request_id = rand::random();
        let expected = hashes.len();
        let request = PeerMessage::GetTrieNodes {
            id: request_id,
            hashes,
            response_bytes: MAX_RESPONSE_BYTES,
        };
        self.sender.send(request).await.ok()?;
        let mut receiver = self.receiver.lock().await;
        let nodes = tokio::time::timeout(PEER_REPLY_TIMEOUT, async move {
            loop {
                match receiver.recv().await {
                    Some(PeerMessage::TrieNodes { id, nodes }) if id == request_id => {
                        return Some(nodes)
                    }
                    // Ignore replies that don't match the expected id (such as late responses)
                    Some(_) => continue,
                    None => return None,
                }
            }
        })
        .await
        .ok()??;
        (nodes.len() <= expected).then_some(nodes)
    }
}

/// Pool of currently connected peers, picked round-robin for each batch. A peer that
/// fails to answer simply yields `BatchOutcome::NoPeer`; the caller requeues the batch.
#[derive(Default, Clone)]
pub struct PeerPool {
    peers: Arc<Mutex<Vec<PeerChannels>>>,
    next: Arc<std::sync::atomic::AtomicUsize>,
}

impl PeerPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, channels: PeerChannels) {
        self.peers.lock().await.push(channels);
    }

    pub async fn remove_stale(&self, is_stale: impl Fn(&PeerChannels) -> bool) {
        self.peers.lock().await.retain(|p| !is_stale(p));
    }

    async fn pick(&self) -> Option<PeerChannels> {
        let peers = self.peers.lock().await;
        if peers.is_empty() {
            return None;
        }
        let i = self
            .next
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            % peers.len();
        Some(peers[i].clone())
    }
}

impl BatchDispatcher for PeerPool {
    async fn dispatch(&self, batch: StateSyncBatch) -> BatchOutcome {
        let Some(peer) = self.pick().await else {
            return BatchOutcome::NoPeer;
        };
        let hashes = batch.requested.iter().map(|item| item.hash).collect();
        match peer.request_trie_nodes(hashes).await {
            Some(nodes) => BatchOutcome::Responses(nodes),
            None => BatchOutcome::NoPeer,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn empty_pool_yields_no_peer() {
        let pool = PeerPool::new();
        let outcome = pool
            .dispatch(StateSyncBatch {
                id: 0,
                requested: vec![],
            })
            .await;
        assert!(matches!(outcome, BatchOutcome::NoPeer));
    }

    #[tokio::test]
    async fn round_robin_alternates_between_two_peers() {
        let pool = PeerPool::new();
        let (a, _a_tx, _a_rx) = PeerChannels::create();
        let (b, _b_tx, _b_rx) = PeerChannels::create();
        pool.add(a).await;
        pool.add(b).await;

        let first = pool.next.load(std::sync::atomic::Ordering::Relaxed);
        pool.pick().await.unwrap();
        let second = pool.next.load(std::sync::atomic::Ordering::Relaxed);
        pool.pick().await.unwrap();
        let third = pool.next.load(std::sync::atomic::Ordering::Relaxed);
        assert_eq!(second, first + 1);
        assert_eq!(third, first + 2);
    }

    #[tokio::test]
    async fn stale_peers_are_dropped() {
        let pool = PeerPool::new();
        let (a, _a_tx, _a_rx) = PeerChannels::create();
        pool.add(a).await;
        assert_eq!(pool.peers.lock().await.len(), 1);
        pool.remove_stale(|_| true).await;
        assert_eq!(pool.peers.lock().await.len(), 0);
    }
}
