use std::str::FromStr as _;
use std::sync::Arc;

use ethereum_rust_net::peer_channels::PeerPool;
use ethereum_rust_net::sync::{
    BatchDispatcher, BlockTreeSource, PrepareOutcome, StaticBlockTree, SyncConfig,
    SyncModeSource, SyncRoundController, WatchSyncMode, SYNC_MODE_STATE_NODES,
};
use ethereum_rust_trie::InMemoryTrieDB;
use ethereum_types::H256;
use tracing::{error, info};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod cli;

#[tokio::main]
async fn main() {
    let matches = cli::cli().get_matches();

    let log_level = matches
        .get_one::<String>("log-level")
        .expect("log-level has a default value");
    let log_filter = EnvFilter::builder()
        .with_default_directive(
            Directive::from_str(log_level).expect("unsupported log level"),
        )
        .from_env_lossy();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let state_root = match matches.get_one::<String>("state-root") {
        Some(hex_root) => match H256::from_str(hex_root.trim_start_matches("0x")) {
            Ok(root) => root,
            Err(err) => {
                error!(%err, "invalid --state-root");
                return;
            }
        },
        None => {
            info!("no --state-root given, nothing to synchronize");
            return;
        }
    };

    let mut config = SyncConfig::default();
    if let Some(batch_size) = matches.get_one::<usize>("batch-size") {
        config.batch_size = *batch_size;
    }

    let state_db = Arc::new(InMemoryTrieDB::empty());
    let code_db = Arc::new(InMemoryTrieDB::empty());
    let dispatcher = Arc::new(PeerPool::new());

    let controller = Arc::new(SyncRoundController::new(
        config,
        state_db,
        code_db,
        dispatcher.clone(),
        Default::default(),
    ));

    // Stand-ins for the real sync-mode controller and block tree: the CLI is a
    // smoke-test harness, so both are driven from the `--state-root` argument rather
    // than from live chain state, but still flow through the same trait boundaries
    // a real node would use.
    let block_tree = StaticBlockTree::new(Some((0, state_root)));
    let (block_number, root) = match block_tree.best_suggested_header() {
        Some(header) => header,
        None => {
            info!("block tree has no suggested header, nothing to synchronize");
            return;
        }
    };
    let sync_mode = WatchSyncMode::new(SYNC_MODE_STATE_NODES);
    let mut sync_mode_rx = sync_mode.subscribe();

    if let Err(err) = controller.activate(block_number, root).await {
        error!(%err, "failed to start sync round");
        return;
    }
    info!(root = %root, "sync round started");

    let mut unanswered_batches = 0u32;
    loop {
        let sync_mode_includes_state_nodes =
            *sync_mode_rx.borrow_and_update() & SYNC_MODE_STATE_NODES != 0;
        match controller
            .prepare_request(sync_mode_includes_state_nodes)
            .await
        {
            PrepareOutcome::RoundComplete => {
                info!("sync round complete");
                break;
            }
            PrepareOutcome::Empty => {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            }
            PrepareOutcome::Batch(batch) => {
                let outcome = dispatcher.dispatch(batch.clone()).await;
                let result = controller.handle_response(batch, outcome).await;
                info!(?result, "batch handled");
                if matches!(result, ethereum_rust_net::sync::HandleOutcome::NotAssigned) {
                    unanswered_batches += 1;
                    if unanswered_batches >= 20 {
                        error!("no peers connected; connect a dispatcher to make progress");
                        break;
                    }
                } else {
                    unanswered_batches = 0;
                }
            }
        }
    }
}
