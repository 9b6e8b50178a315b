use std::sync::Arc;

use tokio::time::interval;
use tracing::warn;

use crate::{message::Message, node::NodeState};

/// Heartbeat broadcaster, spawned only on master nodes.
///
/// Every interval, sends one heartbeat to each registered peer through the
/// normal send path. A failed send is logged and the peer stays registered;
/// there is no retry and no liveness tracking.
pub async fn run(state: Arc<NodeState>) {
    let mut ticker = interval(state.heartbeat_interval());
    // The first tick completes immediately; skip it so broadcasts start one
    // full interval after startup.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        broadcast(&state).await;
    }
}

async fn broadcast(state: &NodeState) {
    let heartbeat = Message::heartbeat(state.id());
    for (id, _) in state.peers().await {
        if let Err(err) = state.send(id, &heartbeat).await {
            warn!("failed to send heartbeat to node {id}: {err:#}");
        }
    }
}
