use std::{sync::Arc, time::Duration};

use tokio::{io::BufReader, net::TcpStream, time::sleep};
use tracing::{debug, info, warn};

use crate::{
    message::{self, Message, read_message},
    node::NodeState,
};

/// Simulated processing time for a received task.
const TASK_PROCESS_DELAY: Duration = Duration::from_secs(1);

/// Receive loop for one accepted connection.
///
/// Decodes messages off the stream in arrival order and dispatches each by
/// kind. The loop ends permanently on the first end-of-stream or decode
/// failure; one bad message ends the session, and other connections are
/// unaffected.
pub async fn run(state: Arc<NodeState>, stream: TcpStream) {
    let peer = stream.peer_addr().ok();
    let mut reader = BufReader::new(stream);

    loop {
        match read_message(&mut reader).await {
            Ok(Some(msg)) => dispatch(&state, msg).await,
            Ok(None) => {
                debug!(?peer, "peer closed the connection");
                break;
            }
            Err(err) => {
                warn!(?peer, error = ?err, "closing session after decode failure");
                break;
            }
        }
    }
}

async fn dispatch(state: &NodeState, msg: Message) {
    match msg.kind.as_str() {
        message::HEARTBEAT => {
            if !state.is_master() {
                info!("heartbeat received from node {}", msg.from);
            }
        }
        message::TASK => {
            info!("task received from node {}: {}", msg.from, msg.content);
            sleep(TASK_PROCESS_DELAY).await;

            let reply = Message::result(state.id(), format!("Processed: {}", msg.content));
            if let Err(err) = state.send(msg.from, &reply).await {
                warn!("failed to reply to node {}: {err:#}", msg.from);
            }
        }
        message::RESULT => {
            info!("result received from node {}: {}", msg.from, msg.content);
        }
        other => debug!("ignoring message of unknown kind {other:?}"),
    }
}
