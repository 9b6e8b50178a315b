use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result, bail};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::Mutex,
};
use tracing::{debug, warn};

use crate::{
    handler, heartbeat,
    message::{Message, write_message},
    registry::PeerRegistry,
};

/// Interval between heartbeat broadcasts from a master node.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Immutable per-process identity and policy, fixed at startup.
///
/// `master` is a static label, not an elected role: it only decides whether
/// the heartbeat broadcaster runs.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub id: u64,
    pub master: bool,
    pub heartbeat_interval: Duration,
}

impl NodeConfig {
    pub fn new(id: u64, master: bool) -> Self {
        Self {
            id,
            master,
            heartbeat_interval: HEARTBEAT_INTERVAL,
        }
    }
}

/// State shared between the accept loop, connection handlers, the heartbeat
/// broadcaster, and the console: node identity plus the peer registry. The
/// registry is the only shared mutable structure in the process.
pub struct NodeState {
    config: NodeConfig,
    registry: PeerRegistry,
}

impl NodeState {
    pub fn id(&self) -> u64 {
        self.config.id
    }

    pub fn is_master(&self) -> bool {
        self.config.master
    }

    pub fn heartbeat_interval(&self) -> Duration {
        self.config.heartbeat_interval
    }

    pub async fn peers(&self) -> Vec<(u64, String)> {
        self.registry.list().await
    }

    /// Encodes and writes one message to the registered connection for
    /// `target`. Best-effort single attempt: a missing peer or a failed
    /// write is an error for the caller to log; the message is dropped.
    pub async fn send(&self, target: u64, message: &Message) -> Result<()> {
        let Some(handle) = self.registry.lookup(target).await else {
            bail!("no connection to node {target}");
        };

        let mut conn = handle.lock().await;
        write_message(&mut *conn, message)
            .await
            .with_context(|| format!("failed to send {} to node {target}", message.kind))
    }
}

/// The node coordinator: owns identity and role, accepts inbound
/// connections, and exposes the connect/send operations the console drives.
pub struct Node {
    state: Arc<NodeState>,
}

impl Node {
    pub fn new(config: NodeConfig) -> Self {
        Self {
            state: Arc::new(NodeState {
                config,
                registry: PeerRegistry::new(),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.state.id()
    }

    pub fn is_master(&self) -> bool {
        self.state.is_master()
    }

    /// Spawns the background tasks: the accept loop and, on a master node,
    /// the heartbeat broadcaster. Returns immediately; the tasks run until
    /// the process exits (there is no cancellation path).
    pub fn start(&self, listener: TcpListener) {
        let state = Arc::clone(&self.state);
        tokio::spawn(accept_loop(listener, state));

        if self.state.is_master() {
            tokio::spawn(heartbeat::run(Arc::clone(&self.state)));
        }
    }

    /// Opens an outbound connection to `addr` and registers it under `id`.
    ///
    /// The outbound side is send-only: no handler is spawned for it, so
    /// anything the remote writes back over this stream is never read. A
    /// reply reaches this node only if the remote dials in separately.
    pub async fn connect_to_peer(&self, id: u64, addr: &str) -> Result<()> {
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("failed to connect to {addr}"))?;

        self.state
            .registry
            .register(id, addr.to_string(), Arc::new(Mutex::new(stream)))
            .await;

        Ok(())
    }

    pub async fn send(&self, target: u64, message: &Message) -> Result<()> {
        self.state.send(target, message).await
    }

    pub async fn peers(&self) -> Vec<(u64, String)> {
        self.state.peers().await
    }
}

/// Accepts connections forever, one handler task per connection, with no
/// admission limit. Accept errors are logged and the loop continues.
async fn accept_loop(listener: TcpListener, state: Arc<NodeState>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!(%peer, "accepted connection");
                let state = Arc::clone(&state);
                tokio::spawn(handler::run(state, stream));
            }
            Err(err) => warn!(error = ?err, "failed to accept connection"),
        }
    }
}
