use std::{collections::HashMap, sync::Arc};

use tokio::{
    net::TcpStream,
    sync::{Mutex, RwLock},
};

/// Shared handle to a peer's connection.
///
/// Both the heartbeat task and the console send path write to the same
/// stream, so each handle carries its own mutex to keep encoded messages
/// from interleaving on the wire.
pub type PeerHandle = Arc<Mutex<TcpStream>>;

struct PeerEntry {
    addr: String,
    conn: PeerHandle,
}

/// Concurrency-safe map from node id to address and live connection.
///
/// Reads (`lookup`, `list`) take a shared lock and may proceed together;
/// `register` takes the exclusive lock for its duration. There is no removal
/// path; entries live until the process exits.
pub struct PeerRegistry {
    peers: RwLock<HashMap<u64, PeerEntry>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self {
            peers: RwLock::new(HashMap::new()),
        }
    }

    /// Inserts or overwrites the entry for `id`. Overwriting drops the prior
    /// handle; the old socket closes once its last clone is gone.
    pub async fn register(&self, id: u64, addr: String, conn: PeerHandle) {
        let mut peers = self.peers.write().await;
        peers.insert(id, PeerEntry { addr, conn });
    }

    pub async fn lookup(&self, id: u64) -> Option<PeerHandle> {
        let peers = self.peers.read().await;
        peers.get(&id).map(|entry| Arc::clone(&entry.conn))
    }

    /// Snapshot of registered peers. Iteration order is unspecified.
    pub async fn list(&self) -> Vec<(u64, String)> {
        let peers = self.peers.read().await;
        peers
            .iter()
            .map(|(id, entry)| (*id, entry.addr.clone()))
            .collect()
    }
}

impl Default for PeerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
