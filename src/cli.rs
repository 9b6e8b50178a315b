use std::net::SocketAddr;

use clap::Parser;

/// Startup parameters for one node process. A malformed value is a hard
/// usage error rather than a silent default.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Numeric identifier for this node.
    #[arg(long)]
    pub id: u64,

    /// Socket address to listen on. Use port 0 for an ephemeral port.
    #[arg(long, default_value = "127.0.0.1:5000")]
    pub listen: SocketAddr,

    /// Run as the master node, broadcasting heartbeats to registered peers.
    #[arg(long)]
    pub master: bool,
}
