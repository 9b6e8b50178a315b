use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use peermesh::{
    cli::Cli,
    console,
    node::{Node, NodeConfig},
};

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    // Losing the listening socket is the one unrecoverable startup error.
    let listener = TcpListener::bind(cli.listen)
        .await
        .with_context(|| format!("failed to bind {}", cli.listen))?;
    let addr = listener.local_addr()?;

    let node = Node::new(NodeConfig::new(cli.id, cli.master));
    info!(
        "node {} (master: {}) listening on {}",
        node.id(),
        node.is_master(),
        addr
    );

    node.start(listener);
    console::run(node).await
}
