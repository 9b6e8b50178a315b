use std::{path::Path, process::Stdio, time::Duration};

use anyhow::{Context, Result, anyhow};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    process::{Child, ChildStdin, ChildStdout, Command},
    time::timeout,
};

const READ_TIMEOUT: Duration = Duration::from_secs(5);

// The master broadcasts on its default 5 second interval, so seeing the
// first heartbeat land takes a bit longer than everything else.
const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::test]
async fn two_nodes_exchange_task_and_heartbeat() -> Result<()> {
    let binary = assert_cmd::cargo::cargo_bin!("peermesh");

    // Node A is the master; node B is a plain worker.
    let mut a = spawn_node(&binary, 1, true).await?;
    let mut b = spawn_node(&binary, 2, false).await?;
    let addr_a = a.addr.clone();
    let addr_b = b.addr.clone();

    // Cross-connect so each side has a route to the other.
    b.send_line(&format!("connect 1 {addr_a}")).await?;
    read_until_contains(&mut b.stdout, "*** connected to node 1", READ_TIMEOUT).await?;
    a.send_line(&format!("connect 2 {addr_b}")).await?;
    read_until_contains(&mut a.stdout, "*** connected to node 2", READ_TIMEOUT).await?;

    b.send_line("list").await?;
    read_until_contains(&mut b.stdout, &format!("node 1: {addr_a}"), READ_TIMEOUT).await?;

    // B hands A a task; A processes it and replies through its own route.
    b.send_line("send 1 hello").await?;
    read_until_contains(&mut a.stdout, "task received from node 2: hello", READ_TIMEOUT).await?;
    read_until_contains(
        &mut b.stdout,
        "result received from node 1: Processed: hello",
        READ_TIMEOUT,
    )
    .await?;

    // The master's broadcast loop reaches B within one interval.
    read_until_contains(
        &mut b.stdout,
        "heartbeat received from node 1",
        HEARTBEAT_TIMEOUT,
    )
    .await?;

    b.send_line("exit").await?;
    read_until_contains(&mut b.stdout, "*** exiting", READ_TIMEOUT).await?;
    a.send_line("exit").await?;
    read_until_contains(&mut a.stdout, "*** exiting", READ_TIMEOUT).await?;

    ensure_success(&mut a.child, "node A").await?;
    ensure_success(&mut b.child, "node B").await?;

    Ok(())
}

struct NodeProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    addr: String,
}

impl NodeProcess {
    async fn send_line(&mut self, line: &str) -> Result<()> {
        self.stdin
            .write_all(line.as_bytes())
            .await
            .with_context(|| format!("failed to send line '{line}'"))?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }
}

async fn spawn_node(binary: &Path, id: u64, master: bool) -> Result<NodeProcess> {
    let mut cmd = Command::new(binary);
    cmd.arg("--id")
        .arg(id.to_string())
        .arg("--listen")
        .arg("127.0.0.1:0")
        .env("RUST_LOG", "info")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    if master {
        cmd.arg("--master");
    }

    let mut child = cmd
        .spawn()
        .with_context(|| format!("failed to spawn node {id}"))?;
    let stdin = child
        .stdin
        .take()
        .context("node stdin missing after spawn")?;
    let stdout = child
        .stdout
        .take()
        .context("node stdout missing after spawn")?;
    let mut stdout = BufReader::new(stdout);

    let addr = read_listen_addr(&mut stdout, id).await?;

    Ok(NodeProcess {
        child,
        stdin,
        stdout,
        addr,
    })
}

async fn read_listen_addr(reader: &mut BufReader<ChildStdout>, id: u64) -> Result<String> {
    let banner = read_until_contains(reader, "listening on", READ_TIMEOUT)
        .await
        .with_context(|| format!("node {id} did not announce its listen address"))?;
    let addr = banner
        .split_whitespace()
        .last()
        .context("unexpected banner format")?;
    if !addr.contains(':') {
        return Err(anyhow!("banner missing socket address: {banner}"));
    }
    Ok(addr.to_string())
}

/// Reads lines until one contains `needle`, returning that line. Lines from
/// the node's own logging can interleave with console output, so matching on
/// substrings keeps the test independent of log formatting.
async fn read_until_contains(
    reader: &mut BufReader<ChildStdout>,
    needle: &str,
    limit: Duration,
) -> Result<String> {
    let scan = async {
        let mut line = String::new();
        loop {
            line.clear();
            let bytes = reader
                .read_line(&mut line)
                .await
                .with_context(|| format!("failed reading while waiting for '{needle}'"))?;
            if bytes == 0 {
                return Err(anyhow!("stream closed while waiting for '{needle}'"));
            }
            if line.contains(needle) {
                return Ok(line.trim_end_matches(['\r', '\n']).to_string());
            }
        }
    };

    match timeout(limit, scan).await {
        Ok(result) => result,
        Err(_) => Err(anyhow!("timed out waiting for '{needle}'")),
    }
}

async fn ensure_success(child: &mut Child, name: &str) -> Result<()> {
    let status = timeout(READ_TIMEOUT, child.wait())
        .await
        .with_context(|| format!("timed out waiting for {name} to exit"))?
        .with_context(|| format!("failed to await {name} process"))?;
    if !status.success() {
        return Err(anyhow!("{name} exited with status {status}"));
    }
    Ok(())
}
