use anyhow::Result;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::{message::Message, node::Node};

/// Interactive front end. Reads commands from stdin until `exit` or
/// end-of-input; the node's background tasks keep running until the process
/// ends with this loop.
pub async fn run(node: Node) -> Result<()> {
    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut input = String::new();

    loop {
        input.clear();
        let bytes_read = stdin.read_line(&mut input).await?;
        if bytes_read == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if !handle_command(&node, line).await? {
            break;
        }
    }

    Ok(())
}

/// Dispatches one command line. Returns `Ok(false)` when the session should
/// end.
async fn handle_command(node: &Node, line: &str) -> Result<bool> {
    let parts: Vec<&str> = line.split_whitespace().collect();

    match parts[0] {
        "connect" => handle_connect(node, &parts).await?,
        "send" => handle_send(node, &parts).await?,
        "list" => handle_list(node).await?,
        "help" => print_help().await?,
        "exit" => {
            write_stdout("*** exiting").await?;
            return Ok(false);
        }
        _ => write_stdout("*** unknown command, type 'help' for available commands").await?,
    }

    Ok(true)
}

async fn handle_connect(node: &Node, parts: &[&str]) -> Result<()> {
    let [_, id, addr] = parts else {
        write_stdout("*** usage: connect <node_id> <address>").await?;
        return Ok(());
    };

    let Ok(id) = id.parse::<u64>() else {
        write_stderr("!!! node id must be an integer").await?;
        return Ok(());
    };

    match node.connect_to_peer(id, addr).await {
        Ok(()) => write_stdout(&format!("*** connected to node {id}")).await?,
        Err(err) => write_stderr(&format!("!!! failed to connect: {err:#}")).await?,
    }

    Ok(())
}

async fn handle_send(node: &Node, parts: &[&str]) -> Result<()> {
    if parts.len() < 3 {
        write_stdout("*** usage: send <node_id> <message>").await?;
        return Ok(());
    }

    let Ok(target) = parts[1].parse::<u64>() else {
        write_stderr("!!! node id must be an integer").await?;
        return Ok(());
    };

    let content = parts[2..].join(" ");
    let task = Message::task(node.id(), content);
    if let Err(err) = node.send(target, &task).await {
        write_stderr(&format!("!!! failed to send: {err:#}")).await?;
    }

    Ok(())
}

async fn handle_list(node: &Node) -> Result<()> {
    let peers = node.peers().await;
    if peers.is_empty() {
        write_stdout("*** no connected peers").await?;
        return Ok(());
    }

    write_stdout("*** connected peers:").await?;
    for (id, addr) in peers {
        write_stdout(&format!("node {id}: {addr}")).await?;
    }

    Ok(())
}

async fn print_help() -> Result<()> {
    write_stdout("*** available commands:").await?;
    write_stdout("  connect <node_id> <address> - connect to another node").await?;
    write_stdout("  send <node_id> <message>    - send a task to a node").await?;
    write_stdout("  list                        - list connected peers").await?;
    write_stdout("  help                        - show this help").await?;
    write_stdout("  exit                        - exit the program").await?;
    Ok(())
}

async fn write_stdout(line: &str) -> io::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(line.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}

async fn write_stderr(line: &str) -> io::Result<()> {
    let mut stderr = tokio::io::stderr();
    stderr.write_all(line.as_bytes()).await?;
    stderr.write_all(b"\n").await?;
    stderr.flush().await
}
