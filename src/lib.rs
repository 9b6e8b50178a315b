//! Minimal peer-to-peer node exchanging typed messages over persistent TCP
//! connections.
//!
//! Each node listens for inbound connections and runs one receive loop per
//! accepted stream; peers a node dials out to are registered for sending.
//! A node started with the master flag additionally broadcasts a periodic
//! heartbeat to every registered peer. Each module covers one concern:
//!
//! - [`message`] is the wire codec: newline-delimited JSON with a `type`
//!   discriminator (`heartbeat`, `task`, `result`).
//! - [`registry`] maps node ids to addresses and live connection handles
//!   under a reader/writer lock.
//! - [`handler`] runs the per-connection receive loop and dispatches
//!   messages by kind, replying to tasks after a simulated processing delay.
//! - [`heartbeat`] is the master-only broadcast loop.
//! - [`node`] coordinates the above and exposes connect/send.
//! - [`cli`] and [`console`] are the process arguments and the interactive
//!   front end.
//!
//! Integration tests drive [`node::Node`] over loopback sockets; the e2e
//! test spawns two node processes and talks to their consoles.

pub mod cli;
pub mod console;
pub mod handler;
pub mod heartbeat;
pub mod message;
pub mod node;
pub mod registry;
