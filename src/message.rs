use std::io;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

const LINE_ENDINGS: &[char] = &['\n', '\r'];

/// Well-known message kinds. The `kind` field stays a plain string so that
/// messages with kinds we do not know still decode; dispatch ignores them.
pub const HEARTBEAT: &str = "heartbeat";
pub const TASK: &str = "task";
pub const RESULT: &str = "result";

/// One unit of communication between nodes.
///
/// Serialized as a flat JSON object with a `type` discriminator string, an
/// opaque `content` payload, and the sender's node id. There is no message
/// id or sequence number; duplicates and reordering are not detectable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: String,
    pub from: u64,
}

impl Message {
    pub fn heartbeat(from: u64) -> Self {
        Self {
            kind: HEARTBEAT.to_string(),
            content: String::new(),
            from,
        }
    }

    pub fn task(from: u64, content: impl Into<String>) -> Self {
        Self {
            kind: TASK.to_string(),
            content: content.into(),
            from,
        }
    }

    pub fn result(from: u64, content: impl Into<String>) -> Self {
        Self {
            kind: RESULT.to_string(),
            content: content.into(),
            from,
        }
    }
}

/// Reads the next message from a line-delimited JSON stream.
///
/// Returns `Ok(None)` on a clean end of stream. A line that is not valid
/// JSON yields an `InvalidData` error; callers treat that as the end of the
/// session.
pub async fn read_message<R>(reader: &mut R) -> io::Result<Option<Message>>
where
    R: AsyncBufRead + Unpin,
{
    // Line-oriented framing keeps each message self-delimiting on the stream.
    let mut line = String::new();
    loop {
        line.clear();
        let bytes = reader.read_line(&mut line).await?;
        if bytes == 0 {
            return Ok(None);
        }

        let trimmed = line.trim_end_matches(LINE_ENDINGS);
        if trimmed.is_empty() {
            continue;
        }

        let parsed = serde_json::from_str(trimmed).map_err(to_io_error)?;
        return Ok(Some(parsed));
    }
}

pub async fn write_message<W>(writer: &mut W, message: &Message) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    // Encode once, append the newline delimiter, and flush so peers see the
    // message without waiting on further traffic.
    let mut encoded = serde_json::to_vec(message).map_err(to_io_error)?;
    encoded.push(b'\n');
    writer.write_all(&encoded).await?;
    writer.flush().await?;
    Ok(())
}

fn to_io_error(err: serde_json::Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, err)
}
