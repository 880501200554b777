//! JSON-lines host transport.
//!
//! Replies and events are serialized on the controller's thread and handed to
//! a writer task that owns stdout. Once the writer is gone every emission is
//! reported as [`HostError::Detached`].

use controller::{HostChannel, HostError, HostEvent, Reply};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::warn;

pub struct LineHost {
    out: UnboundedSender<String>,
}

impl LineHost {
    pub fn new() -> (Self, UnboundedReceiver<String>) {
        let (out, rx) = unbounded_channel();
        (Self { out }, rx)
    }

    fn send(&self, line: String) -> Result<(), HostError> {
        self.out.send(line).map_err(|_| HostError::Detached)
    }
}

impl HostChannel for LineHost {
    fn reply(&self, reply: Reply) {
        let id = reply.id;
        match serde_json::to_string(&reply) {
            Ok(line) => {
                if self.send(line).is_err() {
                    warn!(id, "reply dropped, host output closed");
                }
            }
            Err(err) => warn!(id, %err, "reply does not serialize"),
        }
    }

    fn emit(&self, event: HostEvent) -> Result<(), HostError> {
        let line = serde_json::to_string(&event).map_err(|e| HostError::Transport(e.to_string()))?;
        self.send(line)
    }
}

/// Drains `lines` into `out`, one JSON document per line.
pub async fn write_lines<W>(mut lines: UnboundedReceiver<String>, mut out: W) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = lines.recv().await {
        out.write_all(line.as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
    }
    Ok(())
}
