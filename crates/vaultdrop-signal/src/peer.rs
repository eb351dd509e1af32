//! Per-connection peer handler.
//!
//! Each connection runs a read loop and a separate write task. The two share
//! only the bounded outbound queue and the eviction signal.

use crate::error::Result;
use crate::protocol::{PeerId, Role, SessionToken, SignalMessage};
use crate::registry::PeerHandle;
use crate::relay::SignalRelay;
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, mpsc};

/// Time allowed for the write task to flush queued messages after the read
/// loop stops.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Session and role fixed by a peer's first successful join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    /// Bound session
    pub session: SessionToken,
    /// Role in that session
    pub role: Role,
}

/// Connection-local state of one peer.
#[derive(Debug)]
pub struct PeerState {
    handle: PeerHandle,
    binding: Option<Binding>,
}

impl PeerState {
    /// Wrap a fresh, unbound peer.
    pub fn new(handle: PeerHandle) -> Self {
        Self {
            handle,
            binding: None,
        }
    }

    /// Peer identifier
    pub fn id(&self) -> PeerId {
        self.handle.id()
    }

    /// Handle given to the registry on join
    pub fn handle(&self) -> &PeerHandle {
        &self.handle
    }

    /// Current binding, if joined
    pub fn binding(&self) -> Option<Binding> {
        self.binding
    }

    pub(crate) fn bind(&mut self, binding: Binding) {
        self.binding = Some(binding);
    }

    pub(crate) fn unbind(&mut self) -> Option<Binding> {
        self.binding.take()
    }
}

/// Drive one peer connection to completion.
///
/// `inbound` yields text frames from the client; `outbound` accepts text
/// frames for it. The call returns once the client disconnects, the write
/// side fails, or the session is evicted; the peer's registry slot is
/// released before returning.
///
/// # Errors
///
/// Returns an error only if a peer id cannot be generated.
pub async fn run_peer<I, E, O>(
    relay: Arc<SignalRelay>,
    capacity: usize,
    inbound: I,
    outbound: O,
) -> Result<()>
where
    I: Stream<Item = std::result::Result<String, E>>,
    E: Display,
    O: Sink<String> + Send + 'static,
    O::Error: Display + Send,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let eviction = Arc::new(Notify::new());
    let mut peer = PeerState::new(PeerHandle::new(PeerId::random()?, tx, eviction.clone()));
    let id = peer.id();
    tracing::debug!(peer = %id, "peer connected");

    let mut writer = tokio::spawn(write_loop(id, rx, outbound));
    let mut writer_done = false;
    let mut inbound = pin!(inbound);

    loop {
        tokio::select! {
            frame = inbound.next() => match frame {
                Some(Ok(text)) => relay.handle_text(&mut peer, &text),
                Some(Err(e)) => {
                    tracing::debug!(peer = %id, "read failed: {e}");
                    break;
                }
                None => break,
            },
            () = eviction.notified() => {
                tracing::info!(peer = %id, "peer evicted");
                break;
            }
            _ = &mut writer => {
                writer_done = true;
                break;
            }
        }
    }

    relay.disconnect(&mut peer);
    // Dropping the last sender lets the writer drain and exit.
    drop(peer);

    if !writer_done && tokio::time::timeout(DRAIN_TIMEOUT, &mut writer).await.is_err() {
        tracing::warn!(peer = %id, "write task did not drain in time");
        writer.abort();
    }

    tracing::debug!(peer = %id, "peer disconnected");
    Ok(())
}

async fn write_loop<O>(id: PeerId, mut rx: mpsc::Receiver<SignalMessage>, outbound: O)
where
    O: Sink<String>,
    O::Error: Display,
{
    let mut outbound = pin!(outbound);

    while let Some(msg) = rx.recv().await {
        let text = match msg.to_json() {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(peer = %id, "dropping unencodable message: {e}");
                continue;
            }
        };
        if let Err(e) = outbound.send(text).await {
            tracing::warn!(peer = %id, "write failed: {e}");
            return;
        }
    }

    if let Err(e) = outbound.close().await {
        tracing::debug!(peer = %id, "close failed: {e}");
    }
}
