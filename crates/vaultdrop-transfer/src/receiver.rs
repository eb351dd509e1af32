//! Receiving side of the transfer engine.
//!
//! [`TransferReceiver`] is a frame-driven state machine: feed it frames in
//! arrival order with [`TransferReceiver::handle_frame`], or let
//! [`TransferReceiver::receive`] drive it from a stream. Each chunk is
//! decrypted and hashed as it arrives. Plaintext is only handed out after the
//! whole-file digest matches the announced one.

use crate::MAX_FRAME_LEN;
use crate::chunker::chunk_count;
use crate::error::{Result, TransferError};
use crate::progress::{ProgressTracker, TransferDirection, TransferProgress};
use crate::protocol::{ChannelFrame, ControlMessage, TransferMetadata};
use futures::{Stream, StreamExt};
use std::pin::pin;
use std::sync::Arc;
use tokio::sync::watch;
use vaultdrop_crypto::{AeadKey, ContentHash, ContentHasher, Nonce, chunk_nonce};
use zeroize::Zeroizing;

/// Upper bound on the up-front buffer reservation; larger files grow the
/// buffer as chunks arrive.
const MAX_PREALLOCATION: u64 = 16 * 1024 * 1024;

/// A verified, fully received file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFile {
    /// File name as announced by the sender
    pub name: String,
    /// MIME type as announced by the sender
    pub mime_type: String,
    /// Plaintext contents
    pub data: Vec<u8>,
    /// Verified BLAKE3 digest
    pub hash: ContentHash,
}

struct Incoming {
    name: String,
    mime_type: String,
    size: u64,
    expected_hash: ContentHash,
    expected_chunks: u64,
    key: AeadKey,
    base_nonce: Nonce,
    received_chunks: u64,
    hasher: ContentHasher,
    buffer: Zeroizing<Vec<u8>>,
}

impl Incoming {
    fn from_metadata(meta: &TransferMetadata) -> Result<Self> {
        let expected_hash = ContentHash::from_hex(&meta.hash)
            .map_err(|e| TransferError::MalformedControl(e.to_string()))?;

        Ok(Self {
            name: meta.name.clone(),
            mime_type: meta.mime_type.clone(),
            size: meta.size,
            expected_hash,
            expected_chunks: chunk_count(meta.size),
            key: AeadKey::new(meta.key),
            base_nonce: Nonce::from_bytes(meta.base_nonce),
            received_chunks: 0,
            hasher: ContentHasher::new(),
            buffer: Zeroizing::new(Vec::with_capacity(
                meta.size.min(MAX_PREALLOCATION) as usize,
            )),
        })
    }

    fn open_chunk(&mut self, sealed: &[u8]) -> Result<usize> {
        let index = self.received_chunks;
        if index >= self.expected_chunks {
            return Err(TransferError::ChunkCount {
                expected: self.expected_chunks,
                received: index + 1,
            });
        }
        if sealed.len() > MAX_FRAME_LEN {
            return Err(TransferError::FrameTooLarge {
                index,
                len: sealed.len(),
            });
        }

        let plaintext = Zeroizing::new(
            self.key
                .decrypt(&chunk_nonce(&self.base_nonce, index), sealed, &[])
                .map_err(|_| TransferError::Decryption { index })?,
        );

        let received = self.buffer.len() as u64 + plaintext.len() as u64;
        if received > self.size {
            return Err(TransferError::SizeMismatch {
                expected: self.size,
                received,
            });
        }

        self.hasher.update(&plaintext);
        self.buffer.extend_from_slice(&plaintext);
        self.received_chunks += 1;
        Ok(plaintext.len())
    }

    fn finish(mut self) -> Result<ReceivedFile> {
        if self.received_chunks != self.expected_chunks {
            return Err(TransferError::ChunkCount {
                expected: self.expected_chunks,
                received: self.received_chunks,
            });
        }
        let received = self.buffer.len() as u64;
        if received != self.size {
            return Err(TransferError::SizeMismatch {
                expected: self.size,
                received,
            });
        }

        let actual = self.hasher.finalize();
        if !self.expected_hash.matches(&actual) {
            return Err(TransferError::Integrity {
                expected: self.expected_hash,
                actual,
            });
        }

        Ok(ReceivedFile {
            name: std::mem::take(&mut self.name),
            mime_type: std::mem::take(&mut self.mime_type),
            data: std::mem::take(&mut *self.buffer),
            hash: actual,
        })
    }
}

enum Phase {
    AwaitingMetadata,
    Receiving(Box<Incoming>),
    Finished,
    Aborted,
}

/// Receives and verifies one file.
pub struct TransferReceiver {
    phase: Phase,
    tracker: ProgressTracker,
}

impl Default for TransferReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferReceiver {
    /// Create a receiver waiting for a metadata frame.
    pub fn new() -> Self {
        Self {
            phase: Phase::AwaitingMetadata,
            tracker: ProgressTracker::new(TransferDirection::Receive, None),
        }
    }

    /// Publish progress snapshots on `tx`.
    #[must_use]
    pub fn with_progress(mut self, tx: watch::Sender<TransferProgress>) -> Self {
        self.tracker = ProgressTracker::new(TransferDirection::Receive, Some(Arc::new(tx)));
        self
    }

    /// Latest progress snapshot.
    pub fn progress(&self) -> TransferProgress {
        self.tracker.snapshot()
    }

    /// Feed one frame.
    ///
    /// Returns the verified file once `complete` arrives. Any error aborts the
    /// transfer: received plaintext is zeroized and every later frame is
    /// rejected.
    ///
    /// # Errors
    ///
    /// See [`TransferError`]; every variant except `Crypto` can be produced
    /// here.
    pub fn handle_frame(&mut self, frame: ChannelFrame) -> Result<Option<ReceivedFile>> {
        let live = matches!(self.phase, Phase::AwaitingMetadata | Phase::Receiving(_));
        let result = self.step(frame);
        if let Err(e) = &result {
            if live {
                tracing::warn!("transfer aborted: {e}");
                self.phase = Phase::Aborted;
                self.tracker.fail();
            }
        }
        result
    }

    fn step(&mut self, frame: ChannelFrame) -> Result<Option<ReceivedFile>> {
        match std::mem::replace(&mut self.phase, Phase::Aborted) {
            Phase::AwaitingMetadata => match frame {
                ChannelFrame::Text(text) => match ControlMessage::from_json(&text)? {
                    ControlMessage::Metadata { data } => {
                        let incoming = Incoming::from_metadata(&data)?;
                        tracing::info!(
                            name = %incoming.name,
                            size = incoming.size,
                            chunks = incoming.expected_chunks,
                            "incoming transfer"
                        );
                        self.tracker.start(incoming.size, incoming.expected_chunks);
                        self.phase = Phase::Receiving(Box::new(incoming));
                        Ok(None)
                    }
                    ControlMessage::Complete => {
                        Err(TransferError::UnexpectedFrame("complete before metadata"))
                    }
                },
                ChannelFrame::Binary(_) => {
                    Err(TransferError::UnexpectedFrame("chunk before metadata"))
                }
            },

            Phase::Receiving(mut incoming) => match frame {
                ChannelFrame::Binary(sealed) => {
                    let len = incoming.open_chunk(&sealed)?;
                    self.tracker.chunk(len);
                    self.phase = Phase::Receiving(incoming);
                    Ok(None)
                }
                ChannelFrame::Text(text) => match ControlMessage::from_json(&text)? {
                    ControlMessage::Metadata { .. } => {
                        Err(TransferError::UnexpectedFrame("duplicate metadata"))
                    }
                    ControlMessage::Complete => {
                        let file = incoming.finish()?;
                        tracing::info!(name = %file.name, size = file.data.len(), "transfer verified");
                        self.phase = Phase::Finished;
                        self.tracker.complete();
                        Ok(Some(file))
                    }
                },
            },

            Phase::Finished => {
                self.phase = Phase::Finished;
                Err(TransferError::UnexpectedFrame("transfer already finished"))
            }
            Phase::Aborted => Err(TransferError::UnexpectedFrame("transfer aborted")),
        }
    }

    /// Drive the receiver from a frame stream until the file is complete.
    ///
    /// # Errors
    ///
    /// Any error from [`TransferReceiver::handle_frame`], or
    /// [`TransferError::ChannelClosed`] if the stream ends first.
    pub async fn receive<S>(mut self, frames: S) -> Result<ReceivedFile>
    where
        S: Stream<Item = ChannelFrame>,
    {
        let mut frames = pin!(frames);
        while let Some(frame) = frames.next().await {
            if let Some(file) = self.handle_frame(frame)? {
                return Ok(file);
            }
        }

        self.phase = Phase::Aborted;
        self.tracker.fail();
        tracing::warn!("channel closed before transfer completed");
        Err(TransferError::ChannelClosed)
    }
}
