//! Sending side of the transfer engine.

use crate::channel::FrameSink;
use crate::chunker::{chunk_count, chunks};
use crate::error::Result;
use crate::mime_for_name;
use crate::progress::{ProgressTracker, TransferDirection, TransferProgress};
use crate::protocol::{ChannelFrame, ControlMessage, TransferMetadata};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use vaultdrop_crypto::{AeadKey, ContentHash, Nonce, chunk_nonce};

/// Transfer tuning
#[derive(Debug, Clone, Default)]
pub struct TransferConfig {
    /// Delay between chunk frames; zero disables pacing
    pub pacing: Duration,
}

/// Summary of a finished send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    /// File name announced to the receiver
    pub name: String,
    /// Plaintext size
    pub size: u64,
    /// Chunks sent
    pub chunks: u64,
    /// BLAKE3 digest of the plaintext
    pub hash: ContentHash,
}

/// Seals and sends one file per [`TransferSender::send`] call.
#[derive(Debug, Default)]
pub struct TransferSender {
    config: TransferConfig,
    progress: Option<Arc<watch::Sender<TransferProgress>>>,
}

impl TransferSender {
    /// Create a sender.
    pub fn new(config: TransferConfig) -> Self {
        Self {
            config,
            progress: None,
        }
    }

    /// Publish progress snapshots on `tx`.
    #[must_use]
    pub fn with_progress(mut self, tx: watch::Sender<TransferProgress>) -> Self {
        self.progress = Some(Arc::new(tx));
        self
    }

    /// Send `data` as a file called `name`.
    ///
    /// A fresh key and base nonce are generated for every call and dropped
    /// (zeroized) before it returns. When `mime_type` is `None` it is guessed
    /// from the file extension.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::ChannelClosed`](crate::TransferError::ChannelClosed)
    /// if the sink goes away, or a crypto error if key generation or sealing
    /// fails.
    pub async fn send<S: FrameSink>(
        &self,
        sink: &mut S,
        name: &str,
        mime_type: Option<&str>,
        data: &[u8],
    ) -> Result<TransferReport> {
        let mut tracker = ProgressTracker::new(TransferDirection::Send, self.progress.clone());
        let result = self.send_inner(sink, name, mime_type, data, &mut tracker).await;
        match &result {
            Ok(report) => {
                tracker.complete();
                tracing::info!(
                    name = %report.name,
                    size = report.size,
                    chunks = report.chunks,
                    "transfer sent"
                );
            }
            Err(e) => {
                tracker.fail();
                tracing::warn!(name, "transfer send failed: {e}");
            }
        }
        result
    }

    async fn send_inner<S: FrameSink>(
        &self,
        sink: &mut S,
        name: &str,
        mime_type: Option<&str>,
        data: &[u8],
        tracker: &mut ProgressTracker,
    ) -> Result<TransferReport> {
        let hash = ContentHash::of(data);
        let key = AeadKey::random()?;
        let base_nonce = Nonce::random()?;

        let size = data.len() as u64;
        let total_chunks = chunk_count(size);
        tracker.start(size, total_chunks);

        let announce = ControlMessage::Metadata {
            data: TransferMetadata {
                name: name.to_string(),
                size,
                mime_type: mime_type.unwrap_or_else(|| mime_for_name(name)).to_string(),
                hash: hash.to_hex(),
                key: *key.as_bytes(),
                base_nonce: *base_nonce.as_bytes(),
            },
        };
        let text = announce.to_json()?;
        drop(announce);
        sink.send_frame(ChannelFrame::Text(text)).await?;

        for (index, chunk) in chunks(data) {
            let sealed = key.encrypt(&chunk_nonce(&base_nonce, index), chunk, &[])?;
            sink.send_frame(ChannelFrame::Binary(sealed)).await?;
            tracker.chunk(chunk.len());
            tracing::trace!(index, len = chunk.len(), "chunk sent");

            if !self.config.pacing.is_zero() && index + 1 < total_chunks {
                tokio::time::sleep(self.config.pacing).await;
            }
        }

        sink.send_frame(ChannelFrame::Text(ControlMessage::Complete.to_json()?))
            .await?;

        Ok(TransferReport {
            name: name.to_string(),
            size,
            chunks: total_chunks,
            hash,
        })
    }
}
