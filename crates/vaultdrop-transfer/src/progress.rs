//! Transfer progress reporting.

use std::sync::Arc;
use tokio::sync::watch;

/// Transfer status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferStatus {
    /// Transfer not started
    #[default]
    Pending,
    /// Chunks are moving
    Active,
    /// Transfer completed and verified
    Completed,
    /// Transfer aborted
    Failed,
}

/// Transfer direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferDirection {
    /// Sending file
    #[default]
    Send,
    /// Receiving file
    Receive,
}

/// Point-in-time view of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferProgress {
    /// Which side this is
    pub direction: TransferDirection,
    /// Current status
    pub status: TransferStatus,
    /// Plaintext bytes sealed or opened so far
    pub bytes_done: u64,
    /// Plaintext size
    pub bytes_total: u64,
    /// Chunks sent or received so far
    pub chunks_done: u64,
    /// Chunks in the transfer
    pub chunks_total: u64,
}

impl TransferProgress {
    /// Completion ratio in `0.0..=1.0`.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        if self.bytes_total == 0 {
            return if self.status == TransferStatus::Completed {
                1.0
            } else {
                0.0
            };
        }
        self.bytes_done as f64 / self.bytes_total as f64
    }

    /// Whether the transfer has stopped, successfully or not.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self.status, TransferStatus::Completed | TransferStatus::Failed)
    }
}

/// Create a progress channel for one transfer.
pub fn progress_channel() -> (watch::Sender<TransferProgress>, watch::Receiver<TransferProgress>) {
    watch::channel(TransferProgress::default())
}

/// Publishes snapshots to an optional watch channel.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    tx: Option<Arc<watch::Sender<TransferProgress>>>,
    current: TransferProgress,
}

impl ProgressTracker {
    pub(crate) fn new(
        direction: TransferDirection,
        tx: Option<Arc<watch::Sender<TransferProgress>>>,
    ) -> Self {
        Self {
            tx,
            current: TransferProgress {
                direction,
                ..TransferProgress::default()
            },
        }
    }

    pub(crate) fn start(&mut self, bytes_total: u64, chunks_total: u64) {
        self.current.status = TransferStatus::Active;
        self.current.bytes_total = bytes_total;
        self.current.chunks_total = chunks_total;
        self.publish();
    }

    pub(crate) fn chunk(&mut self, bytes: usize) {
        self.current.bytes_done += bytes as u64;
        self.current.chunks_done += 1;
        self.publish();
    }

    pub(crate) fn complete(&mut self) {
        self.current.status = TransferStatus::Completed;
        self.publish();
    }

    pub(crate) fn fail(&mut self) {
        self.current.status = TransferStatus::Failed;
        self.publish();
    }

    pub(crate) fn snapshot(&self) -> TransferProgress {
        self.current
    }

    fn publish(&self) {
        if let Some(tx) = &self.tx {
            // No receivers is fine; progress is advisory.
            let _ = tx.send(self.current);
        }
    }
}
