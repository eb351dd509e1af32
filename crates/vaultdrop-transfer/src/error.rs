//! Transfer error types.

use thiserror::Error;
use vaultdrop_crypto::{ContentHash, CryptoError};

/// Errors that abort a transfer.
///
/// None of these are retried; the local side of the transfer stops and any
/// partially received plaintext is discarded.
#[derive(Debug, Error)]
pub enum TransferError {
    /// A chunk failed authentication
    #[error("chunk {index} failed to decrypt")]
    Decryption {
        /// Position of the chunk in arrival order
        index: u64,
    },

    /// The reassembled content does not hash to the announced digest
    #[error("integrity check failed: expected {expected}, got {actual}")]
    Integrity {
        /// Digest from the metadata message
        expected: ContentHash,
        /// Digest of the received plaintext
        actual: ContentHash,
    },

    /// A control message could not be decoded
    #[error("malformed control message: {0}")]
    MalformedControl(String),

    /// A frame arrived that the current state does not accept
    #[error("unexpected frame: {0}")]
    UnexpectedFrame(&'static str),

    /// Chunk count disagrees with the announced size
    #[error("expected {expected} chunks, received {received}")]
    ChunkCount {
        /// Chunks implied by the metadata
        expected: u64,
        /// Chunks actually received
        received: u64,
    },

    /// Byte count disagrees with the announced size
    #[error("expected {expected} bytes, received {received}")]
    SizeMismatch {
        /// Size from the metadata
        expected: u64,
        /// Plaintext bytes actually received
        received: u64,
    },

    /// A binary frame exceeds one sealed chunk
    #[error("chunk {index} is {len} bytes, larger than a sealed chunk")]
    FrameTooLarge {
        /// Position of the chunk in arrival order
        index: u64,
        /// Frame length
        len: usize,
    },

    /// The channel closed before the transfer completed
    #[error("channel closed before transfer completed")]
    ChannelClosed,

    /// Key generation or encryption failed
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

/// Result alias for transfer operations
pub type Result<T> = std::result::Result<T, TransferError>;
