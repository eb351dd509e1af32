//! Transfer wire format.
//!
//! Control messages are JSON text frames; chunks travel as binary frames
//! holding `ciphertext || tag` with no header.

use crate::error::{Result, TransferError};
use serde::{Deserialize, Serialize};
use std::fmt;
use vaultdrop_crypto::{KEY_SIZE, NONCE_SIZE};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A frame on the direct peer channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelFrame {
    /// JSON control message
    Text(String),
    /// Sealed chunk
    Binary(Vec<u8>),
}

/// Everything the receiver needs to decrypt and verify a file.
///
/// Carries the transfer key; zeroized on drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct TransferMetadata {
    /// File name
    pub name: String,
    /// Plaintext size in bytes
    pub size: u64,
    /// MIME type
    pub mime_type: String,
    /// Lowercase hex BLAKE3 digest of the plaintext
    pub hash: String,
    /// XChaCha20-Poly1305 key
    pub key: [u8; KEY_SIZE],
    /// Base nonce for per-chunk derivation
    pub base_nonce: [u8; NONCE_SIZE],
}

impl fmt::Debug for TransferMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferMetadata")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("mime_type", &self.mime_type)
            .field("hash", &self.hash)
            .field("key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Control messages exchanged as text frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    /// Announces a transfer; always the first frame
    Metadata {
        /// Transfer parameters
        data: TransferMetadata,
    },
    /// Marks the end of the chunk stream
    Complete,
}

impl ControlMessage {
    /// Encode as JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::MalformedControl`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| TransferError::MalformedControl(e.to_string()))
    }

    /// Decode from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::MalformedControl`] for anything that is not
    /// a well-formed control message.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| TransferError::MalformedControl(e.to_string()))
    }
}
