//! BLAKE3 content hashing.
//!
//! The sender hashes the whole plaintext before encrypting anything; the
//! receiver recomputes the digest over the reassembled plaintext and accepts
//! the transfer only if both digests are equal.

use crate::CryptoError;
use crate::constant_time::verify_32;
use std::fmt;

/// BLAKE3 digest of a transfer's plaintext.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Compute the digest of `data` in one pass.
    #[must_use]
    pub fn of(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Wrap raw digest bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a lowercase or uppercase hex digest.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidHash` if the input is not 64 hex chars.
    pub fn from_hex(hex_digest: &str) -> Result<Self, CryptoError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(hex_digest, &mut bytes)
            .map_err(|e| CryptoError::InvalidHash(e.to_string()))?;
        Ok(Self(bytes))
    }

    /// Lowercase hex encoding, as carried in transfer metadata.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Timing-safe equality check.
    #[must_use]
    pub fn matches(&self, other: &ContentHash) -> bool {
        verify_32(&self.0, &other.0)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Incremental BLAKE3 hasher.
///
/// Lets the receiver hash plaintext chunk by chunk as they are decrypted.
pub struct ContentHasher {
    hasher: blake3::Hasher,
    total_len: u64,
}

impl ContentHasher {
    /// Create a new hasher.
    #[must_use]
    pub fn new() -> Self {
        Self {
            hasher: blake3::Hasher::new(),
            total_len: 0,
        }
    }

    /// Update with more data.
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
        self.total_len += data.len() as u64;
    }

    /// Total bytes hashed so far.
    #[must_use]
    pub fn total_len(&self) -> u64 {
        self.total_len
    }

    /// Finalize and return the digest.
    #[must_use]
    pub fn finalize(&self) -> ContentHash {
        ContentHash(*self.hasher.finalize().as_bytes())
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}
