//! Cryptographic error types.

use thiserror::Error;

/// Cryptographic errors
#[derive(Debug, Error)]
pub enum CryptoError {
    /// AEAD encryption failed
    #[error("encryption failed")]
    EncryptionFailed,

    /// AEAD decryption failed (authentication failure)
    #[error("decryption failed: authentication failure")]
    DecryptionFailed,

    /// Hex digest could not be parsed
    #[error("invalid hash encoding: {0}")]
    InvalidHash(String),

    /// Random number generation failed
    #[error("random number generation failed")]
    RandomFailed,
}
