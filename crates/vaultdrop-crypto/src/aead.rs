//! `XChaCha20-Poly1305` AEAD sealing for transfer chunks.
//!
//! Every transfer uses a fresh random [`AeadKey`] and a fresh random base
//! [`Nonce`]. The nonce for chunk `i` is the base nonce with the
//! little-endian bytes of `i` XORed into its low-order bytes (see
//! [`chunk_nonce`]), so each chunk of a transfer gets a distinct nonce
//! without any per-chunk nonce travelling on the wire.
//!
//! ## Usage
//!
//! ```
//! use vaultdrop_crypto::aead::{AeadKey, Nonce, chunk_nonce};
//!
//! let key = AeadKey::random().unwrap();
//! let base = Nonce::random().unwrap();
//!
//! let nonce = chunk_nonce(&base, 0);
//! let ciphertext = key.encrypt(&nonce, b"secret", b"").unwrap();
//! let plaintext = key.decrypt(&nonce, &ciphertext, b"").unwrap();
//! assert_eq!(plaintext, b"secret");
//! ```

use crate::CryptoError;
use crate::random::{fill_random, random_32};
use chacha20poly1305::{
    XChaCha20Poly1305,
    aead::{Aead, KeyInit, Payload},
};
use zeroize::ZeroizeOnDrop;

/// Authentication tag size (16 bytes / 128 bits).
pub const TAG_SIZE: usize = 16;

/// XChaCha20-Poly1305 nonce size (24 bytes / 192 bits).
pub const NONCE_SIZE: usize = 24;

/// AEAD key size (32 bytes / 256 bits).
pub const KEY_SIZE: usize = 32;

/// Number of low-order nonce bytes that carry the chunk index.
const INDEX_BYTES: usize = 8;

/// XChaCha20-Poly1305 nonce (24 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Nonce([u8; NONCE_SIZE]);

impl Nonce {
    /// Create a nonce from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Generate a random nonce from the OS CSPRNG.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::RandomFailed` if the CSPRNG fails.
    pub fn random() -> Result<Self, CryptoError> {
        let mut bytes = [0u8; NONCE_SIZE];
        fill_random(&mut bytes)?;
        Ok(Self(bytes))
    }

    /// Get raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }

    /// Get as a reference for chacha20poly1305.
    fn as_generic(&self) -> &chacha20poly1305::XNonce {
        chacha20poly1305::XNonce::from_slice(&self.0)
    }
}

/// Derive the nonce for chunk `index` of a transfer.
///
/// XORs the little-endian encoding of `index` into the first eight bytes of
/// `base`. For a fixed base the mapping is injective in `index`.
#[must_use]
pub fn chunk_nonce(base: &Nonce, index: u64) -> Nonce {
    let mut bytes = base.0;
    for (byte, idx) in bytes[..INDEX_BYTES].iter_mut().zip(index.to_le_bytes()) {
        *byte ^= idx;
    }
    Nonce(bytes)
}

/// AEAD encryption key (32 bytes).
///
/// Wraps the raw key material and provides encryption/decryption methods.
/// Key is zeroized on drop.
#[derive(Clone, ZeroizeOnDrop)]
pub struct AeadKey([u8; KEY_SIZE]);

impl AeadKey {
    /// Create a key from raw bytes.
    #[must_use]
    pub fn new(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Generate a random key from the OS CSPRNG.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::RandomFailed` if the CSPRNG fails.
    pub fn random() -> Result<Self, CryptoError> {
        Ok(Self(random_32()?))
    }

    /// Get raw key bytes.
    ///
    /// # Security
    ///
    /// Handle with extreme care - this exposes the raw key material.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Encrypt plaintext with associated data.
    ///
    /// Returns ciphertext with appended authentication tag (`plaintext.len()` + 16 bytes).
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::EncryptionFailed` if AEAD encryption fails.
    pub fn encrypt(
        &self,
        nonce: &Nonce,
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let cipher = XChaCha20Poly1305::new((&self.0).into());

        cipher
            .encrypt(
                nonce.as_generic(),
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|_| CryptoError::EncryptionFailed)
    }

    /// Decrypt ciphertext with associated data.
    ///
    /// Input must include the authentication tag at the end.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::DecryptionFailed` on authentication failure.
    pub fn decrypt(
        &self,
        nonce: &Nonce,
        ciphertext_and_tag: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        if ciphertext_and_tag.len() < TAG_SIZE {
            return Err(CryptoError::DecryptionFailed);
        }

        let cipher = XChaCha20Poly1305::new((&self.0).into());

        cipher
            .decrypt(
                nonce.as_generic(),
                Payload {
                    msg: ciphertext_and_tag,
                    aad,
                },
            )
            .map_err(|_| CryptoError::DecryptionFailed)
    }
}

impl std::fmt::Debug for AeadKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AeadKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_aead_roundtrip() {
        let key = AeadKey::new([0x42u8; 32]);
        let nonce = Nonce::from_bytes([0u8; 24]);
        let plaintext = b"Hello, Vaultdrop!";

        let ciphertext = key.encrypt(&nonce, plaintext, b"").unwrap();
        assert_eq!(ciphertext.len(), plaintext.len() + TAG_SIZE);

        let decrypted = key.decrypt(&nonce, &ciphertext, b"").unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_aead_tamper_detection() {
        let key = AeadKey::random().unwrap();
        let nonce = Nonce::random().unwrap();

        let mut ciphertext = key.encrypt(&nonce, b"Secret message", b"").unwrap();
        ciphertext[0] ^= 0x01;

        assert!(matches!(
            key.decrypt(&nonce, &ciphertext, b""),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_aead_wrong_nonce_fails() {
        let key = AeadKey::random().unwrap();
        let base = Nonce::random().unwrap();

        let ciphertext = key.encrypt(&chunk_nonce(&base, 0), b"chunk", b"").unwrap();
        assert!(key.decrypt(&chunk_nonce(&base, 1), &ciphertext, b"").is_err());
    }

    #[test]
    fn test_aead_short_input_rejected() {
        let key = AeadKey::new([1u8; 32]);
        let nonce = Nonce::from_bytes([0u8; NONCE_SIZE]);
        assert!(key.decrypt(&nonce, &[0u8; TAG_SIZE - 1], b"").is_err());
    }

    #[test]
    fn test_chunk_nonce_zero_index_is_base() {
        let base = Nonce::from_bytes([0xA5; NONCE_SIZE]);
        assert_eq!(chunk_nonce(&base, 0), base);
    }

    #[test]
    fn test_chunk_nonce_only_touches_low_bytes() {
        let base = Nonce::from_bytes([0xFF; NONCE_SIZE]);
        let derived = chunk_nonce(&base, u64::MAX);
        assert_eq!(&derived.as_bytes()[..8], &[0u8; 8]);
        assert_eq!(&derived.as_bytes()[8..], &base.as_bytes()[8..]);
    }

    #[test]
    fn test_chunk_nonces_pairwise_distinct() {
        let base = Nonce::random().unwrap();
        let nonces: HashSet<Nonce> = (0..1000u64).map(|i| chunk_nonce(&base, i)).collect();
        assert_eq!(nonces.len(), 1000);
    }

    #[test]
    fn test_key_debug_redacted() {
        let key = AeadKey::new([9u8; 32]);
        assert_eq!(format!("{key:?}"), "AeadKey([REDACTED])");
    }
}
