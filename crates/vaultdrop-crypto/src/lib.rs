//! # Vaultdrop Crypto
//!
//! Cryptographic building blocks for Vaultdrop transfers.
//!
//! This crate provides:
//! - `XChaCha20-Poly1305` AEAD sealing of transfer chunks
//! - Per-chunk nonce derivation from a random base nonce and the chunk index
//! - BLAKE3 content hashing for end-to-end integrity checks
//! - Secure random identifiers and key material from the OS CSPRNG
//! - Constant-time comparison helpers
//!
//! ## Cryptographic Suite
//!
//! | Function | Algorithm | Security Level |
//! |----------|-----------|----------------|
//! | AEAD | XChaCha20-Poly1305 | 256-bit key |
//! | Content hash | BLAKE3 | 128-bit collision |
//! | Randomness | OS CSPRNG (`getrandom`) | N/A |
//!
//! Keys and base nonces are generated fresh for every transfer and never
//! reused across attempts.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod aead;
pub mod constant_time;
pub mod error;
pub mod hash;
pub mod random;

pub use aead::{AeadKey, KEY_SIZE, NONCE_SIZE, Nonce, TAG_SIZE, chunk_nonce};
pub use error::CryptoError;
pub use hash::{ContentHash, ContentHasher};
