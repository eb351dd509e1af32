//! # Vaultdrop Transfer
//!
//! Encrypted chunked file transfer over an already-open peer channel.
//!
//! This crate provides:
//! - A sender that hashes, seals and streams a file as 64 KiB chunks
//! - A receiver state machine that decrypts and hashes each chunk as it
//!   arrives and only releases plaintext once the whole-file digest matches
//! - Progress snapshots over a `tokio::sync::watch` channel
//! - An in-memory channel for tests and local use
//!
//! ## Wire format
//!
//! ```text
//! text   {"type":"metadata","data":{name,size,mimeType,hash,key,baseNonce}}
//! binary chunk 0 ciphertext || tag
//! binary chunk 1 ciphertext || tag
//! ...
//! text   {"type":"complete"}
//! ```
//!
//! Chunk `i` is sealed with XChaCha20-Poly1305 under the base nonce with
//! `i` (little-endian) XORed into its first eight bytes. Chunk indices are
//! implicit in arrival order, so the channel must be reliable and ordered.
//!
//! ## Example
//!
//! ```rust,no_run
//! use vaultdrop_transfer::{TransferReceiver, TransferSender, memory_channel};
//!
//! # async fn demo() -> Result<(), vaultdrop_transfer::TransferError> {
//! let (mut tx, rx) = memory_channel(16);
//! let receiving = tokio::spawn(TransferReceiver::new().receive(rx));
//!
//! TransferSender::default()
//!     .send(&mut tx, "a.txt", None, b"hello world")
//!     .await?;
//!
//! let file = receiving.await.expect("receiver task")?;
//! assert_eq!(file.data, b"hello world");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod chunker;
pub mod error;
pub mod progress;
pub mod protocol;
pub mod receiver;
pub mod sender;

pub use channel::{FrameSink, memory_channel};
pub use error::{Result, TransferError};
pub use progress::{TransferDirection, TransferProgress, TransferStatus, progress_channel};
pub use protocol::{ChannelFrame, ControlMessage, TransferMetadata};
pub use receiver::{ReceivedFile, TransferReceiver};
pub use sender::{TransferConfig, TransferReport, TransferSender};

/// Plaintext chunk size (64 KiB)
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Largest valid binary frame: one full chunk plus its tag
pub const MAX_FRAME_LEN: usize = CHUNK_SIZE + vaultdrop_crypto::TAG_SIZE;

/// Fallback MIME type
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Guess a MIME type from a file name's extension.
///
/// Unknown or missing extensions map to [`DEFAULT_MIME_TYPE`].
#[must_use]
pub fn mime_for_name(name: &str) -> &'static str {
    let Some((_, ext)) = name.rsplit_once('.') else {
        return DEFAULT_MIME_TYPE;
    };

    match ext.to_ascii_lowercase().as_str() {
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "js" => "text/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => DEFAULT_MIME_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_for_name() {
        assert_eq!(mime_for_name("a.txt"), "text/plain");
        assert_eq!(mime_for_name("Photo.JPG"), "image/jpeg");
        assert_eq!(mime_for_name("archive.tar.gz"), "application/gzip");
        assert_eq!(mime_for_name("README"), DEFAULT_MIME_TYPE);
        assert_eq!(mime_for_name("weird.xyz"), DEFAULT_MIME_TYPE);
    }

    #[test]
    fn test_frame_limit() {
        assert_eq!(MAX_FRAME_LEN, 65_536 + 16);
    }
}
