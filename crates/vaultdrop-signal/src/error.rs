//! Signaling error types.

use thiserror::Error;
use vaultdrop_crypto::CryptoError;

/// Errors raised by the registry, relay and server.
///
/// Registry and relay errors are reported only to the peer that caused them,
/// as an `error` message carrying [`SignalError::code`].
#[derive(Debug, Error)]
pub enum SignalError {
    /// Session token is unknown
    #[error("session not found")]
    SessionNotFound,

    /// The requested role slot is already occupied
    #[error("role already taken in this session")]
    DuplicateRole,

    /// A joined peer asked to join again under the other role
    #[error("peer already joined with a different role")]
    RoleMismatch,

    /// No counterpart is connected yet
    #[error("peer not found")]
    PeerNotFound,

    /// Counterpart's outbound queue is full
    #[error("peer outbound queue is full")]
    ChannelSaturated,

    /// Control message could not be decoded
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// Session was evicted by the expiry sweeper
    #[error("session expired")]
    ExpiredSession,

    /// Random token generation failed
    #[error("token generation failed: {0}")]
    Random(#[from] CryptoError),

    /// Invalid server configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Network I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SignalError {
    /// Stable code carried in `error` messages.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            SignalError::SessionNotFound => "session-not-found",
            SignalError::DuplicateRole => "duplicate-role",
            SignalError::RoleMismatch => "role-mismatch",
            SignalError::PeerNotFound => "peer-not-found",
            SignalError::ChannelSaturated => "channel-saturated",
            SignalError::MalformedMessage(_) => "malformed-message",
            SignalError::ExpiredSession => "expired-session",
            SignalError::Random(_) | SignalError::Config(_) | SignalError::Io(_) => "internal",
        }
    }
}

/// Result alias for signaling operations
pub type Result<T> = std::result::Result<T, SignalError>;
