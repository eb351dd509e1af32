//! # Vaultdrop Signal
//!
//! Rendezvous signaling for Vaultdrop.
//!
//! This crate provides:
//! - An in-memory session registry pairing one sender with one receiver
//! - A per-connection peer handler (read loop plus write task over a bounded
//!   queue)
//! - A pass-through relay for session descriptions and ICE candidates
//! - A background sweeper evicting stale sessions
//! - An axum HTTP/WebSocket server exposing all of the above
//!
//! The relay never inspects negotiation payloads, and never sees file
//! contents or keys.
//!
//! ## Example
//!
//! ```rust,no_run
//! use vaultdrop_signal::{ServerConfig, SignalServer};
//!
//! # async fn run() -> Result<(), vaultdrop_signal::SignalError> {
//! let server = SignalServer::new(ServerConfig::default())?;
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod peer;
pub mod protocol;
pub mod registry;
pub mod relay;
pub mod server;
pub mod sweeper;

use std::time::Duration;

pub use error::{Result, SignalError};
pub use peer::{Binding, PeerState, run_peer};
pub use protocol::{Negotiation, NegotiationBlob, PeerId, Role, SessionToken, SignalMessage};
pub use registry::{PeerHandle, Registry, RegistryStats, SessionState};
pub use relay::SignalRelay;
pub use server::{ServerConfig, SignalServer};
pub use sweeper::spawn_sweeper;

/// Default per-peer outbound queue capacity
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 16;

/// Default session lifetime (30 minutes)
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// Default sweeper interval (5 minutes)
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);
