//! Session registry.
//!
//! The registry owns every [`Session`] and the [`PeerHandle`]s occupying its
//! two role slots. All state sits behind one `std::sync::RwLock` which is
//! only ever held for in-memory work, never across an `.await`.

use crate::error::{Result, SignalError};
use crate::protocol::{PeerId, Role, SessionToken, SignalMessage};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::{Notify, mpsc};
use tokio::time::Instant;

/// The registry's view of a connected peer.
#[derive(Debug, Clone)]
pub struct PeerHandle {
    id: PeerId,
    outbound: mpsc::Sender<SignalMessage>,
    eviction: Arc<Notify>,
}

impl PeerHandle {
    /// Create a handle around a peer's outbound queue and eviction signal.
    pub fn new(id: PeerId, outbound: mpsc::Sender<SignalMessage>, eviction: Arc<Notify>) -> Self {
        Self {
            id,
            outbound,
            eviction,
        }
    }

    /// Peer identifier
    pub fn id(&self) -> PeerId {
        self.id
    }

    /// Enqueue a message without waiting.
    ///
    /// # Errors
    ///
    /// [`SignalError::ChannelSaturated`] if the queue is full,
    /// [`SignalError::PeerNotFound`] if the peer's write task is gone.
    pub fn deliver(&self, msg: SignalMessage) -> Result<()> {
        self.outbound.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SignalError::ChannelSaturated,
            mpsc::error::TrySendError::Closed(_) => SignalError::PeerNotFound,
        })
    }

    /// Wake the peer's read loop so the connection shuts down.
    pub fn evict(&self) {
        self.eviction.notify_one();
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No peers yet
    Empty,
    /// One peer, never paired
    HalfOccupied,
    /// Both slots occupied
    FullyPaired,
    /// One peer left after its counterpart departed
    Draining,
}

/// A rendezvous session with one slot per role.
#[derive(Debug)]
pub struct Session {
    created_at: Instant,
    sender: Option<PeerHandle>,
    receiver: Option<PeerHandle>,
    paired: bool,
}

impl Session {
    fn new(created_at: Instant) -> Self {
        Self {
            created_at,
            sender: None,
            receiver: None,
            paired: false,
        }
    }

    fn slot(&self, role: Role) -> &Option<PeerHandle> {
        match role {
            Role::Sender => &self.sender,
            Role::Receiver => &self.receiver,
        }
    }

    fn slot_mut(&mut self, role: Role) -> &mut Option<PeerHandle> {
        match role {
            Role::Sender => &mut self.sender,
            Role::Receiver => &mut self.receiver,
        }
    }

    fn role_of(&self, peer: PeerId) -> Option<Role> {
        if self.sender.as_ref().is_some_and(|p| p.id == peer) {
            Some(Role::Sender)
        } else if self.receiver.as_ref().is_some_and(|p| p.id == peer) {
            Some(Role::Receiver)
        } else {
            None
        }
    }

    fn is_empty(&self) -> bool {
        self.sender.is_none() && self.receiver.is_none()
    }

    fn state(&self) -> SessionState {
        match (self.sender.is_some(), self.receiver.is_some()) {
            (true, true) => SessionState::FullyPaired,
            (false, false) => SessionState::Empty,
            _ if self.paired => SessionState::Draining,
            _ => SessionState::HalfOccupied,
        }
    }

    fn peers(&self) -> impl Iterator<Item = &PeerHandle> {
        self.sender.iter().chain(self.receiver.iter())
    }
}

/// Registry statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Live sessions
    pub sessions: usize,
    /// Connected peers across all sessions
    pub peers: usize,
    /// Sessions with both slots occupied
    pub paired: usize,
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<SessionToken, Session>,
    /// Tokens removed by the sweeper, kept for one more TTL so late joiners
    /// see `ExpiredSession` rather than `SessionNotFound`.
    expired: HashMap<SessionToken, Instant>,
}

impl Inner {
    fn missing(&self, token: &SessionToken) -> SignalError {
        if self.expired.contains_key(token) {
            SignalError::ExpiredSession
        } else {
            SignalError::SessionNotFound
        }
    }
}

/// In-memory session registry.
#[derive(Default)]
pub struct Registry {
    inner: RwLock<Inner>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a new, empty session with a fresh random token.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Random`] if the CSPRNG fails.
    pub fn create_session(&self) -> Result<SessionToken> {
        let token = SessionToken::random()?;
        self.write().sessions.insert(token, Session::new(Instant::now()));
        tracing::info!(session = %token, "session created");
        Ok(token)
    }

    /// Place a peer in a session's role slot.
    ///
    /// Returns `true` when the session is fully paired afterwards.
    ///
    /// # Errors
    ///
    /// [`SignalError::SessionNotFound`] (or [`SignalError::ExpiredSession`])
    /// for an unknown token, [`SignalError::DuplicateRole`] if the slot is
    /// already taken. The existing occupant is left untouched.
    pub fn add_peer(&self, token: &SessionToken, peer: PeerHandle, role: Role) -> Result<bool> {
        let mut inner = self.write();
        let Some(session) = inner.sessions.get_mut(token) else {
            return Err(inner.missing(token));
        };

        let slot = session.slot_mut(role);
        if slot.is_some() {
            return Err(SignalError::DuplicateRole);
        }
        let id = peer.id;
        *slot = Some(peer);

        let paired = session.sender.is_some() && session.receiver.is_some();
        if paired {
            session.paired = true;
        }
        tracing::info!(session = %token, peer = %id, %role, paired, "peer joined");
        Ok(paired)
    }

    /// Remove a peer from a session.
    ///
    /// Idempotent. The session is deleted once a removal leaves both slots
    /// empty. Returns `true` if a slot was cleared.
    pub fn remove_peer(&self, token: &SessionToken, peer: PeerId) -> bool {
        let mut inner = self.write();
        let Some(session) = inner.sessions.get_mut(token) else {
            return false;
        };
        let Some(role) = session.role_of(peer) else {
            return false;
        };

        *session.slot_mut(role) = None;
        tracing::info!(session = %token, %peer, %role, "peer left");

        if session.is_empty() {
            inner.sessions.remove(token);
            tracing::info!(session = %token, "session closed");
        }
        true
    }

    /// Deliver a message to the counterpart of `from`.
    ///
    /// # Errors
    ///
    /// [`SignalError::SessionNotFound`] if the token is unknown or `from` is
    /// not in the session, [`SignalError::PeerNotFound`] if there is no
    /// counterpart yet, [`SignalError::ChannelSaturated`] if its queue is full.
    pub fn route_to_other(&self, token: &SessionToken, from: PeerId, msg: SignalMessage) -> Result<()> {
        let inner = self.read();
        let Some(session) = inner.sessions.get(token) else {
            return Err(inner.missing(token));
        };
        let role = session.role_of(from).ok_or(SignalError::SessionNotFound)?;
        session
            .slot(role.other())
            .as_ref()
            .ok_or(SignalError::PeerNotFound)?
            .deliver(msg)
    }

    /// Deliver a message to whichever peer occupies `role`.
    ///
    /// # Errors
    ///
    /// Same as [`Registry::route_to_other`].
    pub fn send_to_role(&self, token: &SessionToken, role: Role, msg: SignalMessage) -> Result<()> {
        let inner = self.read();
        let Some(session) = inner.sessions.get(token) else {
            return Err(inner.missing(token));
        };
        session
            .slot(role)
            .as_ref()
            .ok_or(SignalError::PeerNotFound)?
            .deliver(msg)
    }

    /// Evict every session older than `ttl`.
    ///
    /// Occupied slots receive `Expired` (best effort) and an eviction signal.
    /// Returns the evicted tokens.
    pub fn sweep_expired(&self, now: Instant, ttl: Duration) -> Vec<SessionToken> {
        let mut inner = self.write();

        inner
            .expired
            .retain(|_, at| now.saturating_duration_since(*at) <= ttl);

        let stale: Vec<SessionToken> = inner
            .sessions
            .iter()
            .filter(|(_, s)| now.saturating_duration_since(s.created_at) > ttl)
            .map(|(token, _)| *token)
            .collect();

        for token in &stale {
            if let Some(session) = inner.sessions.remove(token) {
                for peer in session.peers() {
                    if let Err(e) = peer.deliver(SignalMessage::Expired) {
                        tracing::debug!(session = %token, peer = %peer.id, "expiry notice dropped: {e}");
                    }
                    peer.evict();
                }
            }
            inner.expired.insert(*token, now);
        }

        stale
    }

    /// Current lifecycle state of a session, if it exists.
    pub fn session_state(&self, token: &SessionToken) -> Option<SessionState> {
        self.read().sessions.get(token).map(Session::state)
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.read().sessions.len()
    }

    /// Aggregate statistics.
    pub fn stats(&self) -> RegistryStats {
        let inner = self.read();
        inner
            .sessions
            .values()
            .fold(RegistryStats::default(), |mut stats, session| {
                stats.sessions += 1;
                stats.peers += session.peers().count();
                if session.state() == SessionState::FullyPaired {
                    stats.paired += 1;
                }
                stats
            })
    }
}
