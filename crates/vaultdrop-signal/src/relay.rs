//! Signaling relay.
//!
//! Stateless router over the [`Registry`]: it pairs peers on `join` and
//! forwards negotiation messages to the counterpart without inspecting them.

use crate::error::{Result, SignalError};
use crate::peer::{Binding, PeerState};
use crate::protocol::{Role, SessionToken, SignalMessage};
use crate::registry::Registry;
use std::sync::Arc;

/// Routes decoded signaling messages between paired peers.
#[derive(Clone)]
pub struct SignalRelay {
    registry: Arc<Registry>,
}

impl SignalRelay {
    /// Create a relay over a registry.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Underlying registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Decode and dispatch one inbound text frame.
    ///
    /// Failures are reported to the originating peer only, as an `error`
    /// message. The connection stays up either way.
    pub fn handle_text(&self, peer: &mut PeerState, text: &str) {
        let result = SignalMessage::from_json(text).and_then(|msg| self.handle(peer, msg));

        if let Err(e) = result {
            tracing::warn!(peer = %peer.id(), code = e.code(), "signal rejected: {e}");
            if let Err(send_err) = peer.handle().deliver(SignalMessage::from_error(&e)) {
                tracing::debug!(peer = %peer.id(), "error reply dropped: {send_err}");
            }
        }
    }

    /// Dispatch one decoded message.
    ///
    /// # Errors
    ///
    /// Any registry error for the operation, or
    /// [`SignalError::MalformedMessage`] for server-to-client message types.
    pub fn handle(&self, peer: &mut PeerState, msg: SignalMessage) -> Result<()> {
        match msg {
            SignalMessage::Join { session, role } => self.join(peer, session.as_deref(), role),
            SignalMessage::Offer(_) | SignalMessage::Answer(_) | SignalMessage::Ice(_) => {
                self.forward(peer, msg)
            }
            other => Err(SignalError::MalformedMessage(format!(
                "{} is a server message",
                other.message_type()
            ))),
        }
    }

    /// Bind a peer to a session under `role`.
    ///
    /// A sender with no token opens a new session. On success the joiner gets
    /// `ready`; once both slots are filled the sender gets `peer-joined`.
    ///
    /// # Errors
    ///
    /// [`SignalError::DuplicateRole`] / [`SignalError::RoleMismatch`] for a
    /// peer that already joined, otherwise whatever the registry reports.
    pub fn join(&self, peer: &mut PeerState, session: Option<&str>, role: Role) -> Result<()> {
        if let Some(binding) = peer.binding() {
            return Err(if binding.role == role {
                SignalError::DuplicateRole
            } else {
                SignalError::RoleMismatch
            });
        }

        let token = match (session, role) {
            (Some(raw), _) => raw
                .parse::<SessionToken>()
                .map_err(|_| SignalError::SessionNotFound)?,
            (None, Role::Sender) => self.registry.create_session()?,
            (None, Role::Receiver) => return Err(SignalError::SessionNotFound),
        };

        let paired = self.registry.add_peer(&token, peer.handle().clone(), role)?;
        peer.bind(Binding {
            session: token,
            role,
        });

        if let Err(e) = peer.handle().deliver(SignalMessage::Ready {
            session: token,
            peer_id: peer.id(),
        }) {
            tracing::warn!(peer = %peer.id(), "ready reply dropped: {e}");
        }

        if paired {
            if let Err(e) = self.registry.send_to_role(
                &token,
                Role::Sender,
                SignalMessage::PeerJoined { session: token },
            ) {
                tracing::warn!(session = %token, "peer-joined notice dropped: {e}");
            }
        }

        Ok(())
    }

    /// Forward a negotiation message to the peer's counterpart.
    ///
    /// The message is stamped with the peer's bound session; any session id
    /// the client supplied is ignored.
    ///
    /// # Errors
    ///
    /// [`SignalError::SessionNotFound`] before joining, otherwise whatever
    /// [`Registry::route_to_other`] reports.
    pub fn forward(&self, peer: &PeerState, mut msg: SignalMessage) -> Result<()> {
        let binding = peer.binding().ok_or(SignalError::SessionNotFound)?;
        let session = binding.session;

        let size = match &mut msg {
            SignalMessage::Offer(n) | SignalMessage::Answer(n) | SignalMessage::Ice(n) => {
                n.session = Some(session);
                n.blob.len()
            }
            other => {
                return Err(SignalError::MalformedMessage(format!(
                    "{} cannot be forwarded",
                    other.message_type()
                )));
            }
        };

        tracing::debug!(
            session = %session,
            peer = %peer.id(),
            kind = msg.message_type(),
            bytes = size,
            "forwarding negotiation message"
        );
        self.registry.route_to_other(&session, peer.id(), msg)
    }

    /// Release the peer's registry slot, if it holds one.
    pub fn disconnect(&self, peer: &mut PeerState) {
        if let Some(binding) = peer.unbind() {
            self.registry.remove_peer(&binding.session, peer.id());
        }
    }
}
