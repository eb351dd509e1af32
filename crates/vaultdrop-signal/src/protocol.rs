//! Signaling protocol message definitions.
//!
//! Every message travels as one WebSocket text frame holding a JSON envelope
//! `{type, sessionId?, peerId?, payload?}`.

use crate::error::{Result, SignalError};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::fmt;
use std::str::FromStr;
use vaultdrop_crypto::random::{random_8, random_16};

/// 128-bit session token, rendered as 32 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken([u8; 16]);

impl SessionToken {
    /// Generate a fresh token from the OS CSPRNG.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Random`] if the CSPRNG fails.
    pub fn random() -> Result<Self> {
        Ok(Self(random_16()?))
    }

    /// Wrap raw token bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Raw token bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken({self})")
    }
}

impl FromStr for SessionToken {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self> {
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| SignalError::MalformedMessage(format!("session token: {e}")))?;
        Ok(Self(bytes))
    }
}

/// 64-bit peer identifier, rendered as 16 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(u64);

impl PeerId {
    /// Generate a fresh peer ID from the OS CSPRNG.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Random`] if the CSPRNG fails.
    pub fn random() -> Result<Self> {
        Ok(Self(u64::from_be_bytes(random_8()?)))
    }

    /// Wrap a raw identifier.
    #[must_use]
    pub fn from_u64(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({self})")
    }
}

impl FromStr for PeerId {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() != 16 {
            return Err(SignalError::MalformedMessage(format!(
                "peer id must be 16 hex chars, got {}",
                s.len()
            )));
        }
        u64::from_str_radix(s, 16)
            .map(Self)
            .map_err(|e| SignalError::MalformedMessage(format!("peer id: {e}")))
    }
}

/// Which end of a transfer a peer is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Holds the file; initiates negotiation once paired
    Sender,
    /// Fetches the file
    Receiver,
}

impl Role {
    /// The opposite role.
    #[must_use]
    pub fn other(self) -> Role {
        match self {
            Role::Sender => Role::Receiver,
            Role::Receiver => Role::Sender,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Sender => f.write_str("sender"),
            Role::Receiver => f.write_str("receiver"),
        }
    }
}

/// Opaque negotiation payload (session description or ICE candidate).
///
/// Kept as raw JSON so it is forwarded byte-for-byte.
#[derive(Debug, Clone)]
pub struct NegotiationBlob(Box<RawValue>);

impl NegotiationBlob {
    /// Wrap a JSON text. The text must itself be valid JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::MalformedMessage`] if `json` is not valid JSON.
    pub fn from_json(json: impl Into<String>) -> Result<Self> {
        RawValue::from_string(json.into())
            .map(Self)
            .map_err(|e| SignalError::MalformedMessage(e.to_string()))
    }

    /// The raw JSON text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.get()
    }

    /// Size of the raw JSON text in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.get().len()
    }

    /// Whether the raw JSON text is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.get().is_empty()
    }
}

impl PartialEq for NegotiationBlob {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

/// A negotiation message as relayed between the two peers.
#[derive(Debug, Clone, PartialEq)]
pub struct Negotiation {
    /// Session the message belongs to. The relay always stamps the sending
    /// peer's bound session on forwarded messages.
    pub session: Option<SessionToken>,
    /// Opaque payload
    pub blob: NegotiationBlob,
}

/// Signaling messages
#[derive(Debug, Clone, PartialEq)]
pub enum SignalMessage {
    /// Client asks to join (or, as a sender with no token, create) a session
    Join {
        /// Raw session token, if any
        session: Option<String>,
        /// Requested role
        role: Role,
    },

    /// Session description offer, forwarded verbatim
    Offer(Negotiation),

    /// Session description answer, forwarded verbatim
    Answer(Negotiation),

    /// ICE candidate, forwarded verbatim
    Ice(Negotiation),

    /// Server confirms a join
    Ready {
        /// Session the peer joined
        session: SessionToken,
        /// Identifier assigned to the peer
        peer_id: PeerId,
    },

    /// Server tells the sender that the receiver is present
    PeerJoined {
        /// Session that became fully paired
        session: SessionToken,
    },

    /// Server reports a failure to the offending peer
    Error {
        /// Stable error code
        code: String,
        /// Human-readable error message
        message: String,
    },

    /// Server evicted the session
    Expired,
}

/// JSON envelope shared by all message types.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    peer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<Box<RawValue>>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
    role: Role,
}

#[derive(Serialize, Deserialize)]
struct ErrorPayload {
    message: String,
    #[serde(default)]
    code: String,
}

impl SignalMessage {
    /// Build an `error` message from a signaling error.
    #[must_use]
    pub fn from_error(err: &SignalError) -> Self {
        SignalMessage::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }

    /// Wire name of the message type.
    pub fn message_type(&self) -> &'static str {
        match self {
            SignalMessage::Join { .. } => "join",
            SignalMessage::Offer(_) => "offer",
            SignalMessage::Answer(_) => "answer",
            SignalMessage::Ice(_) => "ice",
            SignalMessage::Ready { .. } => "ready",
            SignalMessage::PeerJoined { .. } => "peer-joined",
            SignalMessage::Error { .. } => "error",
            SignalMessage::Expired => "expired",
        }
    }

    /// Serialize message to its JSON text form.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::MalformedMessage`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        let mut envelope = Envelope {
            kind: self.message_type().to_string(),
            session_id: None,
            peer_id: None,
            payload: None,
        };

        match self {
            SignalMessage::Join { session, role } => {
                envelope.payload = Some(to_raw(&JoinPayload {
                    session_id: session.clone(),
                    role: *role,
                })?);
            }
            SignalMessage::Offer(n) | SignalMessage::Answer(n) | SignalMessage::Ice(n) => {
                envelope.session_id = n.session.map(|s| s.to_string());
                envelope.payload = Some(n.blob.0.clone());
            }
            SignalMessage::Ready { session, peer_id } => {
                envelope.session_id = Some(session.to_string());
                envelope.peer_id = Some(peer_id.to_string());
            }
            SignalMessage::PeerJoined { session } => {
                envelope.session_id = Some(session.to_string());
            }
            SignalMessage::Error { code, message } => {
                envelope.payload = Some(to_raw(&ErrorPayload {
                    message: message.clone(),
                    code: code.clone(),
                })?);
            }
            SignalMessage::Expired => {}
        }

        serde_json::to_string(&envelope).map_err(|e| SignalError::MalformedMessage(e.to_string()))
    }

    /// Deserialize message from its JSON text form.
    ///
    /// Negotiation payloads are kept raw and never interpreted. A missing
    /// negotiation payload is carried as JSON `null`.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::MalformedMessage`] if the envelope or a
    /// server-defined payload cannot be decoded, or the type is unknown.
    pub fn from_json(text: &str) -> Result<Self> {
        let envelope: Envelope =
            serde_json::from_str(text).map_err(|e| SignalError::MalformedMessage(e.to_string()))?;

        let msg = match envelope.kind.as_str() {
            "join" => {
                let raw = envelope
                    .payload
                    .ok_or_else(|| SignalError::MalformedMessage("join without payload".into()))?;
                let payload: JoinPayload = from_raw(&raw)?;
                SignalMessage::Join {
                    session: payload.session_id.filter(|s| !s.is_empty()),
                    role: payload.role,
                }
            }
            "offer" => SignalMessage::Offer(negotiation(envelope)?),
            "answer" => SignalMessage::Answer(negotiation(envelope)?),
            "ice" => SignalMessage::Ice(negotiation(envelope)?),
            "ready" => SignalMessage::Ready {
                session: required(envelope.session_id, "sessionId")?.parse()?,
                peer_id: required(envelope.peer_id, "peerId")?.parse()?,
            },
            "peer-joined" => SignalMessage::PeerJoined {
                session: required(envelope.session_id, "sessionId")?.parse()?,
            },
            "error" => {
                let raw = envelope
                    .payload
                    .ok_or_else(|| SignalError::MalformedMessage("error without payload".into()))?;
                let payload: ErrorPayload = from_raw(&raw)?;
                SignalMessage::Error {
                    code: payload.code,
                    message: payload.message,
                }
            }
            "expired" => SignalMessage::Expired,
            other => {
                return Err(SignalError::MalformedMessage(format!(
                    "unknown message type: {other}"
                )));
            }
        };

        Ok(msg)
    }
}

fn negotiation(envelope: Envelope) -> Result<Negotiation> {
    let blob = match envelope.payload {
        Some(raw) => NegotiationBlob(raw),
        None => NegotiationBlob::from_json("null")?,
    };
    Ok(Negotiation {
        session: envelope.session_id.and_then(|s| s.parse().ok()),
        blob,
    })
}

fn required(field: Option<String>, name: &str) -> Result<String> {
    field.ok_or_else(|| SignalError::MalformedMessage(format!("missing {name}")))
}

fn to_raw<T: Serialize>(value: &T) -> Result<Box<RawValue>> {
    serde_json::value::to_raw_value(value).map_err(|e| SignalError::MalformedMessage(e.to_string()))
}

fn from_raw<'a, T: Deserialize<'a>>(raw: &'a RawValue) -> Result<T> {
    serde_json::from_str(raw.get()).map_err(|e| SignalError::MalformedMessage(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(json: &str) -> NegotiationBlob {
        NegotiationBlob::from_json(json).unwrap()
    }

    #[test]
    fn test_session_token_hex() {
        let token = SessionToken::from_bytes([0xA1; 16]);
        assert_eq!(token.to_string(), "a1".repeat(16));
        assert_eq!("a1".repeat(16).parse::<SessionToken>().unwrap(), token);
        assert!("a1b2".parse::<SessionToken>().is_err());
    }

    #[test]
    fn test_peer_id_hex() {
        let id = PeerId::from_u64(0x0123_4567_89ab_cdef);
        assert_eq!(id.to_string(), "0123456789abcdef");
        assert_eq!("0123456789abcdef".parse::<PeerId>().unwrap(), id);
        assert!("123".parse::<PeerId>().is_err());
    }

    #[test]
    fn test_decode_join_with_token() {
        let msg = SignalMessage::from_json(
            r#"{"type":"join","payload":{"sessionId":"abcd","role":"receiver"}}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            SignalMessage::Join {
                session: Some("abcd".into()),
                role: Role::Receiver
            }
        );
    }

    #[test]
    fn test_decode_join_empty_token_is_none() {
        let msg =
            SignalMessage::from_json(r#"{"type":"join","payload":{"sessionId":"","role":"sender"}}"#)
                .unwrap();
        assert_eq!(
            msg,
            SignalMessage::Join {
                session: None,
                role: Role::Sender
            }
        );
    }

    #[test]
    fn test_decode_join_bad_role() {
        let err = SignalMessage::from_json(r#"{"type":"join","payload":{"role":"observer"}}"#)
            .unwrap_err();
        assert!(matches!(err, SignalError::MalformedMessage(_)));
    }

    #[test]
    fn test_offer_payload_kept_verbatim() {
        let text = r#"{"type":"offer","sessionId":"zz","payload":{"sdp":"v=0\r\n…","type":"offer"}}"#;
        let msg = SignalMessage::from_json(text).unwrap();
        let SignalMessage::Offer(n) = &msg else {
            panic!("expected offer, got {msg:?}");
        };
        assert_eq!(n.blob.as_str(), r#"{"sdp":"v=0\r\n…","type":"offer"}"#);
        assert!(n.session.is_none());

        let out = msg.to_json().unwrap();
        assert!(out.contains(r#""payload":{"sdp":"v=0\r\n…","type":"offer"}"#));
    }

    #[test]
    fn test_ice_without_payload_is_null() {
        let msg = SignalMessage::from_json(r#"{"type":"ice"}"#).unwrap();
        assert_eq!(
            msg,
            SignalMessage::Ice(Negotiation {
                session: None,
                blob: blob("null")
            })
        );
    }

    #[test]
    fn test_encode_ready() {
        let msg = SignalMessage::Ready {
            session: SessionToken::from_bytes([0; 16]),
            peer_id: PeerId::from_u64(1),
        };
        let json: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "ready");
        assert_eq!(json["sessionId"], "0".repeat(32));
        assert_eq!(json["peerId"], "0000000000000001");
        assert!(json.get("payload").is_none());
    }

    #[test]
    fn test_encode_error_and_expired() {
        let msg = SignalMessage::from_error(&SignalError::PeerNotFound);
        let json: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["payload"]["message"], "peer not found");
        assert_eq!(json["payload"]["code"], "peer-not-found");

        assert_eq!(SignalMessage::Expired.to_json().unwrap(), r#"{"type":"expired"}"#);
    }

    #[test]
    fn test_decode_rejects_unknown_type_and_garbage() {
        assert!(SignalMessage::from_json(r#"{"type":"teleport"}"#).is_err());
        assert!(SignalMessage::from_json("not json").is_err());
        assert!(SignalMessage::from_json(r#"{"sessionId":"x"}"#).is_err());
    }

    #[test]
    fn test_server_messages_decode() {
        let token = SessionToken::from_bytes([7; 16]);
        for msg in [
            SignalMessage::PeerJoined { session: token },
            SignalMessage::Ready {
                session: token,
                peer_id: PeerId::from_u64(42),
            },
            SignalMessage::Expired,
        ] {
            let decoded = SignalMessage::from_json(&msg.to_json().unwrap()).unwrap();
            assert_eq!(decoded, msg);
        }
    }

    #[test]
    fn test_role_other() {
        assert_eq!(Role::Sender.other(), Role::Receiver);
        assert_eq!(Role::Receiver.other(), Role::Sender);
        assert_eq!(Role::Receiver.to_string(), "receiver");
    }
}
