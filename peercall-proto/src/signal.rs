//! Signaling message envelope for the `PeerCall` wire protocol.
//!
//! Defines the [`SignalMessage`] enum that is JSON-encoded and sent over
//! WebSocket text frames between clients and the relay server. The envelope
//! carries a `type` tag and exactly one type-specific payload field; the
//! payload itself is an opaque [`serde_json::Value`] owned by the media
//! transport layer — neither the relay nor this crate interprets it.

use serde::{Deserialize, Serialize};

/// A signaling message exchanged between two negotiating peers.
///
/// The relay server validates the envelope shape with [`decode`] but always
/// forwards the original text verbatim, so payload contents (and any extra
/// top-level fields a client attaches) reach the peer byte-for-byte.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SignalMessage {
    /// A session description proposing a media configuration.
    Offer {
        /// Opaque session-description payload.
        offer: serde_json::Value,
    },

    /// A session description accepting a previously received offer.
    Answer {
        /// Opaque session-description payload.
        answer: serde_json::Value,
    },

    /// One possible network path for the direct peer-to-peer connection.
    ///
    /// Candidates trickle in asynchronously, in either direction, zero or
    /// more times, in any negotiation phase.
    Candidate {
        /// Opaque connectivity-candidate payload.
        candidate: serde_json::Value,
    },
}

/// Error type for signal encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// The text does not parse as a well-formed signaling envelope.
    #[error("malformed signaling message: {0}")]
    Malformed(String),
    /// The message could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Encodes a [`SignalMessage`] into its JSON text representation.
///
/// # Errors
///
/// Returns [`SignalError::Serialization`] if the payload cannot be
/// serialized (e.g. a non-string map key smuggled into the `Value`).
pub fn encode(msg: &SignalMessage) -> Result<String, SignalError> {
    serde_json::to_string(msg).map_err(|e| SignalError::Serialization(e.to_string()))
}

/// Decodes a [`SignalMessage`] from JSON text, validating the envelope shape.
///
/// Extra top-level fields are tolerated (they travel with the verbatim text,
/// not with this decoded value). An unknown `type` tag or a missing required
/// payload field is a malformed message.
///
/// # Errors
///
/// Returns [`SignalError::Malformed`] if the text is not a valid envelope.
pub fn decode(text: &str) -> Result<SignalMessage, SignalError> {
    serde_json::from_str(text).map_err(|e| SignalError::Malformed(e.to_string()))
}
