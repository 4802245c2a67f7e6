//! `PeerCall` client library.
//!
//! Provides the peer-side half of the signaling protocol: the negotiation
//! state machine ([`negotiation::Negotiation`]), the seam toward the
//! real-time media collaborator ([`media::MediaSession`]), and the
//! WebSocket channel to the relay server ([`channel::SignalChannel`]).
//!
//! Media capture, the peer-to-peer transport itself, and any UI are out of
//! scope; this crate only decides what to do with each signaling message
//! and drives the media session accordingly.

pub mod channel;
pub mod config;
pub mod media;
pub mod negotiation;
