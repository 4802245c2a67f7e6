//! `PeerCall` Relay Server library.
//!
//! Exposes the relay server for use in tests and embedding.
//! The relay server accepts WebSocket connections, pairs exactly two of
//! them into a session, and forwards signaling messages between the pair.

pub mod config;
pub mod registry;
pub mod relay;
