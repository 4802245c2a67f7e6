//! Shared protocol definitions for the `PeerCall` signaling wire format.

pub mod signal;
