//! Session registry for the relay server: admission control and pairing.
//!
//! Tracks the set of currently connected endpoints and assigns them to a
//! session of exactly two. The two-party cap is structural — [`PairSlots`]
//! has exactly two slots, so a third member is unrepresentable rather than
//! checked ad hoc at each call site.
//!
//! The registry does no network I/O and no concurrency control beyond its
//! own mutex: callers go through [`SessionRegistry`], which serializes every
//! mutation so that two near-simultaneous connects can never both claim the
//! last free slot.

use axum::extract::ws::Message;
use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

/// Unique identifier for one live relay connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EndpointId(Uuid);

impl EndpointId {
    /// Creates a new time-ordered endpoint identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for EndpointId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EndpointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One participant's live connection: its identity and the sender half of
/// the channel feeding its WebSocket writer task.
#[derive(Debug, Clone)]
struct Endpoint {
    id: EndpointId,
    sender: mpsc::UnboundedSender<Message>,
}

/// Errors that can occur during registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Both session slots are occupied; the connection must be refused.
    #[error("session is full (two endpoints already connected)")]
    SessionFull,
}

/// A session of at most two endpoints, held as two explicit slots.
#[derive(Debug, Default)]
struct PairSlots {
    slots: [Option<Endpoint>; 2],
}

impl PairSlots {
    /// Places an endpoint into the first free slot.
    fn insert(&mut self, endpoint: Endpoint) -> Result<(), RegistryError> {
        match self.slots.iter_mut().find(|s| s.is_none()) {
            Some(free) => {
                *free = Some(endpoint);
                Ok(())
            }
            None => Err(RegistryError::SessionFull),
        }
    }

    /// Clears the slot holding `id`, if any. Absent ids are a no-op.
    fn remove(&mut self, id: EndpointId) -> bool {
        for slot in &mut self.slots {
            if slot.as_ref().is_some_and(|e| e.id == id) {
                *slot = None;
                return true;
            }
        }
        false
    }

    /// Returns the occupied slot that is not `id`.
    fn peer_of(&self, id: EndpointId) -> Option<&Endpoint> {
        self.slots
            .iter()
            .flatten()
            .find(|e| e.id != id)
    }

    fn occupancy(&self) -> usize {
        self.slots.iter().flatten().count()
    }
}

/// Admission control and pairing for the relay server.
///
/// Created once at server startup and shared (via the relay state) across
/// all connection handlers. Entirely in-memory and process-lifetime-scoped;
/// a restart discards all sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    pair: Mutex<PairSlots>,
}

impl SessionRegistry {
    /// Creates a new, empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits an endpoint if fewer than two are currently tracked.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::SessionFull`] when both slots are occupied;
    /// the caller must close the connection without any message exchange.
    pub async fn register(
        &self,
        id: EndpointId,
        sender: mpsc::UnboundedSender<Message>,
    ) -> Result<(), RegistryError> {
        let mut pair = self.pair.lock().await;
        pair.insert(Endpoint { id, sender })
    }

    /// Removes an endpoint from tracking.
    ///
    /// Idempotent: removing an already-absent endpoint returns `false`
    /// rather than erroring.
    pub async fn unregister(&self, id: EndpointId) -> bool {
        let mut pair = self.pair.lock().await;
        pair.remove(id)
    }

    /// Returns a clone of the paired endpoint's sender, if one is present.
    ///
    /// The sender is cloned out so the registry lock is never held across
    /// the actual send — a slow peer write must not block the registry.
    pub async fn peer_of(&self, id: EndpointId) -> Option<mpsc::UnboundedSender<Message>> {
        let pair = self.pair.lock().await;
        pair.peer_of(id).map(|e| e.sender.clone())
    }

    /// Number of currently tracked endpoints (0, 1, or 2).
    pub async fn occupancy(&self) -> usize {
        let pair = self.pair.lock().await;
        pair.occupancy()
    }
}
