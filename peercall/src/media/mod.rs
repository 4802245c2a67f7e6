//! Media session abstraction for `PeerCall`.
//!
//! Defines the [`MediaSession`] trait — the seam between the negotiation
//! state machine and the real-time media collaborator that actually builds
//! the peer-to-peer connection. Concrete implementations:
//! - [`loopback::LoopbackMedia`] — in-process fake for testing

pub mod loopback;

/// Errors that can occur while driving a media session.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// The media session has been closed and its resources released.
    #[error("media session is closed")]
    Closed,

    /// A session description could not be produced or applied.
    #[error("session description error: {0}")]
    Description(String),

    /// A connectivity candidate could not be applied (malformed or stale).
    ///
    /// Callers treat this as non-fatal: out-of-order or duplicate candidates
    /// are an expected occurrence under best-effort delivery.
    #[error("candidate rejected: {0}")]
    Candidate(String),
}

/// Async interface to the local media-transport object.
///
/// The negotiation state machine drives an implementation of this trait; it
/// never looks inside the descriptions or candidates it shuttles around.
/// Payloads are [`serde_json::Value`] because their structure is defined
/// entirely by the media collaborator's wire format.
pub trait MediaSession: Send + Sync {
    /// Construct a local session description proposing a media configuration.
    fn create_offer(
        &self,
    ) -> impl std::future::Future<Output = Result<serde_json::Value, MediaError>> + Send;

    /// Construct a local session description answering the remote offer.
    ///
    /// Only meaningful after [`MediaSession::set_remote_description`] has
    /// applied the incoming offer.
    fn create_answer(
        &self,
    ) -> impl std::future::Future<Output = Result<serde_json::Value, MediaError>> + Send;

    /// Apply an incoming session description as the remote description.
    fn set_remote_description(
        &self,
        description: serde_json::Value,
    ) -> impl std::future::Future<Output = Result<(), MediaError>> + Send;

    /// Apply an incoming connectivity candidate.
    fn add_candidate(
        &self,
        candidate: serde_json::Value,
    ) -> impl std::future::Future<Output = Result<(), MediaError>> + Send;

    /// Release the local media resources. Terminal; further calls fail
    /// with [`MediaError::Closed`].
    fn close(&self) -> impl std::future::Future<Output = Result<(), MediaError>> + Send;
}
