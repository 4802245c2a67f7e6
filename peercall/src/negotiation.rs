//! Negotiation state machine for the offer/answer exchange.
//!
//! An explicit finite-state-machine value with typed transition functions
//! per message type, replacing the callback-per-message-type style: illegal
//! transitions (an answer before any offer was sent) are validation-time
//! errors instead of silent misbehavior.
//!
//! The machine owns the local [`MediaSession`] and drives it; it never
//! interprets the opaque descriptions or candidates it passes along.

use std::fmt;

use peercall_proto::signal::SignalMessage;

use crate::media::{MediaError, MediaSession};

/// Progress of the offer/answer exchange on this side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationPhase {
    /// No negotiation in progress.
    Idle,
    /// We originated an offer and are waiting for the answer.
    OfferSent,
    /// A remote offer arrived and our answer is being constructed.
    ///
    /// Normally transient within one `handle` call; observable only when
    /// answer construction fails partway.
    OfferReceived,
    /// Offer and answer have both been applied; candidates may keep
    /// trickling in.
    Connected,
    /// The local media resources have been released. Terminal — a fresh
    /// machine is required to negotiate again.
    Closed,
}

impl fmt::Display for NegotiationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::OfferSent => write!(f, "offer-sent"),
            Self::OfferReceived => write!(f, "offer-received-awaiting-answer"),
            Self::Connected => write!(f, "connected"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Errors from negotiation transitions.
#[derive(Debug, thiserror::Error)]
pub enum NegotiationError {
    /// `start` was called outside the `idle` phase.
    #[error("negotiation already started (phase {phase})")]
    AlreadyStarted {
        /// The phase the machine was in.
        phase: NegotiationPhase,
    },

    /// An answer arrived with no outstanding offer.
    #[error("received an answer in phase {phase} with no outstanding offer")]
    UnexpectedAnswer {
        /// The phase the machine was in.
        phase: NegotiationPhase,
    },

    /// The media session failed to produce or apply a description.
    #[error("media session error: {0}")]
    Media(#[from] MediaError),
}

/// The client-side signaling state machine.
///
/// Feed every inbound [`SignalMessage`] to [`Negotiation::handle`]; any
/// message it returns must be transmitted to the peer. Local user actions
/// map to [`Negotiation::start`] (place the call) and [`Negotiation::end`]
/// (hang up).
pub struct Negotiation<M: MediaSession> {
    phase: NegotiationPhase,
    media: M,
}

impl<M: MediaSession> Negotiation<M> {
    /// Creates an idle negotiation around a fresh media session.
    pub const fn new(media: M) -> Self {
        Self {
            phase: NegotiationPhase::Idle,
            media,
        }
    }

    /// Current negotiation phase.
    pub const fn phase(&self) -> NegotiationPhase {
        self.phase
    }

    /// Access to the underlying media session.
    pub const fn media(&self) -> &M {
        &self.media
    }

    /// Local "start" action: construct an offer and advance to `offer-sent`.
    ///
    /// The returned message must be transmitted to the peer.
    ///
    /// # Errors
    ///
    /// [`NegotiationError::AlreadyStarted`] outside `idle`;
    /// [`NegotiationError::Media`] if the offer cannot be constructed (the
    /// phase stays `idle`).
    pub async fn start(&mut self) -> Result<SignalMessage, NegotiationError> {
        if self.phase != NegotiationPhase::Idle {
            return Err(NegotiationError::AlreadyStarted { phase: self.phase });
        }
        let offer = self.media.create_offer().await?;
        self.phase = NegotiationPhase::OfferSent;
        tracing::debug!(phase = %self.phase, "offer constructed");
        Ok(SignalMessage::Offer { offer })
    }

    /// Consumes one inbound signaling message, driving the media session.
    ///
    /// Returns a message to transmit back to the peer, when the transition
    /// produces one (answering an offer).
    ///
    /// # Errors
    ///
    /// [`NegotiationError::UnexpectedAnswer`] for an answer with no
    /// outstanding offer; [`NegotiationError::Media`] when a description
    /// cannot be applied. Candidate application failures are logged and
    /// swallowed — they never fail the negotiation.
    pub async fn handle(
        &mut self,
        msg: SignalMessage,
    ) -> Result<Option<SignalMessage>, NegotiationError> {
        match msg {
            SignalMessage::Offer { offer } => self.handle_offer(offer).await,
            SignalMessage::Answer { answer } => self.handle_answer(answer).await,
            SignalMessage::Candidate { candidate } => {
                self.handle_candidate(candidate).await;
                Ok(None)
            }
        }
    }

    /// Local "end" action: release the media resources. Idempotent.
    ///
    /// The phase becomes `closed` even when releasing the media session
    /// fails; there is no transition out of `closed`.
    ///
    /// # Errors
    ///
    /// Propagates the media session's close failure.
    pub async fn end(&mut self) -> Result<(), NegotiationError> {
        if self.phase == NegotiationPhase::Closed {
            return Ok(());
        }
        self.phase = NegotiationPhase::Closed;
        tracing::debug!("negotiation closed");
        self.media.close().await?;
        Ok(())
    }

    async fn handle_offer(
        &mut self,
        offer: serde_json::Value,
    ) -> Result<Option<SignalMessage>, NegotiationError> {
        if self.phase != NegotiationPhase::Idle {
            // Renegotiation is unsupported; log and ignore, never crash.
            tracing::warn!(phase = %self.phase, "offer received outside idle, ignoring");
            return Ok(None);
        }

        self.phase = NegotiationPhase::OfferReceived;
        self.media.set_remote_description(offer).await?;
        let answer = self.media.create_answer().await?;
        self.phase = NegotiationPhase::Connected;
        tracing::debug!(phase = %self.phase, "offer answered");
        Ok(Some(SignalMessage::Answer { answer }))
    }

    async fn handle_answer(
        &mut self,
        answer: serde_json::Value,
    ) -> Result<Option<SignalMessage>, NegotiationError> {
        if self.phase != NegotiationPhase::OfferSent {
            return Err(NegotiationError::UnexpectedAnswer { phase: self.phase });
        }
        self.media.set_remote_description(answer).await?;
        self.phase = NegotiationPhase::Connected;
        tracing::debug!(phase = %self.phase, "answer applied");
        Ok(None)
    }

    /// Candidates are valid in every phase, including `connected` — trickled
    /// candidates may keep arriving after negotiation completes. Application
    /// failure is expected under best-effort delivery and never transitions
    /// state.
    async fn handle_candidate(&mut self, candidate: serde_json::Value) {
        if self.phase == NegotiationPhase::Closed {
            tracing::debug!("candidate after close, ignoring");
            return;
        }
        if let Err(e) = self.media.add_candidate(candidate).await {
            tracing::warn!(phase = %self.phase, error = %e, "failed to apply candidate");
        }
    }
}
