//! Loopback media session for testing.
//!
//! Fabricates session descriptions locally and records everything applied
//! to it, so tests can assert what the negotiation state machine did without
//! a real media stack. Can be configured to reject candidates to exercise
//! the non-fatal candidate-failure path.

use parking_lot::Mutex;
use serde_json::{Value, json};

use super::{MediaError, MediaSession};

#[derive(Debug, Default)]
struct Inner {
    remote_description: Option<Value>,
    applied_candidates: Vec<Value>,
    reject_candidates: bool,
    closed: bool,
}

/// In-process [`MediaSession`] implementation backed by recorded state.
#[derive(Debug)]
pub struct LoopbackMedia {
    label: String,
    inner: Mutex<Inner>,
}

impl LoopbackMedia {
    /// Creates a loopback media session. The `label` is embedded in the
    /// fabricated descriptions so tests can tell the two ends apart.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Makes every subsequent `add_candidate` call fail.
    pub fn reject_candidates(&self, reject: bool) {
        self.inner.lock().reject_candidates = reject;
    }

    /// The remote description applied so far, if any.
    #[must_use]
    pub fn remote_description(&self) -> Option<Value> {
        self.inner.lock().remote_description.clone()
    }

    /// Every candidate successfully applied, in arrival order.
    #[must_use]
    pub fn applied_candidates(&self) -> Vec<Value> {
        self.inner.lock().applied_candidates.clone()
    }

    /// Whether the session has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

impl MediaSession for LoopbackMedia {
    async fn create_offer(&self) -> Result<Value, MediaError> {
        if self.inner.lock().closed {
            return Err(MediaError::Closed);
        }
        Ok(json!({ "kind": "offer", "sdp": format!("v=0 o={}", self.label) }))
    }

    async fn create_answer(&self) -> Result<Value, MediaError> {
        let inner = self.inner.lock();
        if inner.closed {
            return Err(MediaError::Closed);
        }
        if inner.remote_description.is_none() {
            return Err(MediaError::Description(
                "no remote description applied".to_string(),
            ));
        }
        Ok(json!({ "kind": "answer", "sdp": format!("v=0 o={}", self.label) }))
    }

    async fn set_remote_description(&self, description: Value) -> Result<(), MediaError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(MediaError::Closed);
        }
        inner.remote_description = Some(description);
        Ok(())
    }

    async fn add_candidate(&self, candidate: Value) -> Result<(), MediaError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(MediaError::Closed);
        }
        if inner.reject_candidates {
            return Err(MediaError::Candidate("rejected by test policy".to_string()));
        }
        inner.applied_candidates.push(candidate);
        Ok(())
    }

    async fn close(&self) -> Result<(), MediaError> {
        self.inner.lock().closed = true;
        Ok(())
    }
}
