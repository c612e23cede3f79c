//! Single-slot tracking of the in-flight generation request.
//!
//! Only one request may be in flight per client. Starting a new one cancels
//! whatever is registered (last request wins). The slot is cheap to clone so
//! a signal handler or UI task can cancel while the controller is busy.

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Default)]
struct SlotInner {
    generation: u64,
    token: Option<CancellationToken>,
}

#[derive(Clone, Default)]
pub struct RequestSlot {
    inner: Arc<Mutex<SlotInner>>,
}

impl std::fmt::Debug for RequestSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RequestSlot(active: {})", self.is_active())
    }
}

/// Handle for one registered request.
#[derive(Debug)]
pub struct InFlight {
    pub token: CancellationToken,
    generation: u64,
}

impl RequestSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new request, cancelling the previous one if it is still
    /// registered.
    pub fn begin(&self) -> InFlight {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = inner.token.take() {
            debug!(generation = inner.generation, "superseding in-flight request");
            previous.cancel();
        }
        inner.generation += 1;
        let token = CancellationToken::new();
        inner.token = Some(token.clone());
        InFlight {
            token,
            generation: inner.generation,
        }
    }

    /// Cancel and remove the registered request. Returns `true` if there was one.
    pub fn cancel(&self) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        match inner.token.take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Unregister `flight` unless a newer request already replaced it.
    pub fn finish(&self, flight: &InFlight) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.generation == flight.generation {
            inner.token = None;
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner
            .lock()
            .map(|inner| inner.token.is_some())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn new_request_cancels_previous() {
        let slot = RequestSlot::new();
        let first = slot.begin();
        let second = slot.begin();
        assert!(first.token.is_cancelled());
        assert!(!second.token.is_cancelled());
    }

    #[test]
    fn cancel_fires_token_and_clears_slot() {
        let slot = RequestSlot::new();
        let flight = slot.begin();
        assert!(slot.cancel());
        assert!(flight.token.is_cancelled());
        assert!(!slot.is_active());
        assert!(!slot.cancel());
    }

    #[test]
    fn finishing_a_superseded_request_keeps_the_newer_one() {
        let slot = RequestSlot::new();
        let first = slot.begin();
        let second = slot.begin();
        slot.finish(&first);
        assert!(slot.is_active());
        slot.finish(&second);
        assert!(!slot.is_active());
    }

    #[test]
    fn cancel_is_visible_through_clones() {
        let slot = RequestSlot::new();
        let flight = slot.begin();
        let handle = slot.clone();
        assert!(handle.cancel());
        assert!(flight.token.is_cancelled());
    }
}
