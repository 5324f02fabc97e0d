//! Per-request cancellation tokens.
//!
//! Each `tools/call` registers a token under its JSON-RPC id.  A client
//! sends the `$/cancelRequest` notification to flip it; the handler stops
//! at its next suspension point.  In-flight backend writes are allowed to
//! finish so state stays consistent.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// A cancellation token checked by tool handlers between backend calls.
#[derive(Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Bail out with `cancelled` if the token has been flipped.
    pub fn bail_if_cancelled(&self) -> masc_domain::Result<()> {
        if self.is_cancelled() {
            Err(masc_domain::Error::Cancelled("request cancelled".into()))
        } else {
            Ok(())
        }
    }
}

/// Active tokens keyed by request id.
#[derive(Default)]
pub struct CancelMap {
    tokens: Mutex<HashMap<String, CancelToken>>,
}

impl CancelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a token for a request.
    pub fn register(&self, request_id: &str) -> CancelToken {
        let token = CancelToken::new();
        self.tokens
            .lock()
            .insert(request_id.to_owned(), token.clone());
        token
    }

    /// Cancel a running request.  Returns whether a token was found.
    pub fn cancel(&self, request_id: &str) -> bool {
        match self.tokens.lock().get(request_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Remove the token once the request completes.
    pub fn remove(&self, request_id: &str) {
        self.tokens.lock().remove(request_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_lifecycle() {
        let map = CancelMap::new();
        let token = map.register("1");
        assert!(!token.is_cancelled());
        assert!(token.bail_if_cancelled().is_ok());

        assert!(map.cancel("1"));
        assert!(token.is_cancelled());
        assert!(token.bail_if_cancelled().is_err());

        map.remove("1");
        assert!(!map.cancel("1"));
    }

    #[test]
    fn cancel_unknown_request_is_false() {
        let map = CancelMap::new();
        assert!(!map.cancel("ghost"));
    }

    #[test]
    fn clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
