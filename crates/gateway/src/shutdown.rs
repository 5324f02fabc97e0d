//! Graceful-shutdown drain tracking.
//!
//! Every request holds a [`RequestGuard`] for its lifetime.  On SIGTERM
//! the server flips to draining (new requests get 503 + `Retry-After`),
//! then waits — event-driven, no polling — until the in-flight count hits
//! zero or the drain timeout expires.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

#[derive(Default)]
struct DrainInner {
    in_flight: AtomicUsize,
    draining: AtomicBool,
    idle: Notify,
}

#[derive(Clone, Default)]
pub struct DrainTracker {
    inner: Arc<DrainInner>,
}

/// Held for the duration of one request.
pub struct RequestGuard {
    inner: Arc<DrainInner>,
}

impl DrainTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new request.  `None` once draining has begun.
    pub fn try_acquire(&self) -> Option<RequestGuard> {
        if self.inner.draining.load(Ordering::Acquire) {
            return None;
        }
        self.inner.in_flight.fetch_add(1, Ordering::AcqRel);
        // Re-check: drain may have started between the check and the add.
        if self.inner.draining.load(Ordering::Acquire) {
            self.release();
            return None;
        }
        Some(RequestGuard {
            inner: self.inner.clone(),
        })
    }

    fn release(&self) {
        if self.inner.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.idle.notify_waiters();
        }
    }

    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Acquire)
    }

    /// Stop admitting requests and wait up to `timeout` for the in-flight
    /// count to reach zero.  Returns whether the drain completed cleanly.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.inner.draining.store(true, Ordering::Release);
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.inner.in_flight.load(Ordering::Acquire) == 0 {
                return true;
            }
            let notified = self.inner.idle.notified();
            tokio::select! {
                _ = notified => {}
                _ = tokio::time::sleep_until(deadline) => {
                    return self.inner.in_flight.load(Ordering::Acquire) == 0;
                }
            }
        }
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        if self.inner.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drain_rejects_new_requests() {
        let tracker = DrainTracker::new();
        assert!(tracker.try_acquire().is_some());
        assert!(tracker.drain(Duration::from_millis(50)).await);
        assert!(tracker.try_acquire().is_none());
    }

    #[tokio::test]
    async fn drain_waits_for_in_flight() {
        let tracker = DrainTracker::new();
        let guard = tracker.try_acquire().unwrap();

        let drainer = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.drain(Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!drainer.is_finished());

        drop(guard);
        assert!(drainer.await.unwrap());
        assert_eq!(tracker.in_flight(), 0);
    }

    #[tokio::test]
    async fn drain_times_out_with_stuck_requests() {
        let tracker = DrainTracker::new();
        let _guard = tracker.try_acquire().unwrap();
        assert!(!tracker.drain(Duration::from_millis(30)).await);
    }
}
