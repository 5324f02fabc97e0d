//! In-process notification bus with per-subscriber ring buffers and
//! replay-from-id for resumable SSE.
//!
//! Events are tagged with a monotone `seq` assigned at commit time by the
//! Room Store.  The bus keeps a bounded shared history for replay on
//! reconnect; each subscriber additionally owns a bounded delivery ring.
//! When a slow subscriber's ring overflows, the oldest event is dropped
//! and a synthetic `lag` event tells the client to re-sync.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use masc_domain::trace::TraceEvent;

/// Default per-subscriber ring capacity.
pub const DEFAULT_RING_CAPACITY: usize = 1024;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Notification
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, serde::Serialize)]
pub struct Notification {
    pub seq: u64,
    pub kind: String,
    pub room: String,
    pub timestamp: f64,
    pub data: serde_json::Value,
}

/// Result of a replay request on reconnect.
#[derive(Debug)]
pub enum ReplayOutcome {
    /// Every event after the requested seq was still buffered.
    Replayed(Vec<Notification>),
    /// The requested seq fell below the buffer floor; the client must do
    /// a full refetch and stream from the current tail.
    Gap,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Subscriber state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct SubscriberState {
    ring: VecDeque<Notification>,
    /// Events dropped since the last successful recv.
    dropped: u64,
    /// Kinds this subscriber wants; `None` = everything.
    kinds: Option<Vec<String>>,
    closed: bool,
}

struct SubscriberEntry {
    state: Arc<Mutex<SubscriberState>>,
    notify: Arc<Notify>,
}

/// Handle held by one SSE connection.
pub struct Subscription {
    id: String,
    state: Arc<Mutex<SubscriberState>>,
    notify: Arc<Notify>,
    bus: Arc<BusInner>,
}

impl Subscription {
    /// Wait for the next notification.  Returns `None` once the bus shuts
    /// down.  A period of overload is reported as a synthetic `lag` event
    /// carrying the drop count.
    pub async fn recv(&self) -> Option<Notification> {
        loop {
            {
                let mut state = self.state.lock();
                if state.dropped > 0 {
                    let dropped = std::mem::take(&mut state.dropped);
                    TraceEvent::NotificationLag {
                        subscriber: self.id.clone(),
                        dropped,
                    }
                    .emit();
                    return Some(Notification {
                        seq: 0,
                        kind: "lag".into(),
                        room: String::new(),
                        timestamp: 0.0,
                        data: serde_json::json!({ "dropped": dropped }),
                    });
                }
                if let Some(event) = state.ring.pop_front() {
                    return Some(event);
                }
                if state.closed {
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.subscribers.lock().remove(&self.id);
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Bus
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct BusInner {
    next_seq: AtomicU64,
    history: Mutex<VecDeque<Notification>>,
    subscribers: Mutex<HashMap<String, SubscriberEntry>>,
    ring_capacity: usize,
}

#[derive(Clone)]
pub struct NotificationBus {
    inner: Arc<BusInner>,
}

impl NotificationBus {
    /// `start_seq` seeds the counter — the Room Store passes the persisted
    /// message seq so event ids stay monotone across restarts.
    pub fn new(start_seq: u64, ring_capacity: usize) -> Self {
        Self {
            inner: Arc::new(BusInner {
                next_seq: AtomicU64::new(start_seq.max(1)),
                history: Mutex::new(VecDeque::with_capacity(ring_capacity)),
                subscribers: Mutex::new(HashMap::new()),
                ring_capacity,
            }),
        }
    }

    /// Reserve the next sequence number.  Called by the Room Store at
    /// commit time; events built before a failed commit are simply never
    /// published, leaving a benign gap in the event id space.
    pub fn assign_seq(&self) -> u64 {
        self.inner.next_seq.fetch_add(1, Ordering::SeqCst)
    }

    /// Highest seq assigned so far.
    pub fn current_seq(&self) -> u64 {
        self.inner.next_seq.load(Ordering::SeqCst).saturating_sub(1)
    }

    /// Publish a committed event to history and every matching subscriber.
    pub fn publish(&self, event: Notification) {
        {
            let mut history = self.inner.history.lock();
            if history.len() >= self.inner.ring_capacity {
                history.pop_front();
            }
            history.push_back(event.clone());
        }

        let subscribers = self.inner.subscribers.lock();
        for entry in subscribers.values() {
            let mut state = entry.state.lock();
            if let Some(kinds) = &state.kinds {
                if !kinds.iter().any(|k| k == &event.kind) {
                    continue;
                }
            }
            if state.ring.len() >= self.inner.ring_capacity {
                state.ring.pop_front();
                state.dropped += 1;
            }
            state.ring.push_back(event.clone());
            drop(state);
            entry.notify.notify_one();
        }
    }

    /// Attach a new subscriber.  `kinds = None` receives everything.
    pub fn subscribe(&self, id: impl Into<String>, kinds: Option<Vec<String>>) -> Subscription {
        let id = id.into();
        let state = Arc::new(Mutex::new(SubscriberState {
            ring: VecDeque::new(),
            dropped: 0,
            kinds,
            closed: false,
        }));
        let notify = Arc::new(Notify::new());
        self.inner.subscribers.lock().insert(
            id.clone(),
            SubscriberEntry {
                state: state.clone(),
                notify: notify.clone(),
            },
        );
        Subscription {
            id,
            state,
            notify,
            bus: self.inner.clone(),
        }
    }

    /// Replay buffered events with `seq > last_seen`.
    pub fn replay_from(&self, last_seen: u64) -> ReplayOutcome {
        let history = self.inner.history.lock();
        let floor = history.front().map(|e| e.seq).unwrap_or_else(|| {
            // Empty history: nothing was ever published (or everything
            // was already evicted).  Resumable only from the live tail.
            self.inner.next_seq.load(Ordering::SeqCst)
        });
        if last_seen + 1 < floor {
            return ReplayOutcome::Gap;
        }
        ReplayOutcome::Replayed(
            history
                .iter()
                .filter(|e| e.seq > last_seen)
                .cloned()
                .collect(),
        )
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    /// Wake every subscriber with a closed marker (graceful shutdown).
    pub fn close_all(&self) {
        let subscribers = self.inner.subscribers.lock();
        for entry in subscribers.values() {
            entry.state.lock().closed = true;
            entry.notify.notify_one();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(bus: &NotificationBus, kind: &str) -> Notification {
        Notification {
            seq: bus.assign_seq(),
            kind: kind.into(),
            room: "main".into(),
            timestamp: 0.0,
            data: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn delivers_in_order() {
        let bus = NotificationBus::new(1, 16);
        let sub = bus.subscribe("s1", None);
        for kind in ["a", "b", "c"] {
            bus.publish(event(&bus, kind));
        }
        assert_eq!(sub.recv().await.unwrap().kind, "a");
        assert_eq!(sub.recv().await.unwrap().kind, "b");
        assert_eq!(sub.recv().await.unwrap().kind, "c");
    }

    #[tokio::test]
    async fn kind_filter() {
        let bus = NotificationBus::new(1, 16);
        let sub = bus.subscribe("s1", Some(vec!["message".into()]));
        bus.publish(event(&bus, "agent_joined"));
        bus.publish(event(&bus, "message"));
        assert_eq!(sub.recv().await.unwrap().kind, "message");
    }

    #[tokio::test]
    async fn overflow_emits_lag() {
        let bus = NotificationBus::new(1, 2);
        let sub = bus.subscribe("s1", None);
        for _ in 0..5 {
            bus.publish(event(&bus, "m"));
        }
        let first = sub.recv().await.unwrap();
        assert_eq!(first.kind, "lag");
        assert_eq!(first.data["dropped"], 3);
        // The surviving tail is still delivered.
        assert_eq!(sub.recv().await.unwrap().kind, "m");
    }

    #[tokio::test]
    async fn replay_within_buffer() {
        let bus = NotificationBus::new(1, 16);
        for _ in 0..5 {
            bus.publish(event(&bus, "m"));
        }
        match bus.replay_from(3) {
            ReplayOutcome::Replayed(events) => {
                let seqs: Vec<u64> = events.iter().map(|e| e.seq).collect();
                assert_eq!(seqs, vec![4, 5]);
            }
            ReplayOutcome::Gap => panic!("expected replay"),
        }
    }

    #[tokio::test]
    async fn replay_below_floor_is_gap() {
        let bus = NotificationBus::new(1, 2);
        for _ in 0..6 {
            bus.publish(event(&bus, "m"));
        }
        assert!(matches!(bus.replay_from(1), ReplayOutcome::Gap));
    }

    #[tokio::test]
    async fn unsubscribe_on_drop() {
        let bus = NotificationBus::new(1, 16);
        let sub = bus.subscribe("s1", None);
        assert_eq!(bus.subscriber_count(), 1);
        drop(sub);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn close_unblocks_receivers() {
        let bus = NotificationBus::new(1, 16);
        let sub = bus.subscribe("s1", None);
        let handle = tokio::spawn(async move { sub.recv().await });
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        bus.close_all();
        assert!(handle.await.unwrap().is_none());
    }
}
