//! Fans out encoded snapshot messages to a dynamic set of subscribers.
//!
//! Each subscriber is a bounded `tokio::sync::mpsc` sender; a slow consumer
//! that fills its queue is dropped rather than allowed to stall the
//! matcher (`backpressure` in the design notes). A closed receiver is
//! likewise removed on the next broadcast that targets it.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

/// Bound on each subscriber's outgoing queue. Chosen generously enough
/// that a momentarily slow client does not get disconnected by a single
/// burst, while still bounding memory for a genuinely stalled one.
const SUBSCRIBER_QUEUE_CAPACITY: usize = 256;

/// Per-product fan-out of encoded snapshot bytes to subscribed connections.
#[derive(Default)]
pub struct SnapshotBroadcaster {
    subscribers: DashMap<u64, mpsc::Sender<Vec<u8>>>,
    next_id: AtomicU64,
}

/// A single subscription handle. Dropping it, or letting the receiving
/// task exit, removes the subscriber on the next broadcast.
pub struct Subscription {
    pub id: u64,
    pub receiver: mpsc::Receiver<Vec<u8>>,
}

impl SnapshotBroadcaster {
    pub fn new() -> Self {
        SnapshotBroadcaster {
            subscribers: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new subscriber and return its receiving end.
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_CAPACITY);
        self.subscribers.insert(id, tx);
        Subscription { id, receiver: rx }
    }

    /// Explicitly remove a subscriber, e.g. on connection close.
    pub fn unsubscribe(&self, id: u64) {
        self.subscribers.remove(&id);
    }

    /// Dispatch `payload` to every current subscriber. A subscriber whose
    /// queue is full or whose receiver has been dropped is removed; this
    /// never blocks on a slow consumer.
    pub fn broadcast(&self, payload: Vec<u8>) {
        let mut dead = Vec::new();
        for entry in self.subscribers.iter() {
            match entry.value().try_send(payload.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) | Err(mpsc::error::TrySendError::Closed(_)) => {
                    dead.push(*entry.key());
                }
            }
        }
        for id in dead {
            self.subscribers.remove(&id);
        }
    }

    /// Current number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
