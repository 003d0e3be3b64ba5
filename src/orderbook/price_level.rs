//! A single price level: a FIFO queue of orders sharing one `(side, price)`.
//!
//! Internally this follows the hybrid layout used by the rest of the book:
//! a [`DashMap`] keyed by order id for O(1) lookup/removal, plus a
//! [`SegQueue`] of ids that carries the FIFO insertion order for matching.
//! Cancelling an order out of the middle of the queue leaves a "tombstone" id
//! in the `SegQueue`; the matcher and the FIFO iterator both skip ids that
//! are no longer present in the map rather than paying for a linear removal.

use super::order::Order;
use crossbeam::queue::SegQueue;
use dashmap::DashMap;
use std::sync::Mutex;

/// FIFO queue of orders resting at a single price on a single side.
pub struct PriceLevel {
    /// Fast lookup/removal by order id.
    orders: DashMap<String, Order>,
    /// Insertion order. May contain ids already removed from `orders`;
    /// these are skipped lazily by `head`/`pop_head`.
    queue: SegQueue<String>,
    /// The id at the front of the FIFO, held here once `head` has looked it
    /// up so repeated peeks are non-mutating -- `SegQueue` has no native
    /// peek, so the alternative of pop-then-push-to-tail would silently
    /// rotate the queue on every call.
    peeked: Mutex<Option<String>>,
}

impl PriceLevel {
    /// Create an empty level.
    pub fn new() -> Self {
        PriceLevel {
            orders: DashMap::new(),
            queue: SegQueue::new(),
            peeked: Mutex::new(None),
        }
    }

    /// Append an order to the tail of the FIFO.
    pub fn push(&self, order: Order) {
        let id = order.id.clone();
        self.orders.insert(id.clone(), order);
        self.queue.push(id);
    }

    /// Number of live orders at this level.
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Whether this level currently has no live orders.
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Look up an order by id without affecting its priority.
    pub fn get(&self, order_id: &str) -> Option<Order> {
        self.orders.get(order_id).map(|r| r.value().clone())
    }

    /// Remove an order by id from anywhere in the level. Returns the removed
    /// order, if it was present. The corresponding id is left in the
    /// `SegQueue` as a tombstone and skipped lazily.
    pub fn remove(&self, order_id: &str) -> Option<Order> {
        self.orders.remove(order_id).map(|(_, order)| order)
    }

    /// Decrease the quantity of a resting order in place, preserving its
    /// FIFO position. Returns `false` if the order is missing.
    pub fn set_quantity(&self, order_id: &str, new_quantity: u64) -> bool {
        match self.orders.get_mut(order_id) {
            Some(mut order) => {
                order.quantity = new_quantity;
                true
            }
            None => false,
        }
    }

    /// Peek the order at the head of the FIFO without removing it,
    /// discarding any tombstones found along the way. Calling this
    /// repeatedly returns the same order until `pop_head` consumes it.
    pub fn head(&self) -> Option<Order> {
        let mut peeked = self.peeked.lock().unwrap();
        loop {
            let id = match peeked.clone() {
                Some(id) => id,
                None => {
                    let id = self.queue.pop()?;
                    *peeked = Some(id.clone());
                    id
                }
            };
            if let Some(order) = self.orders.get(&id) {
                return Some(order.value().clone());
            }
            // tombstone: drop the stale cached id and keep draining
            *peeked = None;
        }
    }

    /// Pop the order currently at the head of the FIFO, removing it from
    /// both the map and the queue. Used exclusively by the matching engine
    /// when a resting order is fully consumed. Consumes whatever `head`
    /// last cached, so the two always agree on which order is at the front.
    pub fn pop_head(&self) -> Option<Order> {
        let mut peeked = self.peeked.lock().unwrap();
        loop {
            let id = match peeked.take() {
                Some(id) => id,
                None => self.queue.pop()?,
            };
            if let Some((_, order)) = self.orders.remove(&id) {
                return Some(order);
            }
            // tombstone: keep draining
        }
    }

    /// Snapshot the level's orders in FIFO order. O(n); used only for
    /// book-wide snapshots and persistence, never on the matching hot path.
    pub fn orders_fifo(&self) -> Vec<Order> {
        let mut peeked = self.peeked.lock().unwrap();
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::with_capacity(self.orders.len());
        let drained = SegQueue::new();
        if let Some(id) = peeked.take() {
            drained.push(id);
        }
        while let Some(id) = self.queue.pop() {
            drained.push(id);
        }
        // `drained` now holds every id in original FIFO order, cached head
        // first; replay it back onto `self.queue` in the same order.
        while let Some(id) = drained.pop() {
            if self.orders.contains_key(&id) && seen.insert(id.clone()) {
                if let Some(order) = self.orders.get(&id) {
                    out.push(order.value().clone());
                }
            }
            self.queue.push(id);
        }
        out
    }

    /// Total resting quantity across all orders at this level.
    pub fn total_quantity(&self) -> u64 {
        self.orders.iter().map(|r| r.quantity).sum()
    }
}

impl Default for PriceLevel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::order::Side;

    fn order(id: &str, ts: u64, qty: u64) -> Order {
        Order::new(id.into(), ts, "u1".into(), Side::Buy, qty, 10_000)
    }

    #[test]
    fn fifo_order_is_preserved() {
        let level = PriceLevel::new();
        level.push(order("1", 1, 10));
        level.push(order("2", 2, 10));
        level.push(order("3", 3, 10));

        assert_eq!(level.orders_fifo().iter().map(|o| o.id.clone()).collect::<Vec<_>>(), vec!["1", "2", "3"]);
    }

    #[test]
    fn cancel_preserves_priority_of_siblings() {
        let level = PriceLevel::new();
        level.push(order("a", 1, 1));
        level.push(order("b", 2, 1));
        level.push(order("c", 3, 1));

        assert!(level.remove("b").is_some());
        assert_eq!(level.head().unwrap().id, "a");
        assert_eq!(level.pop_head().unwrap().id, "a");
        assert_eq!(level.pop_head().unwrap().id, "c");
        assert!(level.is_empty());
    }

    #[test]
    fn double_cancel_returns_none_second_time() {
        let level = PriceLevel::new();
        level.push(order("a", 1, 1));
        assert!(level.remove("a").is_some());
        assert!(level.remove("a").is_none());
    }

    #[test]
    fn set_quantity_does_not_reorder() {
        let level = PriceLevel::new();
        level.push(order("a", 1, 5));
        level.push(order("b", 2, 5));
        assert!(level.set_quantity("a", 2));
        assert_eq!(level.head().unwrap().id, "a");
        assert_eq!(level.get("a").unwrap().quantity, 2);
    }
}
