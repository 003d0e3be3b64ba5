//! Per-product order book: price levels, order index, and per-user balances.

use super::order::{Order, Side};
use super::price_level::PriceLevel;
use super::snapshot::{OrderBookSnapshot, SnapshotOrderEntry, UserBalanceEntry};
use crate::utils::current_time_millis;
use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;
use std::cmp::Reverse;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// One product's resting orders, keyed by price and indexed by id, plus the
/// per-user balance state that is scoped to this product.
///
/// Bids are keyed by raw price (highest served first by iterating in
/// reverse); asks are keyed by raw price (lowest served first by iterating
/// forward). Each level is a FIFO [`PriceLevel`] so time priority is
/// preserved within a price.
pub struct OrderBook {
    /// The product (symbol) this book serves.
    pub symbol: String,

    /// Buy side, keyed by price. Iterate in reverse for best-bid-first.
    pub(crate) bids: SkipMap<i64, Arc<PriceLevel>>,

    /// Sell side, keyed by price. Iterate forward for best-ask-first.
    pub(crate) asks: SkipMap<i64, Arc<PriceLevel>>,

    /// Id -> (side, price) index for O(1) lookup of a resting order's level.
    pub(crate) order_index: DashMap<String, (Side, i64)>,

    /// Per-user balance state scoped to this product.
    pub(crate) user_balance: DashMap<String, UserBalanceEntry>,

    /// Milliseconds since epoch of the most recent mutation.
    timestamp: AtomicU64,
}

impl OrderBook {
    /// Create an empty book for `symbol`.
    pub fn new(symbol: impl Into<String>) -> Self {
        OrderBook {
            symbol: symbol.into(),
            bids: SkipMap::new(),
            asks: SkipMap::new(),
            order_index: DashMap::new(),
            user_balance: DashMap::new(),
            timestamp: AtomicU64::new(current_time_millis()),
        }
    }

    fn touch(&self) {
        self.timestamp.store(current_time_millis(), Ordering::Relaxed);
    }

    /// Explicitly set the book's timestamp, milliseconds since epoch.
    /// Used to thread the timestamp of the order being processed through
    /// to the pre-mutation snapshot, rather than relying on whatever wall
    /// clock value `touch` last stamped.
    pub(crate) fn set_timestamp(&self, ts: u64) {
        self.timestamp.store(ts, Ordering::Relaxed);
    }

    fn levels(&self, side: Side) -> &SkipMap<i64, Arc<PriceLevel>> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    /// Insert a resting order into the book. Fails (`false`) if an order
    /// with the same id is already present.
    pub fn add(&self, order: Order) -> bool {
        if self.order_index.contains_key(&order.id) {
            return false;
        }
        let side = order.side;
        let price = order.price;
        let level = self
            .levels(side)
            .get_or_insert(price, Arc::new(PriceLevel::new()))
            .value()
            .clone();
        level.push(order.clone());
        self.order_index.insert(order.id.clone(), (side, price));
        self.touch();
        true
    }

    /// Remove a level from its side's map if it has gone empty. Called after
    /// any removal that might have drained a level.
    fn prune_if_empty(&self, side: Side, price: i64) {
        if let Some(entry) = self.levels(side).get(&price) {
            if entry.value().is_empty() {
                entry.remove();
            }
        }
    }

    /// Cancel a resting order by id. Returns the removed order, if present.
    pub fn cancel(&self, order_id: &str) -> Option<Order> {
        let (_, (side, price)) = self.order_index.remove(order_id)?;
        let level = self.levels(side).get(&price)?.value().clone();
        let removed = level.remove(order_id);
        self.prune_if_empty(side, price);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    /// Pop the order currently at the head of `(side, price)`'s FIFO. Used
    /// by the matching engine when a resting order is fully consumed.
    pub(crate) fn pop_head(&self, side: Side, price: i64) -> Option<Order> {
        let entry = self.levels(side).get(&price)?;
        let level = entry.value().clone();
        let popped = level.pop_head();
        if let Some(ref order) = popped {
            self.order_index.remove(&order.id);
        }
        if level.is_empty() {
            entry.remove();
        }
        popped
    }

    /// Peek the order currently at the head of `(side, price)`'s FIFO
    /// without removing it. Used by the matching engine to decide how to
    /// split a fill before committing to a removal.
    pub(crate) fn peek_head(&self, side: Side, price: i64) -> Option<Order> {
        self.levels(side).get(&price)?.value().head()
    }

    /// Reduce the resting quantity of an order in place (used for partial
    /// fills and an explicit quantity decrease). Preserves FIFO priority.
    /// Fails if the order is missing or `new_quantity` is not strictly
    /// smaller than the current quantity.
    pub fn modify_qty(&self, order_id: &str, new_quantity: u64) -> bool {
        let Some(entry) = self.order_index.get(order_id) else {
            return false;
        };
        let (side, price) = *entry;
        drop(entry);
        let Some(level_entry) = self.levels(side).get(&price) else {
            return false;
        };
        let level = level_entry.value().clone();
        let Some(current) = level.get(order_id) else {
            return false;
        };
        if new_quantity == 0 || new_quantity >= current.quantity {
            return false;
        }
        let ok = level.set_quantity(order_id, new_quantity);
        if ok {
            self.touch();
        }
        ok
    }

    /// Apply a fill to a resting order without removing it from the book
    /// (the common case of a partial fill during matching). Returns `false`
    /// if the order is not present or `filled_quantity` exceeds its
    /// resting quantity.
    pub(crate) fn apply_partial_fill(&self, side: Side, price: i64, order_id: &str, filled_quantity: u64) -> bool {
        let Some(entry) = self.levels(side).get(&price) else {
            return false;
        };
        let level = entry.value().clone();
        let Some(current) = level.get(order_id) else {
            return false;
        };
        if filled_quantity >= current.quantity {
            return false;
        }
        let ok = level.set_quantity(order_id, current.quantity - filled_quantity);
        if ok {
            self.touch();
        }
        ok
    }

    /// Change an order's price (and, optionally, grow its quantity). This
    /// cancels the order at its old position and re-inserts it at the new
    /// price with a fresh timestamp, so it loses time priority -- mirroring
    /// the reference system's "cancel/replace" semantics for any
    /// modification that is not a pure quantity decrease.
    pub fn modify_price_or_grow(&self, order_id: &str, new_price: i64, new_quantity: u64, new_timestamp: u64) -> bool {
        let Some(old) = self.cancel(order_id) else {
            return false;
        };
        let replacement = Order::new(old.id, new_timestamp, old.user, old.side, new_quantity, new_price);
        self.add(replacement)
    }

    /// Best (highest) bid price and the order resting at its head, if any.
    pub fn best_bid(&self) -> Option<(i64, Order)> {
        self.bids.back().and_then(|e| e.value().head().map(|o| (*e.key(), o)))
    }

    /// Best (lowest) ask price and the order resting at its head, if any.
    pub fn best_ask(&self) -> Option<(i64, Order)> {
        self.asks.front().and_then(|e| e.value().head().map(|o| (*e.key(), o)))
    }

    /// Best price on `side` without regard to FIFO head, or `None` if the
    /// side is empty.
    pub(crate) fn best_price(&self, side: Side) -> Option<i64> {
        match side {
            Side::Buy => self.bids.back().map(|e| *e.key()),
            Side::Sell => self.asks.front().map(|e| *e.key()),
        }
    }

    /// Whether an incoming order at `price` on `side` can match the
    /// opposing book's best price (`side`'s own marketable check).
    pub(crate) fn crosses(&self, side: Side, price: i64) -> bool {
        match side {
            Side::Buy => self.asks.front().is_some_and(|e| *e.key() <= price),
            Side::Sell => self.bids.back().is_some_and(|e| *e.key() >= price),
        }
    }

    /// Look up a resting order by id without removing it.
    pub fn get(&self, order_id: &str) -> Option<Order> {
        let (side, price) = *self.order_index.get(order_id)?;
        self.levels(side).get(&price)?.value().get(order_id)
    }

    /// All resting orders belonging to `user`, across both sides.
    pub fn orders_for_user(&self, user: &str) -> Vec<Order> {
        let mut out = Vec::new();
        for entry in self.bids.iter() {
            out.extend(entry.value().orders_fifo().into_iter().filter(|o| o.user == user));
        }
        for entry in self.asks.iter() {
            out.extend(entry.value().orders_fifo().into_iter().filter(|o| o.user == user));
        }
        out
    }

    /// Fetch (creating if absent) a user's balance entry for this product.
    pub fn balance_of(&self, user: &str) -> UserBalanceEntry {
        *self.user_balance.entry(user.to_string()).or_default()
    }

    /// Mutate a user's balance entry for this product, creating it if absent.
    pub(crate) fn with_balance_mut<R>(&self, user: &str, f: impl FnOnce(&mut UserBalanceEntry) -> R) -> R {
        let mut entry = self.user_balance.entry(user.to_string()).or_default();
        f(&mut entry)
    }

    /// Milliseconds since epoch of the last mutation to this book.
    pub fn last_mutation_millis(&self) -> u64 {
        self.timestamp.load(Ordering::Relaxed)
    }

    /// Build a full-depth snapshot of the book for market data and persistence.
    pub fn snapshot(&self) -> OrderBookSnapshot {
        self.snapshot_with_depth(None)
    }

    /// Build a snapshot limited to `depth` price levels per side, or full
    /// depth if `depth` is `None`.
    pub fn snapshot_with_depth(&self, depth: Option<usize>) -> OrderBookSnapshot {
        let mut bid_prices: Vec<i64> = self.bids.iter().map(|e| *e.key()).collect();
        bid_prices.sort_by_key(|p| Reverse(*p));
        if let Some(d) = depth {
            bid_prices.truncate(d);
        }

        let mut ask_prices: Vec<i64> = self.asks.iter().map(|e| *e.key()).collect();
        ask_prices.sort();
        if let Some(d) = depth {
            ask_prices.truncate(d);
        }

        let bids = bid_prices
            .into_iter()
            .filter_map(|p| self.bids.get(&p))
            .flat_map(|e| e.value().orders_fifo())
            .map(to_entry)
            .collect();

        let asks = ask_prices
            .into_iter()
            .filter_map(|p| self.asks.get(&p))
            .flat_map(|e| e.value().orders_fifo())
            .map(to_entry)
            .collect();

        let user_balance = self
            .user_balance
            .iter()
            .map(|r| (r.key().clone(), *r.value()))
            .collect();

        OrderBookSnapshot {
            bids,
            asks,
            timestamp: self.last_mutation_millis(),
            user_balance,
        }
    }

    /// Rebuild a book from a previously captured snapshot, for `--load`
    /// startup recovery. Reconstructs `order_index` and `user_balance`
    /// but not the original per-order timestamps' relative ordering beyond
    /// what the snapshot already encodes via FIFO array order.
    pub fn restore(symbol: impl Into<String>, snapshot: &OrderBookSnapshot) -> Self {
        let book = OrderBook::new(symbol);
        for (seq, entry) in snapshot.bids.iter().enumerate() {
            book.add(Order::new(entry.id.clone(), seq as u64, entry.user.clone(), Side::Buy, entry.quantity, entry.price));
        }
        for (seq, entry) in snapshot.asks.iter().enumerate() {
            book.add(Order::new(entry.id.clone(), seq as u64, entry.user.clone(), Side::Sell, entry.quantity, entry.price));
        }
        for (user, balance) in &snapshot.user_balance {
            book.user_balance.insert(user.clone(), *balance);
        }
        book.timestamp.store(snapshot.timestamp, Ordering::Relaxed);
        book
    }
}

fn to_entry(order: Order) -> SnapshotOrderEntry {
    SnapshotOrderEntry {
        id: order.id,
        user: order.user,
        quantity: order.quantity,
        price: order.price,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: &str, ts: u64, user: &str, side: Side, qty: u64, price: i64) -> Order {
        Order::new(id.into(), ts, user.into(), side, qty, price)
    }

    #[test]
    fn best_bid_is_highest_price() {
        let book = OrderBook::new("ABC");
        book.add(order("1", 1, "u1", Side::Buy, 10, 100));
        book.add(order("2", 2, "u1", Side::Buy, 10, 105));
        book.add(order("3", 3, "u1", Side::Buy, 10, 101));
        let (price, head) = book.best_bid().unwrap();
        assert_eq!(price, 105);
        assert_eq!(head.id, "2");
    }

    #[test]
    fn best_ask_is_lowest_price() {
        let book = OrderBook::new("ABC");
        book.add(order("1", 1, "u1", Side::Sell, 10, 100));
        book.add(order("2", 2, "u1", Side::Sell, 10, 95));
        let (price, head) = book.best_ask().unwrap();
        assert_eq!(price, 95);
        assert_eq!(head.id, "2");
    }

    #[test]
    fn cancel_removes_order_and_empty_level() {
        let book = OrderBook::new("ABC");
        book.add(order("1", 1, "u1", Side::Buy, 10, 100));
        assert!(book.cancel("1").is_some());
        assert!(book.best_bid().is_none());
        assert!(book.cancel("1").is_none());
    }

    #[test]
    fn modify_qty_rejects_increase() {
        let book = OrderBook::new("ABC");
        book.add(order("1", 1, "u1", Side::Buy, 10, 100));
        assert!(!book.modify_qty("1", 20));
        assert!(book.modify_qty("1", 5));
        assert_eq!(book.get("1").unwrap().quantity, 5);
    }

    #[test]
    fn modify_price_or_grow_loses_time_priority() {
        let book = OrderBook::new("ABC");
        book.add(order("1", 1, "u1", Side::Buy, 10, 100));
        book.add(order("2", 2, "u2", Side::Buy, 10, 100));
        assert!(book.modify_price_or_grow("1", 100, 15, 3));
        // "1" re-enters at the tail of the 100 level
        let level_orders = book.bids.get(&100).unwrap().value().orders_fifo();
        assert_eq!(level_orders[0].id, "2");
        assert_eq!(level_orders[1].id, "1");
        assert_eq!(level_orders[1].quantity, 15);
    }

    #[test]
    fn snapshot_orders_bids_desc_and_asks_asc() {
        let book = OrderBook::new("ABC");
        book.add(order("1", 1, "u1", Side::Buy, 10, 100));
        book.add(order("2", 2, "u1", Side::Buy, 10, 105));
        book.add(order("3", 3, "u1", Side::Sell, 10, 110));
        book.add(order("4", 4, "u1", Side::Sell, 10, 108));
        let snap = book.snapshot();
        assert_eq!(snap.bids.iter().map(|o| o.price).collect::<Vec<_>>(), vec![105, 100]);
        assert_eq!(snap.asks.iter().map(|o| o.price).collect::<Vec<_>>(), vec![108, 110]);
    }

    #[test]
    fn restore_round_trips_book_state() {
        let book = OrderBook::new("ABC");
        book.add(order("1", 1, "u1", Side::Buy, 10, 100));
        book.with_balance_mut("u1", |b| b.balance = 500);
        let snap = book.snapshot();

        let restored = OrderBook::restore("ABC", &snap);
        assert_eq!(restored.best_bid().unwrap().0, 100);
        assert_eq!(restored.balance_of("u1").balance, 500);
    }
}
