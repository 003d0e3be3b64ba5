//! Owns one [`OrderBook`] per configured product, plus its append-only
//! history of snapshots used for replay and audit.

use crate::orderbook::{OrderBook, OrderBookSnapshot};
use dashmap::DashMap;
use std::sync::{Arc, RwLock};

struct ProductState {
    book: Arc<OrderBook>,
    history: RwLock<Vec<OrderBookSnapshot>>,
}

impl ProductState {
    fn new(symbol: &str) -> Self {
        ProductState {
            book: Arc::new(OrderBook::new(symbol)),
            history: RwLock::new(Vec::new()),
        }
    }
}

/// Registry of per-product order books and their historical snapshots.
///
/// Per the single-threaded-actor-per-product model, a given product's
/// `ProductState` is expected to be touched by only one task/loop at a
/// time; the `DashMap` here only guards concurrent *creation/lookup* of
/// products, not concurrent mutation of a single book.
pub struct ProductManager {
    products: DashMap<String, Arc<ProductState>>,
}

impl ProductManager {
    /// Create a manager with one empty book per `product` in `products`.
    pub fn new(products: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let manager = ProductManager {
            products: DashMap::new(),
        };
        for product in products {
            let product = product.into();
            manager
                .products
                .insert(product.clone(), Arc::new(ProductState::new(&product)));
        }
        manager
    }

    /// Whether `product` is a configured product.
    pub fn has_product(&self, product: &str) -> bool {
        self.products.contains_key(product)
    }

    /// All configured product identifiers.
    pub fn products(&self) -> Vec<String> {
        self.products.iter().map(|r| r.key().clone()).collect()
    }

    fn state(&self, product: &str) -> Option<Arc<ProductState>> {
        self.products.get(product).map(|r| r.value().clone())
    }

    /// Borrow a shared handle to `product`'s live book. Returns `None` for
    /// an unconfigured product.
    pub fn book(&self, product: &str) -> Option<Arc<OrderBook>> {
        self.state(product).map(|state| state.book.clone())
    }

    /// Record a pre-mutation snapshot of `product`'s book into its history.
    /// Call this immediately before performing a mutating operation, so the
    /// recorded state reflects what the book looked like right before the
    /// change. Advances the book's timestamp to `ts` (milliseconds since
    /// epoch, the timestamp of the order/request about to be applied)
    /// before the snapshot is taken.
    pub fn capture_pre_state(&self, product: &str, ts: u64) -> bool {
        let Some(state) = self.state(product) else {
            return false;
        };
        state.book.set_timestamp(ts);
        let snapshot = state.book.snapshot();
        state.history.write().unwrap().push(snapshot);
        true
    }

    /// Return the last `n` snapshots for `product`'s history, most recent
    /// last. `n = None` returns the full history.
    pub fn history(&self, product: &str, n: Option<usize>) -> Vec<OrderBookSnapshot> {
        let Some(state) = self.state(product) else {
            return Vec::new();
        };
        let history = state.history.read().unwrap();
        match n {
            Some(n) if n < history.len() => history[history.len() - n..].to_vec(),
            _ => history.clone(),
        }
    }

    /// Full per-product history, for persistence.
    pub fn all_history(&self) -> Vec<(String, Vec<OrderBookSnapshot>)> {
        self.products
            .iter()
            .map(|r| (r.key().clone(), r.value().history.read().unwrap().clone()))
            .collect()
    }

    /// Rebuild a product's live book and history from persisted state,
    /// used on `--load` startup. Replaces any existing state for the
    /// product, creating it if it was not already configured.
    pub fn restore_product(&self, product: &str, history: Vec<OrderBookSnapshot>) {
        let book = match history.last() {
            Some(last) => OrderBook::restore(product, last),
            None => OrderBook::new(product),
        };
        self.products.insert(
            product.to_string(),
            Arc::new(ProductState {
                book: Arc::new(book),
                history: RwLock::new(history),
            }),
        );
    }
}
