//! User identity registry: budget, in-flight obligations, and order counters.
//!
//! Cash and volume accounting for a user's activity on a given product lives
//! on that product's [`crate::orderbook::OrderBook`] (`user_balance`); this
//! registry holds only the cross-product, process-lifetime identity state --
//! name, starting budget, and a monotonic order counter.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// A registered user's process-lifetime identity state.
#[derive(Debug)]
pub struct UserRecord {
    /// Display name chosen at registration.
    pub name: String,
    /// Starting cash budget, fixed at registration time.
    pub budget: i64,
    /// Number of accepted (non-rejected) orders this user has submitted,
    /// across all products.
    num_orders: AtomicU64,
}

impl UserRecord {
    fn new(name: String, budget: i64) -> Self {
        UserRecord {
            name,
            budget,
            num_orders: AtomicU64::new(0),
        }
    }

    /// Number of accepted orders submitted so far.
    pub fn num_orders(&self) -> u64 {
        self.num_orders.load(Ordering::Relaxed)
    }
}

/// Registry mapping user id -> identity and budget state.
///
/// Lookup and mutation are both O(1); concurrent access across products is
/// safe because every field is independently atomic or DashMap-guarded, but
/// per §5 of the design notes, check-then-match for a single user/product
/// pair must still be serialized by the caller (the dispatcher).
#[derive(Debug, Default)]
pub struct UserRegistry {
    users: DashMap<String, UserRecord>,
    name_index: DashMap<String, String>,
    next_id: AtomicU64,
}

impl UserRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        UserRegistry {
            users: DashMap::new(),
            name_index: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new user with `name` and a starting `budget`, returning
    /// the assigned id. Ids are assigned sequentially and never reused.
    pub fn register(&self, name: impl Into<String>, budget: i64) -> String {
        let name = name.into();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed).to_string();
        self.name_index.insert(name.clone(), id.clone());
        self.users.insert(id.clone(), UserRecord::new(name, budget));
        id
    }

    /// Register a user under a caller-supplied id, used when restoring
    /// persisted state. Returns `false` if the id is already present.
    pub fn register_with_id(&self, id: impl Into<String>, name: impl Into<String>, budget: i64) -> bool {
        let id = id.into();
        if self.users.contains_key(&id) {
            return false;
        }
        let name = name.into();
        self.name_index.insert(name.clone(), id.clone());
        self.users.insert(id, UserRecord::new(name, budget));
        true
    }

    /// Whether `id` is a known, registered user.
    pub fn exists(&self, id: &str) -> bool {
        self.users.contains_key(id)
    }

    /// Resolve a display name back to its assigned user id.
    pub fn lookup_by_name(&self, name: &str) -> Option<String> {
        self.name_index.get(name).map(|r| r.value().clone())
    }

    /// Overwrite a user's budget.
    pub fn set_budget(&self, id: &str, budget: i64) -> bool {
        match self.users.get_mut(id) {
            Some(mut user) => {
                user.budget = budget;
                true
            }
            None => false,
        }
    }

    /// Current budget for a user, if registered.
    pub fn budget_of(&self, id: &str) -> Option<i64> {
        self.users.get(id).map(|u| u.budget)
    }

    /// Increment a user's accepted-order counter. No-op if unknown.
    pub fn increment_orders(&self, id: &str) {
        if let Some(user) = self.users.get(id) {
            user.num_orders.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Number of accepted orders a user has submitted, or `None` if unknown.
    pub fn order_count(&self, id: &str) -> Option<u64> {
        self.users.get(id).map(|u| u.num_orders())
    }

    /// Snapshot every registered user as `(id, name, budget, num_orders)`,
    /// used by persistence.
    pub fn all(&self) -> Vec<(String, String, i64, u64)> {
        self.users
            .iter()
            .map(|r| (r.key().clone(), r.value().name.clone(), r.value().budget, r.value().num_orders()))
            .collect()
    }

    /// Highest assigned id, as an integer, or `0` if no user has registered
    /// yet. Used on `--load` to seed the monotonic id counter.
    pub fn max_id(&self) -> u64 {
        self.users.iter().filter_map(|r| r.key().parse::<u64>().ok()).max().unwrap_or(0)
    }

    /// Force the next id to be assigned, used after a `--load` restore so
    /// newly registered users never collide with restored ids.
    pub fn set_next_id(&self, next: u64) {
        self.next_id.store(next, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_assigns_sequential_ids() {
        let registry = UserRegistry::new();
        let id1 = registry.register("alice", 1000);
        let id2 = registry.register("bob", 2000);
        assert_ne!(id1, id2);
        assert!(registry.exists(&id1));
        assert!(registry.exists(&id2));
    }

    #[test]
    fn lookup_by_name_resolves_to_id() {
        let registry = UserRegistry::new();
        let id = registry.register("alice", 1000);
        assert_eq!(registry.lookup_by_name("alice"), Some(id));
        assert_eq!(registry.lookup_by_name("nobody"), None);
    }

    #[test]
    fn increment_orders_tracks_count() {
        let registry = UserRegistry::new();
        let id = registry.register("alice", 1000);
        registry.increment_orders(&id);
        registry.increment_orders(&id);
        assert_eq!(registry.order_count(&id), Some(2));
    }

    #[test]
    fn restore_with_id_rejects_duplicates() {
        let registry = UserRegistry::new();
        assert!(registry.register_with_id("7", "alice", 1000));
        assert!(!registry.register_with_id("7", "bob", 2000));
    }

    #[test]
    fn max_id_reflects_restored_users() {
        let registry = UserRegistry::new();
        registry.register_with_id("3", "alice", 1000);
        registry.register_with_id("9", "bob", 2000);
        assert_eq!(registry.max_id(), 9);
    }
}
