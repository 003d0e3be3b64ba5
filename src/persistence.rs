//! Serializes and restores the complete per-product book timeline plus the
//! user registry, as a single timestamped, checksummed JSON file per clean
//! shutdown.

use crate::manager::ProductManager;
use crate::orderbook::error::OrderBookError;
use crate::orderbook::OrderBookSnapshot;
use crate::users::UserRegistry;
use crate::utils::current_time_millis;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Format version for the persisted package, bumped on any incompatible
/// layout change.
pub const PERSISTED_FORMAT_VERSION: u32 = 1;

/// A single persisted user's identity and budget state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedUser {
    pub id: String,
    pub name: String,
    pub budget: i64,
    pub num_orders: u64,
}

/// The full state captured on a clean shutdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    pub version: u32,
    /// Product -> ordered snapshot history, oldest first.
    pub products: BTreeMap<String, Vec<OrderBookSnapshot>>,
    pub users: Vec<PersistedUser>,
}

/// Checksum-wrapped envelope written to disk. The checksum covers the
/// serialized `state` field only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedPackage {
    pub state: PersistedState,
    pub checksum: String,
}

impl PersistedPackage {
    fn compute_checksum(state: &PersistedState) -> Result<String, OrderBookError> {
        let payload = serde_json::to_vec(state)?;
        let mut hasher = Sha256::new();
        hasher.update(payload);
        let digest = hasher.finalize();
        Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
    }

    pub fn new(state: PersistedState) -> Result<Self, OrderBookError> {
        let checksum = Self::compute_checksum(&state)?;
        Ok(PersistedPackage { state, checksum })
    }

    pub fn validate(&self) -> Result<(), OrderBookError> {
        let computed = Self::compute_checksum(&self.state)?;
        if computed != self.checksum {
            return Err(OrderBookError::ChecksumMismatch {
                expected: self.checksum.clone(),
                actual: computed,
            });
        }
        Ok(())
    }
}

/// File name for a persisted snapshot taken "now": `<millis>-server_data.json`.
pub fn file_name_for(timestamp_millis: u64) -> String {
    format!("{timestamp_millis}-server_data.json")
}

/// Capture the full state of `products` and `users` and write it to
/// `<dir>/<timestamp>-server_data.json`. Returns the path written.
pub fn save(dir: &Path, products: &ProductManager, users: &UserRegistry) -> Result<PathBuf, OrderBookError> {
    let product_history: BTreeMap<String, Vec<OrderBookSnapshot>> = products.all_history().into_iter().collect();
    let persisted_users = users
        .all()
        .into_iter()
        .map(|(id, name, budget, num_orders)| PersistedUser { id, name, budget, num_orders })
        .collect();

    let state = PersistedState {
        version: PERSISTED_FORMAT_VERSION,
        products: product_history,
        users: persisted_users,
    };
    let package = PersistedPackage::new(state)?;
    let json = serde_json::to_string_pretty(&package)?;

    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name_for(current_time_millis()));
    std::fs::write(&path, json)?;
    Ok(path)
}

/// Locate the newest `*-server_data.json` file in `dir`, by the numeric
/// timestamp prefix (not file mtime, which a copy could disturb).
pub fn newest_snapshot_file(dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.ends_with("-server_data.json")))
        .max_by_key(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.split('-').next())
                .and_then(|n| n.parse::<u64>().ok())
                .unwrap_or(0)
        })
}

/// Load and validate a persisted package from `path`.
pub fn load(path: &Path) -> Result<PersistedState, OrderBookError> {
    let contents = std::fs::read_to_string(path)?;
    let package: PersistedPackage = serde_json::from_str(&contents)?;
    package.validate()?;
    Ok(package.state)
}

/// Rebuild a [`ProductManager`] and [`UserRegistry`] from a persisted
/// state, used on `--load` startup. The order-id counter is not restored
/// here: callers should seed it from `max(existing ids) + 1` using the
/// restored books' own order ids, per §4.8/§9.
pub fn restore(state: PersistedState, configured_products: &[String]) -> (ProductManager, UserRegistry) {
    let manager = ProductManager::new(configured_products.iter().cloned());
    for (product, history) in state.products {
        manager.restore_product(&product, history);
    }

    let registry = UserRegistry::new();
    let mut max_id = 0u64;
    for user in state.users {
        registry.register_with_id(&user.id, &user.name, user.budget);
        for _ in 0..user.num_orders {
            registry.increment_orders(&user.id);
        }
        if let Ok(numeric) = user.id.parse::<u64>() {
            max_id = max_id.max(numeric);
        }
    }
    registry.set_next_id(max_id + 1);

    (manager, registry)
}

/// Highest order id seen across every resting order in every configured
/// product's live book, used to seed the server's order-id counter after
/// a `--load` restore.
pub fn max_order_id(manager: &ProductManager) -> u64 {
    let mut max_id = 0u64;
    for product in manager.products() {
        if let Some(book) = manager.book(&product) {
            let snapshot = book.snapshot();
            for entry in snapshot.bids.iter().chain(snapshot.asks.iter()) {
                if let Ok(numeric) = entry.id.parse::<u64>() {
                    max_id = max_id.max(numeric);
                }
            }
        }
    }
    max_id
}
