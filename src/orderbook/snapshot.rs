//! Order book snapshot for market data and history.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single resting order as it appears in a snapshot's `Bids`/`Asks` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotOrderEntry {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "User")]
    pub user: String,
    #[serde(rename = "Quantity")]
    pub quantity: u64,
    #[serde(rename = "Price")]
    pub price: i64,
}

/// Per-user balance entry carried inside a snapshot's `UserBalance` map.
///
/// Cash and volume are tracked per product inside the [`super::OrderBook`]:
/// a user trading on two products has two independent entries, one per
/// product's snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UserBalanceEntry {
    pub balance: i64,
    pub volume: i64,
    pub post_sell_volume: i64,
}

/// A snapshot of the order book state at a specific point in time.
///
/// Bids are ordered highest-price-first, asks lowest-price-first, each level
/// internally in FIFO (time priority) order -- the shape the wire protocol's
/// `MarketDataSnapshot`, `TradeCaptureReport` and `CollateralReport` payloads
/// all carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    #[serde(rename = "Bids")]
    pub bids: Vec<SnapshotOrderEntry>,
    #[serde(rename = "Asks")]
    pub asks: Vec<SnapshotOrderEntry>,
    #[serde(rename = "Timestamp")]
    pub timestamp: u64,
    #[serde(rename = "UserBalance")]
    pub user_balance: BTreeMap<String, UserBalanceEntry>,
}

impl OrderBookSnapshot {
    /// Best (highest) bid price and quantity, if any bids are present.
    pub fn best_bid(&self) -> Option<(i64, u64)> {
        self.bids.first().map(|o| (o.price, o.quantity))
    }

    /// Best (lowest) ask price and quantity, if any asks are present.
    pub fn best_ask(&self) -> Option<(i64, u64)> {
        self.asks.first().map(|o| (o.price, o.quantity))
    }

    /// Mid price -- average of best bid and best ask -- used only for
    /// external reporting, never for matching decisions.
    pub fn mid_price(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => Some((bid as f64 + ask as f64) / 2.0),
            _ => None,
        }
    }
}
