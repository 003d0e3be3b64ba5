//! Per-product order book: price levels, FIFO matching, fees and snapshots.

pub mod book;
pub mod error;
pub mod fees;
pub mod matching;
pub mod order;
pub mod price_level;
pub mod snapshot;

pub use book::OrderBook;
pub use error::OrderBookError;
pub use fees::FeeSchedule;
pub use matching::{apply_fill, match_order, Fill, MatchOutcome};
pub use order::{Order, Side};
pub use price_level::PriceLevel;
pub use snapshot::{OrderBookSnapshot, SnapshotOrderEntry, UserBalanceEntry};
