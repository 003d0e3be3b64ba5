//! # lob-server
//!
//! A multi-product, multi-user continuous limit-order-book trading server.
//!
//! Incoming buy/sell orders arrive over a FIX-like tagged wire protocol
//! ([`protocol`]), are authenticated and risk-checked by the session
//! dispatcher ([`dispatcher`]), and matched against a per-product order book
//! ([`orderbook`]) using strict price-time (FIFO) priority. Every mutation
//! records a snapshot of the affected book ([`manager`]) and fans it out to
//! subscribers ([`broadcaster`]). On a clean shutdown, the full per-product
//! history and user registry are serialized to disk ([`persistence`]) so a
//! restart with `--load` can resume from the latest state.
//!
//! ## Architecture
//!
//! The intended deployment model is one single-threaded actor per product:
//! each [`orderbook::OrderBook`] sees in-order mutation from exactly one
//! task, so none of its internals need locking for correctness (only the
//! concurrent-map types used for product/user *lookup* are shared).
//! [`dispatcher::ServerState`] is the composition root passed into every
//! handler; there is no module-level mutable state anywhere in the crate.
//!
//! ## Modules
//!
//! - [`orderbook`]: the order book, matching engine, and fee schedule.
//! - [`users`]: cross-product user identity, budget, and order counters.
//! - [`manager`]: per-product book ownership and snapshot history.
//! - [`protocol`]: the tagged wire format -- header, message catalogue, codec.
//! - [`dispatcher`]: routes decoded messages to handlers; owns risk checks.
//! - [`broadcaster`]: fans out encoded snapshots to subscribed connections.
//! - [`persistence`]: checksummed JSON snapshots of the full server state.
//! - [`config`]: TOML configuration plus CLI/environment overrides.
//! - [`utils`]: shared time and fixed-point price helpers.

pub mod broadcaster;
pub mod config;
pub mod dispatcher;
pub mod manager;
pub mod orderbook;
pub mod persistence;
pub mod prelude;
pub mod protocol;
pub mod users;
mod utils;

pub use broadcaster::{SnapshotBroadcaster, Subscription};
pub use dispatcher::{dispatch, Dispatched, ServerState};
pub use manager::ProductManager;
pub use orderbook::{FeeSchedule, Order, OrderBook, OrderBookError, OrderBookSnapshot, Side};
pub use protocol::{Codec, CodecError, Message};
pub use users::UserRegistry;
pub use utils::{current_time_micros, current_time_millis, current_time_ns};
