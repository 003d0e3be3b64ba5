//! Prelude module that re-exports the types most call sites need.
//!
//! ```rust
//! use lob_server::prelude::*;
//! ```

// Order book core
pub use crate::orderbook::{
    apply_fill, match_order, Fill, MatchOutcome, Order, OrderBook, OrderBookError, OrderBookSnapshot, Side,
};
pub use crate::orderbook::fees::FeeSchedule;

// Server composition
pub use crate::dispatcher::{dispatch, Dispatched, ServerState};
pub use crate::manager::ProductManager;
pub use crate::users::UserRegistry;

// Wire protocol
pub use crate::protocol::{Codec, CodecError, Decoded, ExecStatus, Message};

// Supporting services
pub use crate::broadcaster::{SnapshotBroadcaster, Subscription};
pub use crate::config::{Cli, ServerConfig};

// Utility functions
pub use crate::utils::{current_time_micros, current_time_millis, current_time_ns};
