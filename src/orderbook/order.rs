//! Order and side types shared by the book, the matching engine and the protocol codec.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the book an order rests on.
///
/// Mirrors the wire encoding in the `NewOrderSingle` message (tag 54):
/// `1` = Buy, `2` = Sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// A resting or incoming buy order.
    Buy,
    /// A resting or incoming sell order.
    Sell,
}

impl Side {
    /// The opposing side used when walking the book during matching.
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Decode the wire tag (`54=1` buy, `54=2` sell) used by `NewOrderSingle`.
    pub fn from_wire(tag: u8) -> Option<Side> {
        match tag {
            1 => Some(Side::Buy),
            2 => Some(Side::Sell),
            _ => None,
        }
    }

    /// Encode back to the wire tag used by `NewOrderSingle`.
    pub fn to_wire(self) -> u8 {
        match self {
            Side::Buy => 1,
            Side::Sell => 2,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "Buy"),
            Side::Sell => write!(f, "Sell"),
        }
    }
}

/// A price-limit order resting in, or incoming to, an [`crate::orderbook::OrderBook`].
///
/// `id`, `timestamp`, `user`, `side` and `price` are fixed at creation.
/// `quantity` decreases monotonically as the order fills, and is the only
/// field `modify_qty` is allowed to touch; a price or upward quantity change
/// goes through `modify_price_or_grow`, which re-timestamps the order and so
/// loses time priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Opaque, server-assigned identifier. Monotonic within a server session.
    pub id: String,
    /// Nanoseconds since the Unix epoch at creation (or at the last
    /// priority-losing modification). Defines time priority within a level.
    pub timestamp: u64,
    /// Identifier of the user that owns this order.
    pub user: String,
    /// Buy or sell.
    pub side: Side,
    /// Remaining quantity, in whole units. Always positive while resting.
    pub quantity: u64,
    /// Limit price in integer ticks (1 tick = $0.01), rounded at creation.
    pub price: i64,
}

impl Order {
    /// Create a new order, rounding `price` to the nearest cent as the
    /// reference implementation does (`round(price, 2)`).
    pub fn new(id: String, timestamp: u64, user: String, side: Side, quantity: u64, price: i64) -> Self {
        Order {
            id,
            timestamp,
            user,
            side,
            quantity,
            price,
        }
    }

    /// Notional value of the remaining quantity at this order's price.
    pub fn notional(&self) -> i64 {
        self.price * self.quantity as i64
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Order {} ({}) by {} for {} @ {}",
            self.id, self.side, self.user, self.quantity, self.price
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_side_flips() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }

    #[test]
    fn wire_round_trip() {
        assert_eq!(Side::from_wire(Side::Buy.to_wire()), Some(Side::Buy));
        assert_eq!(Side::from_wire(Side::Sell.to_wire()), Some(Side::Sell));
        assert_eq!(Side::from_wire(9), None);
    }

    #[test]
    fn notional_is_price_times_quantity() {
        let order = Order::new("1".into(), 1, "u1".into(), Side::Buy, 5, 10_000);
        assert_eq!(order.notional(), 50_000);
    }
}
