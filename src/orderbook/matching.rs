//! FIFO price-time matching of an incoming order against a resting book.

use super::book::OrderBook;
use super::order::{Order, Side};

/// A single fill produced while matching one incoming order.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    /// Id of the resting (maker) order.
    pub resting_order_id: String,
    /// User owning the resting order.
    pub resting_user: String,
    /// User owning the incoming (taker) order.
    pub incoming_user: String,
    /// Quantity exchanged.
    pub quantity: u64,
    /// Execution price -- always the resting order's price.
    pub price: i64,
    /// Side of the incoming (taker) order.
    pub taker_side: Side,
}

/// Outcome of driving one incoming order through [`match_order`].
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// The incoming order's full quantity was filled; nothing was added to the book.
    Filled { fills: Vec<Fill> },
    /// Some quantity filled (possibly none) and a positive remainder now rests on the book.
    Resting { fills: Vec<Fill>, resting_order_id: String },
    /// The incoming order could not be matched at all (invalid side or similar).
    Rejected,
}

impl MatchOutcome {
    /// Fills produced by this outcome, in execution order.
    pub fn fills(&self) -> &[Fill] {
        match self {
            MatchOutcome::Filled { fills } => fills,
            MatchOutcome::Resting { fills, .. } => fills,
            MatchOutcome::Rejected => &[],
        }
    }
}

/// Drive `incoming` through `book`, walking price levels on the opposing
/// side best-price-first and, within a level, head-first (FIFO). Matching
/// stops as soon as the incoming order is exhausted or the next candidate
/// level's price fails the incoming order's limit.
///
/// The incoming order is never itself inserted into `book` by this
/// function except as the final resting remainder in the `Resting` case;
/// callers are expected to have already performed admission/risk checks.
pub fn match_order(book: &OrderBook, mut incoming: Order) -> MatchOutcome {
    let side = incoming.side;
    let opposing = side.opposite();
    let mut fills = Vec::new();

    while incoming.quantity > 0 {
        let Some(best_px) = book.best_price(opposing) else {
            break;
        };

        let marketable = match side {
            Side::Buy => incoming.price >= best_px,
            Side::Sell => incoming.price <= best_px,
        };
        if !marketable {
            break;
        }

        loop {
            let Some(head) = book.peek_head(opposing, best_px) else {
                break;
            };

            if head.quantity > incoming.quantity {
                let traded_qty = incoming.quantity;
                // partial consumption of the resting head: reduce its
                // quantity in place, preserving FIFO position (no removal).
                book.apply_partial_fill(opposing, best_px, &head.id, traded_qty);
                fills.push(fill_for(&head, &incoming, traded_qty, best_px, side));
                incoming.quantity = 0;
                break;
            } else if head.quantity == incoming.quantity {
                let traded_qty = head.quantity;
                book.pop_head(opposing, best_px);
                fills.push(fill_for(&head, &incoming, traded_qty, best_px, side));
                incoming.quantity = 0;
                break;
            } else {
                let traded_qty = head.quantity;
                book.pop_head(opposing, best_px);
                fills.push(fill_for(&head, &incoming, traded_qty, best_px, side));
                incoming.quantity -= traded_qty;
                // head fully consumed; loop to the level's new head.
                continue;
            }
        }

        if incoming.quantity == 0 {
            break;
        }
        if book.best_price(opposing) != Some(best_px) {
            // level exhausted; outer loop will pick up the next best price.
            continue;
        }
    }

    if incoming.quantity == 0 {
        MatchOutcome::Filled { fills }
    } else {
        let order_id = incoming.id.clone();
        book.add(incoming);
        MatchOutcome::Resting {
            fills,
            resting_order_id: order_id,
        }
    }
}

fn fill_for(resting: &Order, incoming: &Order, quantity: u64, price: i64, taker_side: Side) -> Fill {
    Fill {
        resting_order_id: resting.id.clone(),
        resting_user: resting.user.clone(),
        incoming_user: incoming.user.clone(),
        quantity,
        price,
        taker_side,
    }
}

/// Apply one fill's cash/volume deltas to both parties' per-product balance
/// entries. Buyer and seller are derived from `fill.taker_side`: the
/// incoming user is buyer when `taker_side == Buy`, otherwise the resting
/// user is.
pub fn apply_fill(book: &OrderBook, fill: &Fill) {
    let notional = fill.price * fill.quantity as i64;
    let (buyer, seller) = match fill.taker_side {
        Side::Buy => (&fill.incoming_user, &fill.resting_user),
        Side::Sell => (&fill.resting_user, &fill.incoming_user),
    };
    book.with_balance_mut(buyer, |b| {
        b.balance -= notional;
        b.volume += fill.quantity as i64;
    });
    book.with_balance_mut(seller, |b| {
        b.balance += notional;
        b.volume -= fill.quantity as i64;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::order::Order;

    fn order(id: &str, ts: u64, user: &str, side: Side, qty: u64, price: i64) -> Order {
        Order::new(id.into(), ts, user.into(), side, qty, price)
    }

    #[test]
    fn s1_full_fill_single_level() {
        let book = OrderBook::new("ABC");
        book.add(order("s1", 1, "U1", Side::Sell, 5, 100));
        let outcome = match_order(&book, order("b1", 2, "U2", Side::Buy, 5, 105));
        match outcome {
            MatchOutcome::Filled { fills } => {
                assert_eq!(fills.len(), 1);
                assert_eq!(fills[0].price, 100);
                assert_eq!(fills[0].quantity, 5);
            }
            other => panic!("expected Filled, got {other:?}"),
        }
        assert!(book.best_bid().is_none());
        assert!(book.best_ask().is_none());
    }

    #[test]
    fn s2_partial_fill_remainder_rests_at_incoming_price() {
        let book = OrderBook::new("ABC");
        book.add(order("s1", 1, "U1", Side::Sell, 3, 102));
        let outcome = match_order(&book, order("b1", 2, "U2", Side::Buy, 5, 102));
        match outcome {
            MatchOutcome::Resting { fills, resting_order_id } => {
                assert_eq!(fills.len(), 1);
                assert_eq!(fills[0].quantity, 3);
                assert_eq!(fills[0].price, 102);
                assert_eq!(resting_order_id, "b1");
            }
            other => panic!("expected Resting, got {other:?}"),
        }
        let (price, head) = book.best_bid().unwrap();
        assert_eq!(price, 102);
        assert_eq!(head.quantity, 2);
        assert!(book.best_ask().is_none());
    }

    #[test]
    fn s3_price_time_priority_within_level() {
        let book = OrderBook::new("ABC");
        book.add(order("s1", 1, "U1", Side::Sell, 2, 100));
        book.add(order("s2", 2, "U1", Side::Sell, 3, 100));
        book.add(order("s3", 3, "U2", Side::Sell, 4, 100));
        let outcome = match_order(&book, order("b1", 4, "U3", Side::Buy, 5, 100));
        match outcome {
            MatchOutcome::Filled { fills } => {
                assert_eq!(fills.len(), 2);
                assert_eq!(fills[0].resting_order_id, "s1");
                assert_eq!(fills[0].quantity, 2);
                assert_eq!(fills[1].resting_order_id, "s2");
                assert_eq!(fills[1].quantity, 3);
            }
            other => panic!("expected Filled, got {other:?}"),
        }
        let remaining = book.get("s3").unwrap();
        assert_eq!(remaining.quantity, 4);
    }

    #[test]
    fn s4_crossed_book_walks_levels_and_stops_at_limit() {
        let book = OrderBook::new("ABC");
        book.add(order("s1", 1, "U1", Side::Sell, 3, 100));
        book.add(order("s2", 2, "U1", Side::Sell, 2, 101));
        book.add(order("s3", 3, "U1", Side::Sell, 5, 103));
        let outcome = match_order(&book, order("b1", 4, "U2", Side::Buy, 6, 102));
        match outcome {
            MatchOutcome::Resting { fills, resting_order_id } => {
                assert_eq!(fills.len(), 2);
                assert_eq!((fills[0].price, fills[0].quantity), (100, 3));
                assert_eq!((fills[1].price, fills[1].quantity), (101, 2));
                assert_eq!(resting_order_id, "b1");
            }
            other => panic!("expected Resting, got {other:?}"),
        }
        let (price, head) = book.best_bid().unwrap();
        assert_eq!(price, 102);
        assert_eq!(head.quantity, 1);
        let (ask_price, _) = book.best_ask().unwrap();
        assert_eq!(ask_price, 103);
    }

    #[test]
    fn s5_cancel_preserves_priority_of_siblings() {
        let book = OrderBook::new("ABC");
        book.add(order("a", 1, "U1", Side::Sell, 1, 100));
        book.add(order("b", 2, "U1", Side::Sell, 1, 100));
        book.add(order("c", 3, "U1", Side::Sell, 1, 100));
        assert!(book.cancel("b").is_some());

        let outcome = match_order(&book, order("buy", 4, "U2", Side::Buy, 2, 100));
        match outcome {
            MatchOutcome::Filled { fills } => {
                assert_eq!(fills[0].resting_order_id, "a");
                assert_eq!(fills[1].resting_order_id, "c");
            }
            other => panic!("expected Filled, got {other:?}"),
        }
    }

    #[test]
    fn fill_accounting_matches_buyer_and_seller_deltas() {
        let book = OrderBook::new("ABC");
        book.add(order("s1", 1, "U1", Side::Sell, 5, 100));
        let outcome = match_order(&book, order("b1", 2, "U2", Side::Buy, 5, 105));
        for fill in outcome.fills() {
            apply_fill(&book, fill);
        }
        let buyer = book.balance_of("U2");
        let seller = book.balance_of("U1");
        assert_eq!(buyer.balance, -500);
        assert_eq!(buyer.volume, 5);
        assert_eq!(seller.balance, 500);
        assert_eq!(seller.volume, -5);
    }
}
