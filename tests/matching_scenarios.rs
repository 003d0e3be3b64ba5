//! End-to-end matching scenarios driven through the dispatcher, covering
//! partial fills, price-time priority, and multi-level crosses.

use lob_server::orderbook::Side;
use lob_server::orderbook::FeeSchedule;
use lob_server::{dispatch, Message, ProductManager, ServerState, UserRegistry};
use lob_server::protocol::message::ExecStatus;

fn server() -> ServerState {
    ServerState::new(ProductManager::new(["ABC"]), UserRegistry::new(), FeeSchedule::zero_fee())
}

fn new_order(product: &str, side: Side, quantity: u64, price: i64) -> Message {
    Message::NewOrderSingle { product: product.into(), side, quantity, price }
}

#[test]
fn s2_partial_fill_leaves_remainder_resting() {
    let state = server();
    let seller = state.users.register("U1", 10_000);
    let buyer = state.users.register("U2", 10_000);

    dispatch(&state, &seller, new_order("ABC", Side::Sell, 3, 102));
    let buy = dispatch(&state, &buyer, new_order("ABC", Side::Buy, 5, 102));

    match buy.response {
        Message::ExecutionReport { exec_status: ExecStatus::Resting, quantity: Some(2), .. } => {}
        other => panic!("expected a 2-unit resting remainder, got {other:?}"),
    }

    let book = state.products.book("ABC").unwrap();
    assert!(book.best_ask().is_none());
    assert_eq!(book.best_bid().map(|(price, _)| price), Some(102));
}

#[test]
fn s3_price_time_priority_within_a_level() {
    let state = server();
    let u1 = state.users.register("U1", 10_000);
    let u2 = state.users.register("U2", 10_000);
    let buyer = state.users.register("U3", 10_000);

    dispatch(&state, &u1, new_order("ABC", Side::Sell, 2, 100));
    dispatch(&state, &u1, new_order("ABC", Side::Sell, 3, 100));
    dispatch(&state, &u2, new_order("ABC", Side::Sell, 4, 100));

    dispatch(&state, &buyer, new_order("ABC", Side::Buy, 5, 100));

    let book = state.products.book("ABC").unwrap();
    // Only U2's order (the third one submitted) should remain resting.
    let remaining = book.orders_for_user(&u2);
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].quantity, 4);
    assert!(book.orders_for_user(&u1).is_empty());
}

#[test]
fn s4_crossed_book_walks_multiple_levels() {
    let state = server();
    let s1 = state.users.register("S1", 10_000);
    let s2 = state.users.register("S2", 10_000);
    let s3 = state.users.register("S3", 10_000);
    let buyer = state.users.register("B1", 10_000);

    dispatch(&state, &s1, new_order("ABC", Side::Sell, 3, 100));
    dispatch(&state, &s2, new_order("ABC", Side::Sell, 2, 101));
    dispatch(&state, &s3, new_order("ABC", Side::Sell, 5, 103));

    let buy = dispatch(&state, &buyer, new_order("ABC", Side::Buy, 6, 102));

    match buy.response {
        Message::ExecutionReport { exec_status: ExecStatus::Resting, quantity: Some(1), .. } => {}
        other => panic!("expected a 1-unit remainder resting at 102, got {other:?}"),
    }

    let book = state.products.book("ABC").unwrap();
    assert_eq!(book.best_bid().map(|(price, _)| price), Some(102));
    assert_eq!(book.best_ask().map(|(price, _)| price), Some(103));
    assert_eq!(book.balance_of(&s1).volume, -3);
    assert_eq!(book.balance_of(&s2).volume, -2);
    assert_eq!(book.balance_of(&s3).volume, 0);
}

#[test]
fn s5_cancel_preserves_sibling_priority() {
    let state = server();
    let a = state.users.register("A", 10_000);
    let b = state.users.register("B", 10_000);
    let c = state.users.register("C", 10_000);
    let buyer = state.users.register("Buyer", 10_000);

    let order_a = dispatch(&state, &a, new_order("ABC", Side::Sell, 1, 100));
    let order_b = dispatch(&state, &b, new_order("ABC", Side::Sell, 1, 100));
    dispatch(&state, &c, new_order("ABC", Side::Sell, 1, 100));

    let id_b = match order_b.response {
        Message::ExecutionReport { order_id, .. } => order_id,
        other => panic!("unexpected response {other:?}"),
    };
    let _ = order_a;

    let book = state.products.book("ABC").unwrap();
    assert!(book.cancel(&id_b).is_some());

    let buy = dispatch(&state, &buyer, new_order("ABC", Side::Buy, 2, 100));
    match buy.response {
        Message::ExecutionReport { exec_status: ExecStatus::Filled, .. } => {}
        other => panic!("expected full fill, got {other:?}"),
    }
    assert_eq!(book.balance_of(&a).volume, -1);
    assert_eq!(book.balance_of(&c).volume, -1);
    assert_eq!(book.balance_of(&b).volume, 0);
}

#[test]
fn double_cancel_is_idempotent() {
    let state = server();
    let user = state.users.register("U1", 10_000);
    let resp = dispatch(&state, &user, new_order("ABC", Side::Sell, 1, 100));
    let order_id = match resp.response {
        Message::ExecutionReport { order_id, .. } => order_id,
        other => panic!("unexpected response {other:?}"),
    };

    let first = dispatch(&state, &user, Message::OrderCancelRequest { product: "ABC".into(), order_id: order_id.clone() });
    assert!(matches!(first.response, Message::ExecutionReport { exec_status: ExecStatus::Canceled, .. }));

    let second = dispatch(&state, &user, Message::OrderCancelRequest { product: "ABC".into(), order_id });
    assert!(matches!(second.response, Message::Reject { .. }));
}

#[test]
fn modify_qty_to_same_value_is_idempotent() {
    let state = server();
    let user = state.users.register("U1", 10_000);
    let resp = dispatch(&state, &user, new_order("ABC", Side::Sell, 5, 100));
    let order_id = match resp.response {
        Message::ExecutionReport { order_id, .. } => order_id,
        other => panic!("unexpected response {other:?}"),
    };

    let first = dispatch(&state, &user, Message::OrderModifyRequestQty { product: "ABC".into(), order_id: order_id.clone(), new_quantity: 5 });
    assert!(matches!(first.response, Message::ExecutionReport { exec_status: ExecStatus::Replaced, .. }));

    let second = dispatch(&state, &user, Message::OrderModifyRequestQty { product: "ABC".into(), order_id, new_quantity: 5 });
    assert!(matches!(second.response, Message::ExecutionReport { exec_status: ExecStatus::Replaced, .. }));
}
