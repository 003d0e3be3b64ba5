//! Single entry point for a decoded message: authenticates, applies
//! pre-trade risk checks, drives the matching engine, and emits the
//! synchronous response plus any asynchronous snapshot broadcast.

use crate::manager::ProductManager;
use crate::orderbook::{self, FeeSchedule, Order, Side};
use crate::protocol::message::ExecStatus;
use crate::protocol::Message;
use crate::users::UserRegistry;
use crate::utils::{current_time_millis, current_time_ns};
use std::sync::atomic::{AtomicU64, Ordering};

/// Aggregate server state a single dispatcher instance owns: every
/// product's book/history, the cross-product user registry, and the fee
/// schedule applied to every accepted order.
pub struct ServerState {
    pub products: ProductManager,
    pub users: UserRegistry,
    pub fees: FeeSchedule,
    next_order_id: AtomicU64,
}

impl ServerState {
    pub fn new(products: ProductManager, users: UserRegistry, fees: FeeSchedule) -> Self {
        ServerState {
            products,
            users,
            fees,
            next_order_id: AtomicU64::new(1),
        }
    }

    /// Seed the order-id counter after a `--load` restore, so freshly
    /// generated ids never collide with restored ones.
    pub fn set_next_order_id(&self, next: u64) {
        self.next_order_id.store(next, Ordering::Relaxed);
    }

    fn next_order_id(&self) -> String {
        self.next_order_id.fetch_add(1, Ordering::Relaxed).to_string()
    }
}

/// The dispatcher's decision for one decoded message: the synchronous
/// response to return to the caller, plus the product (if any) whose
/// snapshot should now be broadcast.
pub struct Dispatched {
    pub response: Message,
    pub broadcast_product: Option<String>,
}

impl Dispatched {
    fn response_only(response: Message) -> Self {
        Dispatched { response, broadcast_product: None }
    }

    fn with_broadcast(response: Message, product: String) -> Self {
        Dispatched { response, broadcast_product: Some(product) }
    }
}

/// Route one decoded message from `sender` through to a response.
///
/// `RegisterRequest` is the only message type accepted from an unknown
/// sender; every other message from an unregistered user is rejected
/// before it reaches a handler.
pub fn dispatch(state: &ServerState, sender: &str, message: Message) -> Dispatched {
    if !matches!(message, Message::RegisterRequest { .. }) && !state.users.exists(sender) {
        return Dispatched::response_only(Message::Reject {
            order_id: String::new(),
            reason: "unknown user".to_string(),
        });
    }

    match message {
        Message::RegisterRequest { name, budget } => handle_register(state, name, budget),
        Message::NewOrderSingle { product, side, quantity, price } => {
            handle_new_order(state, sender, product, side, quantity, price)
        }
        Message::OrderCancelRequest { product, order_id } => handle_cancel(state, &product, &order_id),
        Message::OrderModifyRequestQty { product, order_id, new_quantity } => {
            handle_modify_qty(state, &product, &order_id, new_quantity)
        }
        Message::OrderStatusRequest { product, order_id } => handle_status(state, &product, &order_id),
        Message::MarketDataRequest { product, depth } => handle_snapshot(state, &product, depth),
        Message::UserOrderStatusRequest { product } => handle_user_orders(state, sender, &product),
        Message::UserBalanceRequest { product } => handle_user_balance(state, sender, &product),
        Message::CaptureReportRequest { product, history_len } => handle_capture(state, &product, history_len),
        Message::InitializeLiquidityEngine { product, budget, volume } => {
            handle_init_liquidity(state, sender, product, budget, volume)
        }
        other => Dispatched::response_only(Message::Reject {
            order_id: String::new(),
            reason: format!("unexpected message on this session: {:?}", other.msg_type()),
        }),
    }
}

fn handle_register(state: &ServerState, name: String, budget: i64) -> Dispatched {
    let user_id = state.users.register(name, budget);
    Dispatched::response_only(Message::RegisterResponse { user_id })
}

fn reject(order_id: impl Into<String>, reason: &str) -> Dispatched {
    let order_id = order_id.into();
    tracing::debug!(order_id, reason, "rejecting new order");
    Dispatched::response_only(Message::ExecutionReport {
        order_id,
        exec_status: ExecStatus::Rejected,
        side: None,
        quantity: None,
        price: None,
    })
}

/// Recompute `post_buy_budget` per I6: `budget + balance - Σ(open buy qty·price)`.
fn post_buy_budget(book: &orderbook::OrderBook, users: &UserRegistry, user: &str) -> i64 {
    let budget = users.budget_of(user).unwrap_or(0);
    let balance_entry = book.balance_of(user);
    let open_buy_notional: i64 = book
        .orders_for_user(user)
        .into_iter()
        .filter(|o| o.side == Side::Buy)
        .map(|o| o.notional())
        .sum();
    budget + balance_entry.balance - open_buy_notional
}

/// Recompute `post_sell_volume` per I6: `volume - Σ(open sell qty)`.
fn post_sell_volume(book: &orderbook::OrderBook, user: &str) -> i64 {
    let balance_entry = book.balance_of(user);
    let open_sell_qty: i64 = book
        .orders_for_user(user)
        .into_iter()
        .filter(|o| o.side == Side::Sell)
        .map(|o| o.quantity as i64)
        .sum();
    balance_entry.volume - open_sell_qty
}

fn handle_new_order(state: &ServerState, user: &str, product: String, side: Side, quantity: u64, price: i64) -> Dispatched {
    let Some(book) = state.products.book(&product) else {
        return reject("", "unknown product");
    };
    if quantity == 0 || price <= 0 {
        return reject("", "invalid order fields");
    }

    match side {
        Side::Buy => {
            if post_buy_budget(&book, &state.users, user) < price * quantity as i64 {
                return reject("", "insufficient post-buy budget");
            }
        }
        Side::Sell => {
            if post_sell_volume(&book, user) < quantity as i64 {
                return reject("", "insufficient post-sell volume");
            }
        }
    }

    let order_id = state.next_order_id();
    let order_timestamp = current_time_ns();
    let order = Order::new(order_id.clone(), order_timestamp, user.to_string(), side, quantity, price);

    state.products.capture_pre_state(&product, order_timestamp / 1_000_000);
    let outcome = orderbook::match_order(&book, order);
    for fill in outcome.fills() {
        orderbook::apply_fill(&book, fill);
    }

    let response = match &outcome {
        orderbook::MatchOutcome::Filled { .. } => Message::ExecutionReport {
            order_id: order_id.clone(),
            exec_status: ExecStatus::Filled,
            side: Some(side),
            quantity: Some(0),
            price: Some(price),
        },
        orderbook::MatchOutcome::Resting { resting_order_id, fills } => {
            let status = if fills.is_empty() { ExecStatus::New } else { ExecStatus::Resting };
            let remaining = book.get(resting_order_id).map(|o| o.quantity).unwrap_or(0);
            Message::ExecutionReport {
                order_id: resting_order_id.clone(),
                exec_status: status,
                side: Some(side),
                quantity: Some(remaining),
                price: Some(price),
            }
        }
        orderbook::MatchOutcome::Rejected => {
            return reject(order_id, "invalid side");
        }
    };

    // fee and order-counter side effects only apply once the outcome is
    // confirmed not to be Rejected.
    let fee = state.fees.calculate_fee(price, quantity);
    state.users.set_budget(user, state.users.budget_of(user).unwrap_or(0) - fee);
    state.users.increment_orders(user);

    Dispatched::with_broadcast(response, product)
}

/// Admin-style seed of a liquidity-provider account: overwrites `user`'s
/// global budget and `product`-scoped balance/volume directly, bypassing
/// the normal order submission and risk-check path entirely. Used to
/// bootstrap a market maker before it starts quoting both sides of the
/// book.
fn handle_init_liquidity(state: &ServerState, user: &str, product: String, budget: i64, volume: i64) -> Dispatched {
    let Some(book) = state.products.book(&product) else {
        return reject("", "unknown product");
    };
    state.users.set_budget(user, budget);
    book.with_balance_mut(user, |b| {
        b.balance = 0;
        b.volume = volume;
    });
    let payload = serde_json::to_value(book.balance_of(user)).unwrap_or(serde_json::Value::Null);
    Dispatched::response_only(Message::CollateralReport { user_balance: payload })
}

fn handle_cancel(state: &ServerState, product: &str, order_id: &str) -> Dispatched {
    let Some(book) = state.products.book(product) else {
        return Dispatched::response_only(Message::Reject { order_id: order_id.to_string(), reason: "unknown product".into() });
    };
    state.products.capture_pre_state(product, current_time_millis());
    match book.cancel(order_id) {
        Some(_) => Dispatched::with_broadcast(
            Message::ExecutionReport {
                order_id: order_id.to_string(),
                exec_status: ExecStatus::Canceled,
                side: None,
                quantity: None,
                price: None,
            },
            product.to_string(),
        ),
        None => Dispatched::response_only(Message::Reject { order_id: order_id.to_string(), reason: "unknown or non-owned order".into() }),
    }
}

fn handle_modify_qty(state: &ServerState, product: &str, order_id: &str, new_quantity: u64) -> Dispatched {
    let Some(book) = state.products.book(product) else {
        return Dispatched::response_only(Message::Reject { order_id: order_id.to_string(), reason: "unknown product".into() });
    };
    state.products.capture_pre_state(product, current_time_millis());
    if book.modify_qty(order_id, new_quantity) {
        let order = book.get(order_id);
        Dispatched::with_broadcast(
            Message::ExecutionReport {
                order_id: order_id.to_string(),
                exec_status: ExecStatus::Replaced,
                side: order.as_ref().map(|o| o.side),
                quantity: Some(new_quantity),
                price: order.map(|o| o.price),
            },
            product.to_string(),
        )
    } else {
        Dispatched::response_only(Message::Reject { order_id: order_id.to_string(), reason: "quantity increase or unknown order".into() })
    }
}

fn handle_status(state: &ServerState, product: &str, order_id: &str) -> Dispatched {
    let Some(book) = state.products.book(product) else {
        return Dispatched::response_only(Message::Reject { order_id: order_id.to_string(), reason: "unknown product".into() });
    };
    match book.get(order_id) {
        Some(order) => Dispatched::response_only(Message::ExecutionReport {
            order_id: order.id,
            exec_status: ExecStatus::Resting,
            side: Some(order.side),
            quantity: Some(order.quantity),
            price: Some(order.price),
        }),
        None => Dispatched::response_only(Message::ExecutionReport {
            order_id: order_id.to_string(),
            exec_status: ExecStatus::Rejected,
            side: None,
            quantity: None,
            price: None,
        }),
    }
}

fn handle_snapshot(state: &ServerState, product: &str, depth: i64) -> Dispatched {
    let snapshot = match state.products.book(product) {
        Some(book) if depth < 0 => book.snapshot(),
        Some(book) => book.snapshot_with_depth(Some(depth as usize)),
        None => orderbook::OrderBookSnapshot {
            bids: Vec::new(),
            asks: Vec::new(),
            timestamp: 0,
            user_balance: std::collections::BTreeMap::new(),
        },
    };
    Dispatched::response_only(Message::MarketDataSnapshot { product: product.to_string(), order_book: snapshot })
}

fn handle_user_orders(state: &ServerState, user: &str, product: &str) -> Dispatched {
    let orders = state
        .products
        .book(product)
        .map(|book| book.orders_for_user(user))
        .unwrap_or_default();
    let payload = serde_json::to_value(orders).unwrap_or(serde_json::Value::Null);
    Dispatched::response_only(Message::CollateralReport { user_balance: payload })
}

fn handle_user_balance(state: &ServerState, user: &str, product: &str) -> Dispatched {
    let balance = state
        .products
        .book(product)
        .map(|book| book.balance_of(user))
        .unwrap_or_default();
    let payload = serde_json::to_value(balance).unwrap_or(serde_json::Value::Null);
    Dispatched::response_only(Message::CollateralReport { user_balance: payload })
}

fn handle_capture(state: &ServerState, product: &str, history_len: i64) -> Dispatched {
    let n = if history_len < 0 { None } else { Some(history_len as usize) };
    let history = state.products.history(product, n);
    Dispatched::response_only(Message::TradeCaptureReport { history })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::ProductManager;

    fn server() -> ServerState {
        ServerState::new(ProductManager::new(["ABC"]), UserRegistry::new(), FeeSchedule::zero_fee())
    }

    #[test]
    fn register_then_unknown_message_is_rejected() {
        let state = server();
        let dispatched = dispatch(&state, "ghost", Message::OrderCancelRequest { product: "ABC".into(), order_id: "1".into() });
        assert!(matches!(dispatched.response, Message::Reject { .. }));
    }

    #[test]
    fn s1_full_fill_end_to_end() {
        let state = server();
        let u1 = state.users.register("U1", 10_000);
        let u2 = state.users.register("U2", 10_000);

        let sell = dispatch(&state, &u1, Message::NewOrderSingle { product: "ABC".into(), side: Side::Sell, quantity: 5, price: 100 });
        assert!(matches!(sell.response, Message::ExecutionReport { exec_status: ExecStatus::New, .. }));

        let buy = dispatch(&state, &u2, Message::NewOrderSingle { product: "ABC".into(), side: Side::Buy, quantity: 5, price: 105 });
        match buy.response {
            Message::ExecutionReport { exec_status: ExecStatus::Filled, .. } => {}
            other => panic!("expected Filled, got {other:?}"),
        }

        let book = state.products.book("ABC").unwrap();
        assert_eq!(book.balance_of(&u1).balance, 500);
        assert_eq!(book.balance_of(&u1).volume, -5);
        assert_eq!(book.balance_of(&u2).balance, -500);
        assert_eq!(book.balance_of(&u2).volume, 5);
    }

    #[test]
    fn s6_risk_rejection_leaves_book_untouched() {
        let state = server();
        let user = state.users.register("U1", 499);
        let dispatched = dispatch(&state, &user, Message::NewOrderSingle { product: "ABC".into(), side: Side::Buy, quantity: 5, price: 100 });
        assert!(matches!(dispatched.response, Message::ExecutionReport { exec_status: ExecStatus::Rejected, .. }));
        let book = state.products.book("ABC").unwrap();
        assert!(book.best_bid().is_none());
    }

    #[test]
    fn cancel_unknown_order_returns_reject_not_panic() {
        let state = server();
        let user = state.users.register("U1", 1000);
        let dispatched = dispatch(&state, &user, Message::OrderCancelRequest { product: "ABC".into(), order_id: "999".into() });
        assert!(matches!(dispatched.response, Message::Reject { .. }));
    }

    #[test]
    fn init_liquidity_engine_seeds_budget_and_volume_bypassing_risk_checks() {
        let state = server();
        let maker = state.users.register("MM1", 0);

        let dispatched = dispatch(
            &state,
            &maker,
            Message::InitializeLiquidityEngine { product: "ABC".into(), budget: 10_000, volume: 500 },
        );
        assert!(matches!(dispatched.response, Message::CollateralReport { .. }));
        assert_eq!(state.users.budget_of(&maker), Some(10_000));

        let book = state.products.book("ABC").unwrap();
        assert_eq!(book.balance_of(&maker).volume, 500);

        // a sell that would otherwise fail post_sell_volume now succeeds.
        let sell = dispatch(&state, &maker, Message::NewOrderSingle { product: "ABC".into(), side: Side::Sell, quantity: 100, price: 100 });
        assert!(matches!(sell.response, Message::ExecutionReport { exec_status: ExecStatus::New, .. }));
    }

    #[test]
    fn rejected_new_order_does_not_charge_fee_or_increment_order_count() {
        let state = ServerState::new(ProductManager::new(["ABC"]), UserRegistry::new(), FeeSchedule::new(10, 0.0));
        let user = state.users.register("U1", 499);
        let before = state.users.budget_of(&user).unwrap();
        let dispatched = dispatch(&state, &user, Message::NewOrderSingle { product: "ABC".into(), side: Side::Buy, quantity: 5, price: 100 });
        assert!(matches!(dispatched.response, Message::ExecutionReport { exec_status: ExecStatus::Rejected, .. }));
        assert_eq!(state.users.budget_of(&user), Some(before));
    }
}
