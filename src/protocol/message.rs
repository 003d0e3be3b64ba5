//! Typed request/response bodies decoded from, or encoded to, the wire.

use crate::orderbook::{OrderBookSnapshot, Side};
use serde::{Deserialize, Serialize};

/// Client-submitted or server-emitted message body, independent of wire
/// framing.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    // --- client -> server -------------------------------------------------
    /// `A` RegisterRequest: user-name, starting budget.
    RegisterRequest { name: String, budget: i64 },
    /// `D` NewOrderSingle.
    NewOrderSingle {
        product: String,
        side: Side,
        quantity: u64,
        price: i64,
    },
    /// `F` OrderCancelRequest.
    OrderCancelRequest { product: String, order_id: String },
    /// `G` OrderModifyRequestQty.
    OrderModifyRequestQty {
        product: String,
        order_id: String,
        new_quantity: u64,
    },
    /// `H` OrderStatusRequest.
    OrderStatusRequest { product: String, order_id: String },
    /// `V` MarketDataRequest.
    MarketDataRequest { product: String, depth: i64 },
    /// `AF` UserOrderStatusRequest.
    UserOrderStatusRequest { product: String },
    /// `BB` UserBalanceRequest.
    UserBalanceRequest { product: String },
    /// `AD` CaptureReportRequest.
    CaptureReportRequest { product: String, history_len: i64 },
    /// `AL` InitializeLiquidityEngine: admin-style seed of a user's cash
    /// budget and per-product volume, bypassing the normal order/risk-check
    /// path. Used to bootstrap a liquidity-provider account before it
    /// starts quoting both sides of the book.
    InitializeLiquidityEngine { product: String, budget: i64, volume: i64 },

    // --- server -> client ---------------------------------------------------
    /// `AR` RegisterResponse: assigned user id.
    RegisterResponse { user_id: String },
    /// `8` ExecutionReport.
    ExecutionReport {
        order_id: String,
        exec_status: ExecStatus,
        side: Option<Side>,
        quantity: Option<u64>,
        price: Option<i64>,
    },
    /// `9` Reject.
    Reject { order_id: String, reason: String },
    /// `W` MarketDataSnapshot.
    MarketDataSnapshot { product: String, order_book: OrderBookSnapshot },
    /// `BA` CollateralReport.
    CollateralReport { user_balance: serde_json::Value },
    /// `AE` TradeCaptureReport.
    TradeCaptureReport { history: Vec<OrderBookSnapshot> },
}

/// Exec-status encoding from §6: `0`=New, `1`=Partially filled/Resting,
/// `2`=Filled, `4`=Canceled, `5`=Replaced, `8`=Rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecStatus {
    New,
    Resting,
    Filled,
    Canceled,
    Replaced,
    Rejected,
}

impl ExecStatus {
    pub fn to_wire(self) -> &'static str {
        use crate::protocol::header::ord_status::*;
        match self {
            ExecStatus::New => NEW,
            ExecStatus::Resting => RESTING,
            ExecStatus::Filled => FILLED,
            ExecStatus::Canceled => CANCELED,
            ExecStatus::Replaced => REPLACED,
            ExecStatus::Rejected => REJECTED,
        }
    }

    pub fn from_wire(tag: &str) -> Option<ExecStatus> {
        use crate::protocol::header::ord_status::*;
        match tag {
            NEW => Some(ExecStatus::New),
            RESTING => Some(ExecStatus::Resting),
            FILLED => Some(ExecStatus::Filled),
            CANCELED => Some(ExecStatus::Canceled),
            REPLACED => Some(ExecStatus::Replaced),
            REJECTED => Some(ExecStatus::Rejected),
            _ => None,
        }
    }
}

impl Message {
    /// The `MsgType` (tag 35) wire value for this body.
    pub fn msg_type(&self) -> &'static str {
        use crate::protocol::header::msg_type::*;
        match self {
            Message::RegisterRequest { .. } => REGISTER_REQUEST,
            Message::NewOrderSingle { .. } => NEW_ORDER_SINGLE,
            Message::OrderCancelRequest { .. } => ORDER_CANCEL_REQUEST,
            Message::OrderModifyRequestQty { .. } => ORDER_MODIFY_REQUEST_QTY,
            Message::OrderStatusRequest { .. } => ORDER_STATUS_REQUEST,
            Message::MarketDataRequest { .. } => MARKET_DATA_REQUEST,
            Message::UserOrderStatusRequest { .. } => USER_ORDER_STATUS_REQUEST,
            Message::UserBalanceRequest { .. } => USER_BALANCE_REQUEST,
            Message::CaptureReportRequest { .. } => CAPTURE_REPORT_REQUEST,
            Message::InitializeLiquidityEngine { .. } => INITIALIZE_LIQUIDITY_ENGINE,
            Message::RegisterResponse { .. } => REGISTER_RESPONSE,
            Message::ExecutionReport { .. } => EXECUTION_REPORT,
            Message::Reject { .. } => REJECT,
            Message::MarketDataSnapshot { .. } => MARKET_DATA_SNAPSHOT,
            Message::CollateralReport { .. } => COLLATERAL_REPORT,
            Message::TradeCaptureReport { .. } => TRADE_CAPTURE_REPORT,
        }
    }
}
