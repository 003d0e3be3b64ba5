//! FIX-like tag numbers and the standard message header.
//!
//! Tag numbers follow the subset of FIX 4.4 the reference gateway actually
//! used (see the `simplefix`-based encoder it was built on): a handful of
//! standard header tags plus the body tags each message type needs.

/// `BeginString` -- protocol version, always [`VERSION`].
pub const TAG_BEGIN_STRING: u32 = 8;
/// `BodyLength`.
pub const TAG_BODY_LENGTH: u32 = 9;
/// `TargetCompID`.
pub const TAG_TARGET_COMP_ID: u32 = 56;
/// `SenderCompID`.
pub const TAG_SENDER_COMP_ID: u32 = 49;
/// `SendingTime`, microsecond UTC.
pub const TAG_SENDING_TIME: u32 = 52;
/// `MsgSeqNum`.
pub const TAG_MSG_SEQ_NUM: u32 = 34;
/// `MsgType`.
pub const TAG_MSG_TYPE: u32 = 35;
/// `ClOrdID` -- client/server-assigned order id.
pub const TAG_CL_ORD_ID: u32 = 41;
/// `Side`: `1`=Buy, `2`=Sell.
pub const TAG_SIDE: u32 = 54;
/// `OrderQty`.
pub const TAG_ORDER_QTY: u32 = 38;
/// `Price`.
pub const TAG_PRICE: u32 = 44;
/// `Symbol` -- used as the product identifier.
pub const TAG_SYMBOL: u32 = 55;
/// `SubscriptionRequestType`.
pub const TAG_SUBSCRIPTION_REQUEST_TYPE: u32 = 263;
/// `MarketDepth`.
pub const TAG_MARKET_DEPTH: u32 = 264;
/// `MassStatusReqType`.
pub const TAG_MASS_STATUS_REQ_TYPE: u32 = 585;
/// `PartyID`.
pub const TAG_PARTY_ID: u32 = 448;
/// `TradeRequestID` -- repurposed to carry the requested history length.
pub const TAG_TRADE_REQUEST_ID: u32 = 568;
/// `TradeRequestType`.
pub const TAG_TRADE_REQUEST_TYPE: u32 = 569;
/// `Text` -- carries a JSON payload body for the snapshot/report messages.
pub const TAG_TEXT: u32 = 58;
/// `ExecType`.
pub const TAG_EXEC_TYPE: u32 = 150;
/// `OrdStatus`.
pub const TAG_ORD_STATUS: u32 = 39;
/// `OrderID` -- server-assigned, distinct from the client's `ClOrdID`.
pub const TAG_ORDER_ID: u32 = 37;
/// `LeavesQty`.
pub const TAG_LEAVES_QTY: u32 = 151;
/// `CollStatus`.
pub const TAG_COLL_STATUS: u32 = 910;
/// `Username` -- carries the display name on `RegisterRequest`.
pub const TAG_USERNAME: u32 = 553;
/// `CumQty` -- repurposed to carry the initial position volume seeded by
/// `InitializeLiquidityEngine`; no direct source-of-truth tag exists for
/// this admin-only operation (see DESIGN.md's Open Questions).
pub const TAG_CUM_QTY: u32 = 14;
/// `CheckSum`, FIX trailer.
pub const TAG_CHECKSUM: u32 = 10;

/// Protocol version string carried in every message's `BeginString`.
pub const VERSION: &str = "FIX.4.4";

/// `OrdStatus`/`ExecType` values used by exec reports (§6 exec-status
/// encoding): new, partially filled/resting, filled, canceled, replaced,
/// rejected.
pub mod ord_status {
    pub const NEW: &str = "0";
    pub const RESTING: &str = "1";
    pub const FILLED: &str = "2";
    pub const CANCELED: &str = "4";
    pub const REPLACED: &str = "5";
    pub const REJECTED: &str = "8";
}

/// `MsgType` (tag 35) values for every message in the catalogue.
pub mod msg_type {
    pub const REGISTER_REQUEST: &str = "A";
    pub const REGISTER_RESPONSE: &str = "AR";
    pub const NEW_ORDER_SINGLE: &str = "D";
    pub const ORDER_CANCEL_REQUEST: &str = "F";
    pub const ORDER_MODIFY_REQUEST_QTY: &str = "G";
    pub const ORDER_STATUS_REQUEST: &str = "H";
    pub const MARKET_DATA_REQUEST: &str = "V";
    pub const USER_ORDER_STATUS_REQUEST: &str = "AF";
    pub const USER_BALANCE_REQUEST: &str = "BB";
    pub const CAPTURE_REPORT_REQUEST: &str = "AD";
    pub const INITIALIZE_LIQUIDITY_ENGINE: &str = "AL";
    pub const EXECUTION_REPORT: &str = "8";
    pub const REJECT: &str = "9";
    pub const MARKET_DATA_SNAPSHOT: &str = "W";
    pub const COLLATERAL_REPORT: &str = "BA";
    pub const TRADE_CAPTURE_REPORT: &str = "AE";
}

/// Standard header fields every encoded message carries ahead of its
/// type-specific body.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub sender: String,
    pub target: String,
    pub sending_time_micros: u64,
    pub seq_num: u64,
    pub msg_type: String,
}
