//! Stateful FIX-like encoder/decoder: tag=value pairs, SOH-delimited,
//! framed with a `BodyLength`/`CheckSum` trailer so a stream of arbitrary
//! byte chunks can be split back into discrete messages.

use super::header::{self, msg_type, Header, TAG_BEGIN_STRING, TAG_BODY_LENGTH, TAG_CHECKSUM, VERSION};
use super::message::{ExecStatus, Message};
use crate::orderbook::{OrderBookSnapshot, Side};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

const SOH: u8 = 0x01;

/// Errors produced while decoding a wire message. Per the error-handling
/// design, a decode failure never touches book state; the dispatcher turns
/// this into a `Reject`.
#[derive(Debug, PartialEq)]
pub enum CodecError {
    MissingTag(u32),
    UnknownMsgType(String),
    InvalidValue { tag: u32, value: String },
    ChecksumMismatch,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::MissingTag(tag) => write!(f, "missing required tag {tag}"),
            CodecError::UnknownMsgType(t) => write!(f, "unknown msg type {t}"),
            CodecError::InvalidValue { tag, value } => write!(f, "invalid value for tag {tag}: {value}"),
            CodecError::ChecksumMismatch => write!(f, "checksum mismatch"),
        }
    }
}

impl std::error::Error for CodecError {}

/// A decoded message together with the header fields it arrived with.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub header: Header,
    pub body: Message,
}

/// Stateful codec: tracks outgoing `sender`/`target`/sequence number and
/// buffers partial input across [`Codec::push`] calls.
pub struct Codec {
    sender: String,
    target: String,
    seq_num: AtomicU64,
    buffer: Vec<u8>,
}

impl Codec {
    pub fn new(sender: impl Into<String>, target: impl Into<String>) -> Self {
        Codec {
            sender: sender.into(),
            target: target.into(),
            seq_num: AtomicU64::new(0),
            buffer: Vec::new(),
        }
    }

    fn next_seq_num(&self) -> u64 {
        self.seq_num.fetch_add(1, Ordering::Relaxed)
    }

    /// Encode `body` into a complete, self-delimited wire message using
    /// this codec's sender/target and the next sequence number.
    pub fn encode(&self, body: &Message, sending_time_micros: u64) -> Vec<u8> {
        let seq_num = self.next_seq_num();
        let mut fields: Vec<(u32, String)> = Vec::new();
        fields.push((header::TAG_TARGET_COMP_ID, self.target.clone()));
        fields.push((header::TAG_SENDER_COMP_ID, self.sender.clone()));
        fields.push((header::TAG_SENDING_TIME, sending_time_micros.to_string()));
        fields.push((header::TAG_MSG_SEQ_NUM, seq_num.to_string()));
        fields.push((header::TAG_MSG_TYPE, body.msg_type().to_string()));
        encode_body(body, &mut fields);
        render(&fields)
    }

    /// Feed `bytes` into the internal buffer and attempt to decode one
    /// complete message. Returns `None` if the buffer does not yet contain
    /// a full, checksum-terminated message; callers should keep pushing
    /// more bytes and calling `push` (with an empty slice is fine) until a
    /// message is produced.
    pub fn push(&mut self, bytes: &[u8]) -> Option<Result<Decoded, CodecError>> {
        self.buffer.extend_from_slice(bytes);
        let end = find_message_end(&self.buffer)?;
        let message_bytes: Vec<u8> = self.buffer.drain(..end).collect();
        Some(decode(&message_bytes))
    }
}

fn find_message_end(buf: &[u8]) -> Option<usize> {
    let needle = b"10=";
    let mut i = 0;
    while i + needle.len() <= buf.len() {
        if &buf[i..i + needle.len()] == needle && (i == 0 || buf[i - 1] == SOH) {
            if let Some(rel) = buf[i..].iter().position(|&b| b == SOH) {
                return Some(i + rel + 1);
            }
        }
        i += 1;
    }
    None
}

fn parse_fields(bytes: &[u8]) -> HashMap<u32, String> {
    let mut fields = HashMap::new();
    for pair in bytes.split(|&b| b == SOH) {
        if pair.is_empty() {
            continue;
        }
        if let Some(eq) = pair.iter().position(|&b| b == b'=') {
            if let (Ok(tag_str), Ok(value)) = (
                std::str::from_utf8(&pair[..eq]),
                std::str::from_utf8(&pair[eq + 1..]),
            ) {
                if let Ok(tag) = tag_str.parse::<u32>() {
                    fields.insert(tag, value.to_string());
                }
            }
        }
    }
    fields
}

fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

fn render(fields: &[(u32, String)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (tag, value) in fields {
        body.extend_from_slice(tag.to_string().as_bytes());
        body.push(b'=');
        body.extend_from_slice(value.as_bytes());
        body.push(SOH);
    }

    let mut out = Vec::new();
    let begin = format!("{TAG_BEGIN_STRING}={VERSION}\x01");
    let body_length = format!("{TAG_BODY_LENGTH}={}\x01", body.len());
    out.extend_from_slice(begin.as_bytes());
    out.extend_from_slice(body_length.as_bytes());
    out.extend_from_slice(&body);

    let sum = checksum(&out) as u32 % 256;
    let trailer = format!("{TAG_CHECKSUM}={sum:03}\x01");
    out.extend_from_slice(trailer.as_bytes());
    out
}

fn encode_body(body: &Message, fields: &mut Vec<(u32, String)>) {
    use header::*;
    match body {
        Message::RegisterRequest { name, budget } => {
            fields.push((TAG_USERNAME, name.clone()));
            fields.push((TAG_TEXT, budget.to_string()));
        }
        Message::NewOrderSingle { product, side, quantity, price } => {
            fields.push((TAG_SIDE, side.to_wire().to_string()));
            fields.push((TAG_ORDER_QTY, quantity.to_string()));
            fields.push((TAG_PRICE, price.to_string()));
            fields.push((TAG_SYMBOL, product.clone()));
        }
        Message::OrderCancelRequest { product, order_id } => {
            fields.push((TAG_CL_ORD_ID, order_id.clone()));
            fields.push((TAG_SYMBOL, product.clone()));
        }
        Message::OrderModifyRequestQty { product, order_id, new_quantity } => {
            fields.push((TAG_CL_ORD_ID, order_id.clone()));
            fields.push((TAG_ORDER_QTY, new_quantity.to_string()));
            fields.push((TAG_SYMBOL, product.clone()));
        }
        Message::OrderStatusRequest { product, order_id } => {
            fields.push((TAG_CL_ORD_ID, order_id.clone()));
            fields.push((TAG_SYMBOL, product.clone()));
        }
        Message::MarketDataRequest { product, depth } => {
            fields.push((TAG_SUBSCRIPTION_REQUEST_TYPE, "0".to_string()));
            fields.push((TAG_MARKET_DEPTH, depth.to_string()));
            fields.push((TAG_SYMBOL, product.clone()));
        }
        Message::UserOrderStatusRequest { product } => {
            fields.push((TAG_MASS_STATUS_REQ_TYPE, "8".to_string()));
            fields.push((TAG_SYMBOL, product.clone()));
        }
        Message::UserBalanceRequest { product } => {
            fields.push((TAG_SYMBOL, product.clone()));
        }
        Message::CaptureReportRequest { product, history_len } => {
            fields.push((TAG_SYMBOL, product.clone()));
            fields.push((TAG_TRADE_REQUEST_ID, history_len.to_string()));
            fields.push((TAG_TRADE_REQUEST_TYPE, "0".to_string()));
        }
        Message::InitializeLiquidityEngine { product, budget, volume } => {
            fields.push((TAG_SYMBOL, product.clone()));
            fields.push((TAG_TEXT, budget.to_string()));
            fields.push((TAG_CUM_QTY, volume.to_string()));
        }
        Message::RegisterResponse { user_id } => {
            fields.push((TAG_PARTY_ID, user_id.clone()));
        }
        Message::ExecutionReport { order_id, exec_status, side, quantity, price } => {
            fields.push((TAG_ORDER_ID, order_id.clone()));
            fields.push((TAG_EXEC_TYPE, exec_status.to_wire().to_string()));
            fields.push((TAG_ORD_STATUS, exec_status.to_wire().to_string()));
            if let Some(side) = side {
                fields.push((TAG_SIDE, side.to_wire().to_string()));
            }
            if let Some(quantity) = quantity {
                fields.push((TAG_LEAVES_QTY, quantity.to_string()));
            }
            if let Some(price) = price {
                fields.push((TAG_PRICE, price.to_string()));
            }
        }
        Message::Reject { order_id, reason } => {
            fields.push((TAG_ORDER_ID, order_id.clone()));
            fields.push((TAG_TEXT, reason.clone()));
        }
        Message::MarketDataSnapshot { product, order_book } => {
            fields.push((TAG_SYMBOL, product.clone()));
            fields.push((TAG_TEXT, serde_json::to_string(order_book).unwrap_or_default()));
        }
        Message::CollateralReport { user_balance } => {
            fields.push((TAG_COLL_STATUS, "3".to_string()));
            fields.push((TAG_TEXT, user_balance.to_string()));
        }
        Message::TradeCaptureReport { history } => {
            fields.push((TAG_TEXT, serde_json::to_string(history).unwrap_or_default()));
        }
    }
}

fn get<'a>(fields: &'a HashMap<u32, String>, tag: u32) -> Result<&'a str, CodecError> {
    fields.get(&tag).map(|s| s.as_str()).ok_or(CodecError::MissingTag(tag))
}

fn parse_i64(fields: &HashMap<u32, String>, tag: u32) -> Result<i64, CodecError> {
    let raw = get(fields, tag)?;
    raw.parse().map_err(|_| CodecError::InvalidValue { tag, value: raw.to_string() })
}

fn parse_u64(fields: &HashMap<u32, String>, tag: u32) -> Result<u64, CodecError> {
    let raw = get(fields, tag)?;
    raw.parse().map_err(|_| CodecError::InvalidValue { tag, value: raw.to_string() })
}

fn parse_side(fields: &HashMap<u32, String>) -> Result<Side, CodecError> {
    let raw = get(fields, header::TAG_SIDE)?;
    let tag: u8 = raw.parse().map_err(|_| CodecError::InvalidValue { tag: header::TAG_SIDE, value: raw.to_string() })?;
    Side::from_wire(tag).ok_or(CodecError::InvalidValue { tag: header::TAG_SIDE, value: raw.to_string() })
}

fn decode(message_bytes: &[u8]) -> Result<Decoded, CodecError> {
    let fields = parse_fields(message_bytes);

    if let Some(recorded) = fields.get(&TAG_CHECKSUM) {
        let checksum_tag = format!("{TAG_CHECKSUM}=");
        if let Some(pos) = find_subslice(message_bytes, checksum_tag.as_bytes()) {
            let computed = checksum(&message_bytes[..pos]) as u32 % 256;
            let recorded_num: u32 = recorded.parse().unwrap_or(u32::MAX);
            if computed != recorded_num {
                return Err(CodecError::ChecksumMismatch);
            }
        }
    }

    let sender = fields.get(&header::TAG_SENDER_COMP_ID).cloned().unwrap_or_default();
    let target = fields.get(&header::TAG_TARGET_COMP_ID).cloned().unwrap_or_default();
    let sending_time_micros = fields
        .get(&header::TAG_SENDING_TIME)
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let seq_num = fields.get(&header::TAG_MSG_SEQ_NUM).and_then(|v| v.parse().ok()).unwrap_or(0);
    let msg_type_tag = get(&fields, header::TAG_MSG_TYPE)?.to_string();

    let body = decode_body(&msg_type_tag, &fields)?;

    Ok(Decoded {
        header: Header {
            sender,
            target,
            sending_time_micros,
            seq_num,
            msg_type: msg_type_tag,
        },
        body,
    })
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn decode_body(msg_type: &str, fields: &HashMap<u32, String>) -> Result<Message, CodecError> {
    use header::*;
    match msg_type {
        t if t == msg_type::REGISTER_REQUEST => Ok(Message::RegisterRequest {
            name: get(fields, TAG_USERNAME)?.to_string(),
            budget: parse_i64(fields, TAG_TEXT)?,
        }),
        t if t == msg_type::NEW_ORDER_SINGLE => Ok(Message::NewOrderSingle {
            product: get(fields, TAG_SYMBOL)?.to_string(),
            side: parse_side(fields)?,
            quantity: parse_u64(fields, TAG_ORDER_QTY)?,
            price: parse_i64(fields, TAG_PRICE)?,
        }),
        t if t == msg_type::ORDER_CANCEL_REQUEST => Ok(Message::OrderCancelRequest {
            product: get(fields, TAG_SYMBOL)?.to_string(),
            order_id: get(fields, TAG_CL_ORD_ID)?.to_string(),
        }),
        t if t == msg_type::ORDER_MODIFY_REQUEST_QTY => Ok(Message::OrderModifyRequestQty {
            product: get(fields, TAG_SYMBOL)?.to_string(),
            order_id: get(fields, TAG_CL_ORD_ID)?.to_string(),
            new_quantity: parse_u64(fields, TAG_ORDER_QTY)?,
        }),
        t if t == msg_type::ORDER_STATUS_REQUEST => Ok(Message::OrderStatusRequest {
            product: get(fields, TAG_SYMBOL)?.to_string(),
            order_id: get(fields, TAG_CL_ORD_ID)?.to_string(),
        }),
        t if t == msg_type::MARKET_DATA_REQUEST => Ok(Message::MarketDataRequest {
            product: get(fields, TAG_SYMBOL)?.to_string(),
            depth: parse_i64(fields, TAG_MARKET_DEPTH)?,
        }),
        t if t == msg_type::USER_ORDER_STATUS_REQUEST => Ok(Message::UserOrderStatusRequest {
            product: get(fields, TAG_SYMBOL)?.to_string(),
        }),
        t if t == msg_type::USER_BALANCE_REQUEST => Ok(Message::UserBalanceRequest {
            product: get(fields, TAG_SYMBOL)?.to_string(),
        }),
        t if t == msg_type::CAPTURE_REPORT_REQUEST => Ok(Message::CaptureReportRequest {
            product: get(fields, TAG_SYMBOL)?.to_string(),
            history_len: parse_i64(fields, TAG_TRADE_REQUEST_ID)?,
        }),
        t if t == msg_type::INITIALIZE_LIQUIDITY_ENGINE => Ok(Message::InitializeLiquidityEngine {
            product: get(fields, TAG_SYMBOL)?.to_string(),
            budget: parse_i64(fields, TAG_TEXT)?,
            volume: parse_i64(fields, TAG_CUM_QTY)?,
        }),
        t if t == msg_type::REGISTER_RESPONSE => Ok(Message::RegisterResponse {
            user_id: get(fields, TAG_PARTY_ID)?.to_string(),
        }),
        t if t == msg_type::EXECUTION_REPORT => Ok(Message::ExecutionReport {
            order_id: get(fields, TAG_ORDER_ID)?.to_string(),
            exec_status: ExecStatus::from_wire(get(fields, TAG_ORD_STATUS)?)
                .ok_or_else(|| CodecError::InvalidValue { tag: TAG_ORD_STATUS, value: get(fields, TAG_ORD_STATUS).unwrap_or("").to_string() })?,
            side: fields.get(&TAG_SIDE).and_then(|v| v.parse::<u8>().ok()).and_then(Side::from_wire),
            quantity: fields.get(&TAG_LEAVES_QTY).and_then(|v| v.parse().ok()),
            price: fields.get(&TAG_PRICE).and_then(|v| v.parse().ok()),
        }),
        t if t == msg_type::REJECT => Ok(Message::Reject {
            order_id: get(fields, TAG_ORDER_ID)?.to_string(),
            reason: fields.get(&TAG_TEXT).cloned().unwrap_or_default(),
        }),
        t if t == msg_type::MARKET_DATA_SNAPSHOT => {
            let order_book: OrderBookSnapshot =
                serde_json::from_str(get(fields, TAG_TEXT)?).map_err(|_| CodecError::InvalidValue { tag: TAG_TEXT, value: "order_book".to_string() })?;
            Ok(Message::MarketDataSnapshot {
                product: get(fields, TAG_SYMBOL)?.to_string(),
                order_book,
            })
        }
        t if t == msg_type::COLLATERAL_REPORT => {
            let user_balance: serde_json::Value =
                serde_json::from_str(get(fields, TAG_TEXT)?).map_err(|_| CodecError::InvalidValue { tag: TAG_TEXT, value: "user_balance".to_string() })?;
            Ok(Message::CollateralReport { user_balance })
        }
        t if t == msg_type::TRADE_CAPTURE_REPORT => {
            let history: Vec<OrderBookSnapshot> =
                serde_json::from_str(get(fields, TAG_TEXT)?).map_err(|_| CodecError::InvalidValue { tag: TAG_TEXT, value: "history".to_string() })?;
            Ok(Message::TradeCaptureReport { history })
        }
        other => Err(CodecError::UnknownMsgType(other.to_string())),
    }
}
