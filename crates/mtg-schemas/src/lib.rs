//! mtg-schemas
//!
//! Record types exchanged with the trading terminal, plus the protocol
//! constants the order engine needs to shape requests.
//!
//! Every record keeps unknown terminal fields in `extra` so the daemon can
//! return the full broker record to callers even when this crate only models
//! a subset of it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod consts;
mod wire;

pub use wire::{is_fractional_literal, WireF64, WireNumberError};

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub login: u64,
    pub balance: f64,
    pub equity: f64,
    pub margin: f64,
    pub margin_free: f64,
    #[serde(default)]
    pub margin_level: f64,
    #[serde(default)]
    pub profit: f64,
    #[serde(default)]
    pub leverage: u32,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub server: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Symbols and quotes
// ---------------------------------------------------------------------------

/// Symbol specification as reported by the terminal.
///
/// `visible` is the watch-list flag. It is owned by the terminal and may be
/// flipped by any other consumer of the same terminal session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub name: String,
    pub visible: bool,
    #[serde(default)]
    pub select: bool,
    pub bid: f64,
    pub ask: f64,
    #[serde(default)]
    pub digits: u32,
    #[serde(default)]
    pub point: f64,
    #[serde(default)]
    pub volume_min: f64,
    #[serde(default)]
    pub volume_max: f64,
    #[serde(default)]
    pub volume_step: f64,
    #[serde(default)]
    pub trade_contract_size: f64,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Timestamped bid/ask snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub time: i64,
    pub bid: f64,
    pub ask: f64,
    #[serde(default)]
    pub last: f64,
    #[serde(default)]
    pub volume: u64,
    #[serde(default)]
    pub time_msc: i64,
}

impl Tick {
    /// Both sides zero: the terminal is not streaming this symbol yet.
    pub fn is_degenerate(&self) -> bool {
        self.bid == 0.0 && self.ask == 0.0
    }
}

// ---------------------------------------------------------------------------
// Orders, positions, deals
// ---------------------------------------------------------------------------

/// A live (usually pending) order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeOrder {
    pub ticket: u64,
    pub symbol: String,
    #[serde(rename = "type")]
    pub order_type: u32,
    #[serde(default)]
    pub state: u32,
    #[serde(default)]
    pub time_setup: i64,
    #[serde(default)]
    pub volume_initial: f64,
    pub volume_current: f64,
    #[serde(default)]
    pub price_open: f64,
    #[serde(default)]
    pub sl: f64,
    #[serde(default)]
    pub tp: f64,
    #[serde(default)]
    pub price_current: f64,
    #[serde(default)]
    pub magic: u64,
    #[serde(default)]
    pub position_id: u64,
    #[serde(default)]
    pub comment: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An open position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradePosition {
    pub ticket: u64,
    pub symbol: String,
    #[serde(rename = "type")]
    pub position_type: u32,
    pub volume: f64,
    #[serde(default)]
    pub time: i64,
    #[serde(default)]
    pub price_open: f64,
    #[serde(default)]
    pub price_current: f64,
    #[serde(default)]
    pub sl: f64,
    #[serde(default)]
    pub tp: f64,
    #[serde(default)]
    pub profit: f64,
    #[serde(default)]
    pub magic: u64,
    #[serde(default)]
    pub identifier: u64,
    #[serde(default)]
    pub comment: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A historical deal (execution).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeDeal {
    pub ticket: u64,
    pub order: u64,
    pub time: i64,
    #[serde(rename = "type")]
    pub deal_type: u32,
    #[serde(default)]
    pub entry: u32,
    #[serde(default)]
    pub position_id: u64,
    pub symbol: String,
    pub volume: f64,
    pub price: f64,
    #[serde(default)]
    pub commission: f64,
    #[serde(default)]
    pub swap: f64,
    #[serde(default)]
    pub profit: f64,
    #[serde(default)]
    pub magic: u64,
    #[serde(default)]
    pub comment: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Trade request / result
// ---------------------------------------------------------------------------

/// Broker trade request, shaped exactly as the terminal's `order_send` expects.
///
/// Volume and price fields are [`WireF64`], so they always serialize as
/// fractional numbers. Absent optional fields are omitted from the payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeRequest {
    pub action: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<WireF64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub order_type: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<WireF64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sl: Option<WireF64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tp: Option<WireF64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deviation: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magic: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_filling: Option<u32>,
    /// Position ticket a closing deal acts on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u64>,
    /// Order ticket a removal acts on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u64>,
}

/// Result record of `order_send`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderSendResult {
    pub retcode: u32,
    #[serde(default)]
    pub deal: u64,
    #[serde(default)]
    pub order: u64,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub bid: f64,
    #[serde(default)]
    pub ask: f64,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub request_id: u64,
    #[serde(default)]
    pub retcode_external: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OrderSendResult {
    /// `true` for the return codes the gateway treats as an accepted request.
    pub fn is_success(&self) -> bool {
        consts::is_success_retcode(self.retcode)
    }
}
