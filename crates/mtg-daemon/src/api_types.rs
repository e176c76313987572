//! Request and response types for all mtg-daemon HTTP endpoints.
//!
//! Request bodies accept the field spellings existing automation clients
//! send (`size` for `volume`, `type` for `order_type`). Conversion into
//! engine values lives here; no terminal access does.

use mtg_execution::{
    CloseAllItem, CloseRequest, CloseTarget, OrderIntent, Side, SymbolQuote, TradeId,
};
use mtg_schemas::{AccountInfo, OrderSendResult, SymbolInfo, TradeRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// /ping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct PingResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    /// Hash of the effective configuration, when loaded from layers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,
}

// ---------------------------------------------------------------------------
// /check_balance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub balance: f64,
    pub equity: f64,
    pub margin: f64,
    pub free_margin: f64,
}

impl From<&AccountInfo> for BalanceResponse {
    fn from(a: &AccountInfo) -> Self {
        Self {
            balance: a.balance,
            equity: a.equity,
            margin: a.margin,
            free_margin: a.margin_free,
        }
    }
}

// ---------------------------------------------------------------------------
// /symbol_info
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SymbolQuery {
    pub symbol: Option<String>,
}

/// Symbol record plus whether its quote went live within the retry budget.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolInfoResponse {
    #[serde(flatten)]
    pub info: SymbolInfo,
    pub quote_settled: bool,
    pub quote_retries: u32,
}

impl From<SymbolQuote> for SymbolInfoResponse {
    fn from(q: SymbolQuote) -> Self {
        Self {
            info: q.info,
            quote_settled: q.quote_settled,
            quote_retries: q.retries,
        }
    }
}

// ---------------------------------------------------------------------------
// /order_history
// ---------------------------------------------------------------------------

/// Dates are `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    pub from_date: Option<String>,
    pub to_date: Option<String>,
}

// ---------------------------------------------------------------------------
// /start_order
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct StartOrderRequest {
    pub symbol: String,
    #[serde(alias = "size")]
    pub volume: f64,
    /// `"buy"` / `"sell"` (any case) or a terminal order type number.
    /// Required: a body without a side is rejected.
    #[serde(alias = "type")]
    pub order_type: Side,
    pub stop_loss: Option<f64>,
    /// Take-profit level.
    pub stop_profit: Option<f64>,
    pub filling_mode: Option<i64>,
    pub strategy: Option<String>,
    pub trade_id: Option<TradeId>,
}

impl StartOrderRequest {
    pub fn into_intent(self) -> OrderIntent {
        OrderIntent {
            symbol: self.symbol,
            side: self.order_type,
            volume: self.volume,
            stop_loss: self.stop_loss,
            take_profit: self.stop_profit,
            fill_mode: self.filling_mode,
            strategy: self.strategy.filter(|s| !s.trim().is_empty()),
            trade_id: self.trade_id.filter(|t| !t.is_empty()),
        }
    }
}

// ---------------------------------------------------------------------------
// /end_order
// ---------------------------------------------------------------------------

/// Either `trade_id` or `ticket` must be present; `trade_id` wins when both
/// are. `symbol` and `entry_action` are cross-checked against the live record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndOrderRequest {
    pub symbol: Option<String>,
    pub entry_action: Option<Side>,
    pub volume: Option<f64>,
    pub ticket: Option<u64>,
    pub trade_id: Option<TradeId>,
    pub filling_mode: Option<i64>,
}

impl EndOrderRequest {
    pub fn into_close(self) -> Result<CloseRequest, String> {
        let target = match (self.trade_id.filter(|t| !t.is_empty()), self.ticket) {
            (Some(id), _) => CloseTarget::TradeId(id),
            (None, Some(ticket)) => CloseTarget::Ticket(ticket),
            (None, None) => return Err("either ticket or trade_id is required".to_string()),
        };
        Ok(CloseRequest {
            target,
            volume: self.volume,
            fill_mode: self.filling_mode,
            expected_symbol: self.symbol.filter(|s| !s.trim().is_empty()),
            expected_side: self.entry_action,
        })
    }
}

// ---------------------------------------------------------------------------
// /cancel_order
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CancelOrderRequest {
    pub ticket: u64,
}

// ---------------------------------------------------------------------------
// Order results
// ---------------------------------------------------------------------------

/// Accepted submission: the broker's record and the request as sent.
#[derive(Debug, Clone, Serialize)]
pub struct OrderResponse {
    pub result: OrderSendResult,
    pub request: TradeRequest,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CloseAllResponse {
    Closed { closed_positions: Vec<CloseAllItem> },
    Empty { message: &'static str },
}

#[derive(Debug, Clone, Serialize)]
pub struct ClearWatchesResponse {
    pub removed: Vec<String>,
    pub failed: Vec<String>,
    pub message: String,
}

// ---------------------------------------------------------------------------
// /webhook_log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct WebhookLogResponse {
    pub status: &'static str,
    pub data: Value,
}

// ---------------------------------------------------------------------------
// /trades
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct TradeEntry {
    pub trade_id: TradeId,
    pub ticket: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TradesResponse {
    pub trades: Vec<TradeEntry>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable failure class.
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retcode: Option<u32>,
    /// Verbatim broker record for rejected submissions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<OrderSendResult>,
    /// Terminal diagnostic code, when the failure came from the terminal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal_code: Option<i64>,
}
