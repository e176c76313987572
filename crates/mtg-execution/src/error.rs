//! Failure taxonomy of the order engine.
//!
//! Every variant is caller-visible; none is swallowed. The daemon maps each
//! variant to an HTTP status via [`GatewayError::kind`].

use mtg_schemas::{OrderSendResult, WireNumberError};

use crate::terminal::TerminalError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    /// The terminal session could not be initialized. Never retried here.
    #[error("broker unavailable: {0}")]
    BrokerUnavailable(TerminalError),

    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The symbol exists but the terminal refused to add it to the watch list.
    #[error("Failed to add symbol {0} to Market Watch")]
    SymbolSelectFailed(String),

    /// Neither the ticket nor the trade identifier resolves to a live
    /// position or order.
    #[error("Trade not found: {0}")]
    TradeNotFound(String),

    #[error("Order not found: {0}")]
    OrderNotFound(u64),

    /// No usable quote (missing, or both sides zero). Retryable.
    #[error("quote unavailable for {0}")]
    QuoteUnavailable(String),

    /// The terminal answered with a non-success return code.
    #[error("broker rejected request: retcode {retcode} ({comment})")]
    BrokerRejected {
        retcode: u32,
        comment: String,
        result: Box<OrderSendResult>,
    },

    /// `order_send` produced no result record.
    #[error("order send returned no result: {0}")]
    NoResult(TerminalError),

    /// Any other terminal call failure.
    #[error(transparent)]
    Terminal(#[from] TerminalError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    /// Stable machine-readable name, used in error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::BrokerUnavailable(_) => "broker_unavailable",
            GatewayError::SymbolNotFound(_) => "symbol_not_found",
            GatewayError::SymbolSelectFailed(_) => "symbol_select_failed",
            GatewayError::TradeNotFound(_) => "trade_not_found",
            GatewayError::OrderNotFound(_) => "order_not_found",
            GatewayError::QuoteUnavailable(_) => "quote_unavailable",
            GatewayError::BrokerRejected { .. } => "broker_rejected",
            GatewayError::NoResult(_) => "no_result",
            GatewayError::Terminal(_) => "terminal_error",
            GatewayError::InvalidRequest(_) => "invalid_request",
        }
    }
}

impl From<WireNumberError> for GatewayError {
    fn from(e: WireNumberError) -> Self {
        GatewayError::InvalidRequest(e.to_string())
    }
}
