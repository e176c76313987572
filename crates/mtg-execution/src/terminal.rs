//! Terminal client capability interface.
//!
//! `TerminalClient` is the seam between the order engine and a concrete
//! terminal transport (in-process paper terminal, remote RPC proxy, mocks).
//! Every method mirrors one terminal operation. Methods take `&mut self`:
//! a terminal session is a single logical connection, and
//! [`crate::BrokerGateway`] is the only owner that hands out access to it.

use chrono::{DateTime, Utc};
use mtg_schemas::{
    AccountInfo, OrderSendResult, SymbolInfo, Tick, TradeDeal, TradeOrder, TradePosition,
    TradeRequest,
};

/// Convenience alias used throughout this module.
pub type TerminalResult<T> = std::result::Result<T, TerminalError>;

/// Diagnostic reported by the terminal (the `last_error()` pair) or by the
/// transport carrying calls to it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("terminal error {code}: {message}")]
pub struct TerminalError {
    pub code: i64,
    pub message: String,
}

impl TerminalError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Transport-level failure (no terminal diagnostic available).
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(-1, message)
    }
}

/// Operations the gateway consumes from a trading terminal.
pub trait TerminalClient {
    /// Establish (or confirm) the terminal session. Idempotent.
    fn initialize(&mut self) -> TerminalResult<()>;

    /// Most recent terminal diagnostic.
    fn last_error(&mut self) -> TerminalError;

    fn account_info(&mut self) -> TerminalResult<AccountInfo>;

    fn orders_get(&mut self) -> TerminalResult<Vec<TradeOrder>>;

    /// `None` if no live order carries this ticket.
    fn order_get(&mut self, ticket: u64) -> TerminalResult<Option<TradeOrder>>;

    fn positions_get(&mut self) -> TerminalResult<Vec<TradePosition>>;

    fn symbols_get(&mut self) -> TerminalResult<Vec<SymbolInfo>>;

    /// `None` if the terminal has no such symbol.
    fn symbol_info(&mut self, symbol: &str) -> TerminalResult<Option<SymbolInfo>>;

    /// Set the watch-list flag. `Ok(false)` means the terminal refused.
    fn symbol_select(&mut self, symbol: &str, visible: bool) -> TerminalResult<bool>;

    fn symbol_info_tick(&mut self, symbol: &str) -> TerminalResult<Option<Tick>>;

    fn history_deals_get(
        &mut self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> TerminalResult<Vec<TradeDeal>>;

    /// `Ok(None)` when the terminal produced no result record; consult
    /// [`TerminalClient::last_error`] for the reason.
    fn order_send(&mut self, request: &TradeRequest) -> TerminalResult<Option<OrderSendResult>>;
}

impl<T: TerminalClient + ?Sized> TerminalClient for Box<T> {
    fn initialize(&mut self) -> TerminalResult<()> {
        (**self).initialize()
    }

    fn last_error(&mut self) -> TerminalError {
        (**self).last_error()
    }

    fn account_info(&mut self) -> TerminalResult<AccountInfo> {
        (**self).account_info()
    }

    fn orders_get(&mut self) -> TerminalResult<Vec<TradeOrder>> {
        (**self).orders_get()
    }

    fn order_get(&mut self, ticket: u64) -> TerminalResult<Option<TradeOrder>> {
        (**self).order_get(ticket)
    }

    fn positions_get(&mut self) -> TerminalResult<Vec<TradePosition>> {
        (**self).positions_get()
    }

    fn symbols_get(&mut self) -> TerminalResult<Vec<SymbolInfo>> {
        (**self).symbols_get()
    }

    fn symbol_info(&mut self, symbol: &str) -> TerminalResult<Option<SymbolInfo>> {
        (**self).symbol_info(symbol)
    }

    fn symbol_select(&mut self, symbol: &str, visible: bool) -> TerminalResult<bool> {
        (**self).symbol_select(symbol, visible)
    }

    fn symbol_info_tick(&mut self, symbol: &str) -> TerminalResult<Option<Tick>> {
        (**self).symbol_info_tick(symbol)
    }

    fn history_deals_get(
        &mut self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> TerminalResult<Vec<TradeDeal>> {
        (**self).history_deals_get(from, to)
    }

    fn order_send(&mut self, request: &TradeRequest) -> TerminalResult<Option<OrderSendResult>> {
        (**self).order_send(request)
    }
}
