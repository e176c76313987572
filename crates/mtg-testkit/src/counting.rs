//! Call-counting terminal wrapper.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use mtg_execution::{TerminalClient, TerminalError, TerminalResult};
use mtg_schemas::{
    AccountInfo, OrderSendResult, SymbolInfo, Tick, TradeDeal, TradeOrder, TradePosition,
    TradeRequest,
};

#[derive(Debug, Default)]
struct LogState {
    calls: BTreeMap<&'static str, usize>,
    in_flight: usize,
    max_in_flight: usize,
    sends: usize,
    /// Zero-based `order_send` attempts that produce no result.
    failing_sends: BTreeSet<usize>,
}

/// Shared view of what a [`CountingTerminal`] saw. Clone freely.
#[derive(Clone, Debug, Default)]
pub struct CallLog {
    state: Arc<Mutex<LogState>>,
}

impl CallLog {
    fn lock(&self) -> MutexGuard<'_, LogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn count(&self, op: &str) -> usize {
        self.lock().calls.get(op).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.lock().calls.values().sum()
    }

    /// Highest number of terminal calls ever observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.lock().max_in_flight
    }

    /// Make the `n`th (zero-based) `order_send` return no result record.
    pub fn fail_send(&self, n: usize) {
        self.lock().failing_sends.insert(n);
    }

    fn enter(&self, op: &'static str) {
        let mut s = self.lock();
        *s.calls.entry(op).or_insert(0) += 1;
        s.in_flight += 1;
        s.max_in_flight = s.max_in_flight.max(s.in_flight);
    }

    fn leave(&self) {
        let mut s = self.lock();
        s.in_flight = s.in_flight.saturating_sub(1);
    }

    fn next_send_fails(&self) -> bool {
        let mut s = self.lock();
        let n = s.sends;
        s.sends += 1;
        s.failing_sends.contains(&n)
    }
}

/// Wraps a terminal, recording every call in a [`CallLog`].
pub struct CountingTerminal<T> {
    inner: T,
    log: CallLog,
    delay: Duration,
}

impl<T: TerminalClient> CountingTerminal<T> {
    pub fn new(inner: T) -> (Self, CallLog) {
        let log = CallLog::default();
        (
            Self {
                inner,
                log: log.clone(),
                delay: Duration::ZERO,
            },
            log,
        )
    }

    /// Hold every call open for `delay`, widening any overlap window.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn track<R>(&mut self, op: &'static str, f: impl FnOnce(&mut T) -> R) -> R {
        self.log.enter(op);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        let out = f(&mut self.inner);
        self.log.leave();
        out
    }
}

impl<T: TerminalClient> TerminalClient for CountingTerminal<T> {
    fn initialize(&mut self) -> TerminalResult<()> {
        self.track("initialize", |t| t.initialize())
    }

    fn last_error(&mut self) -> TerminalError {
        self.track("last_error", |t| t.last_error())
    }

    fn account_info(&mut self) -> TerminalResult<AccountInfo> {
        self.track("account_info", |t| t.account_info())
    }

    fn orders_get(&mut self) -> TerminalResult<Vec<TradeOrder>> {
        self.track("orders_get", |t| t.orders_get())
    }

    fn order_get(&mut self, ticket: u64) -> TerminalResult<Option<TradeOrder>> {
        self.track("order_get", |t| t.order_get(ticket))
    }

    fn positions_get(&mut self) -> TerminalResult<Vec<TradePosition>> {
        self.track("positions_get", |t| t.positions_get())
    }

    fn symbols_get(&mut self) -> TerminalResult<Vec<SymbolInfo>> {
        self.track("symbols_get", |t| t.symbols_get())
    }

    fn symbol_info(&mut self, symbol: &str) -> TerminalResult<Option<SymbolInfo>> {
        self.track("symbol_info", |t| t.symbol_info(symbol))
    }

    fn symbol_select(&mut self, symbol: &str, visible: bool) -> TerminalResult<bool> {
        self.track("symbol_select", |t| t.symbol_select(symbol, visible))
    }

    fn symbol_info_tick(&mut self, symbol: &str) -> TerminalResult<Option<Tick>> {
        self.track("symbol_info_tick", |t| t.symbol_info_tick(symbol))
    }

    fn history_deals_get(
        &mut self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> TerminalResult<Vec<TradeDeal>> {
        self.track("history_deals_get", |t| t.history_deals_get(from, to))
    }

    fn order_send(&mut self, request: &TradeRequest) -> TerminalResult<Option<OrderSendResult>> {
        let fail = self.log.next_send_fails();
        self.track("order_send", |t| {
            if fail {
                Ok(None)
            } else {
                t.order_send(request)
            }
        })
    }
}
