//! Symbol availability: watch-list subscription and quote settling.
//!
//! A terminal only streams quotes for symbols on its watch list, and a symbol
//! that was just added reports `ask = 0` until the first quote arrives.
//! [`SymbolWatch::ensure_quotable`] subscribes, polls until the ask is live
//! (bounded by [`QuoteRetry`]), and always unsubscribes again before
//! returning.
//!
//! The watch-list flag belongs to the terminal and is shared with every other
//! consumer of the session; this module toggles it but never caches it.

use std::thread;

use tracing::{debug, info, warn};

use crate::error::GatewayError;
use crate::gateway::BrokerGateway;
use crate::policy::QuoteRetry;
use crate::terminal::TerminalClient;
use crate::types::{SymbolQuote, WatchClearReport};

#[derive(Clone, Debug, Default)]
pub struct SymbolWatch {
    retry: QuoteRetry,
}

impl SymbolWatch {
    pub fn new(retry: QuoteRetry) -> Self {
        Self { retry }
    }

    /// Subscribe `symbol`, wait for a live ask, unsubscribe.
    ///
    /// Returns the first snapshot with a non-zero ask, or the last snapshot
    /// once the retry budget is spent (`quote_settled = false`). Fails only
    /// when the terminal does not know the symbol or refuses to subscribe it.
    ///
    /// Blocks the calling thread between polls; the session lock is not held
    /// while waiting.
    pub fn ensure_quotable<B: TerminalClient>(
        &self,
        gateway: &BrokerGateway<B>,
        symbol: &str,
    ) -> Result<SymbolQuote, GatewayError> {
        if !gateway.call(|t| t.symbol_select(symbol, true))? {
            let known = gateway.call(|t| t.symbol_info(symbol))?.is_some();
            return Err(if known {
                GatewayError::SymbolSelectFailed(symbol.to_string())
            } else {
                GatewayError::SymbolNotFound(symbol.to_string())
            });
        }

        let settled = self.settle(gateway, symbol);

        match gateway.call(|t| t.symbol_select(symbol, false)) {
            Ok(true) => {}
            Ok(false) => warn!(symbol, "terminal refused to remove symbol from watch list"),
            Err(e) => warn!(symbol, error = %e, "failed to remove symbol from watch list"),
        }

        settled
    }

    fn settle<B: TerminalClient>(
        &self,
        gateway: &BrokerGateway<B>,
        symbol: &str,
    ) -> Result<SymbolQuote, GatewayError> {
        let mut info = gateway
            .call(|t| t.symbol_info(symbol))?
            .ok_or_else(|| GatewayError::SymbolNotFound(symbol.to_string()))?;

        let mut retries = 0;
        while info.ask == 0.0 && retries < self.retry.attempts {
            if !self.retry.interval.is_zero() {
                thread::sleep(self.retry.interval);
            }
            retries += 1;
            debug!(symbol, retries, "ask not live yet; re-reading symbol");
            match gateway.call(|t| t.symbol_info(symbol))? {
                Some(next) => info = next,
                None => break,
            }
        }

        let quote_settled = info.ask != 0.0;
        if !quote_settled {
            warn!(symbol, retries, "quote still zero after retry budget");
        }
        Ok(SymbolQuote {
            info,
            quote_settled,
            retries,
        })
    }

    /// Remove every visible symbol from the watch list.
    ///
    /// Best-effort: a symbol that fails to unsubscribe is reported in
    /// `failed` and the sweep continues.
    pub fn clear_all<B: TerminalClient>(
        &self,
        gateway: &BrokerGateway<B>,
    ) -> Result<WatchClearReport, GatewayError> {
        let symbols = gateway.call(|t| t.symbols_get())?;
        let mut report = WatchClearReport::default();

        for sym in symbols.into_iter().filter(|s| s.visible) {
            match gateway.call(|t| t.symbol_select(&sym.name, false)) {
                Ok(true) => report.removed.push(sym.name),
                Ok(false) => {
                    warn!(symbol = %sym.name, "terminal refused to unsubscribe");
                    report.failed.push(sym.name);
                }
                Err(e) => {
                    warn!(symbol = %sym.name, error = %e, "unsubscribe failed");
                    report.failed.push(sym.name);
                }
            }
        }

        info!(
            removed = report.removed.len(),
            failed = report.failed.len(),
            "watch list cleared"
        );
        Ok(report)
    }
}
