//! Deterministic in-memory paper terminal.
//!
//! `PaperTerminal` implements [`TerminalClient`] against a simulated book of
//! symbols, positions, pending orders and deals. It is the default transport
//! of the daemon and the terminal used by scenario tests.
//!
//! Handles are cheap clones sharing one book, so a test can move one handle
//! into an engine and keep another to script failures or inspect what was
//! sent. No randomness, no wall-clock time.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use mtg_execution::{TerminalClient, TerminalError, TerminalResult};
use mtg_schemas::{
    AccountInfo, OrderSendResult, SymbolInfo, Tick, TradeDeal, TradeOrder, TradePosition,
    TradeRequest,
};

mod book;
pub mod types;

pub use book::PAPER_EPOCH;
pub use types::{default_symbols, PaperSymbol};

use book::PaperBook;

#[derive(Clone, Debug)]
pub struct PaperTerminal {
    book: Arc<Mutex<PaperBook>>,
}

impl Default for PaperTerminal {
    fn default() -> Self {
        Self::new(10_000.0)
    }
}

impl PaperTerminal {
    /// Empty terminal with the given account balance and no symbols.
    pub fn new(balance: f64) -> Self {
        Self {
            book: Arc::new(Mutex::new(PaperBook::new(balance))),
        }
    }

    /// Terminal offering [`default_symbols`].
    pub fn demo() -> Self {
        Self::with_symbols(10_000.0, default_symbols())
    }

    pub fn with_symbols(balance: f64, symbols: impl IntoIterator<Item = PaperSymbol>) -> Self {
        let terminal = Self::new(balance);
        for s in symbols {
            terminal.add_symbol(s);
        }
        terminal
    }

    fn book(&self) -> MutexGuard<'_, PaperBook> {
        self.book.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Scenario wiring
    // -----------------------------------------------------------------------

    pub fn add_symbol(&self, symbol: PaperSymbol) {
        self.book().add_symbol(symbol);
    }

    /// Move a symbol's quote. Returns `false` for an unknown symbol.
    pub fn set_quote(&self, symbol: &str, bid: f64, ask: f64) -> bool {
        self.book().set_quote(symbol, bid, ask)
    }

    /// While offline, `initialize` fails with code -10004.
    pub fn set_offline(&self, offline: bool) {
        self.book().offline = offline;
    }

    /// The next `order_send` answers with `retcode` and changes nothing.
    pub fn script_rejection(&self, retcode: u32) {
        self.book().rejections.push_back(retcode);
    }

    pub fn set_clock(&self, unix_seconds: i64) {
        self.book().set_clock(unix_seconds);
    }

    /// Rest a pending order on the book. Returns its ticket.
    pub fn place_pending(&self, symbol: &str, order_type: u32, volume: f64, price: f64) -> u64 {
        self.book().place_pending(symbol, order_type, volume, price)
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    /// Every request passed to `order_send`, in order.
    pub fn sent_requests(&self) -> Vec<TradeRequest> {
        self.book().sent.clone()
    }

    pub fn open_positions(&self) -> Vec<TradePosition> {
        self.book().positions()
    }

    pub fn deals(&self) -> Vec<TradeDeal> {
        self.book().deals().to_vec()
    }

    pub fn balance(&self) -> f64 {
        self.book().account_info().balance
    }

    pub fn is_watched(&self, symbol: &str) -> bool {
        self.book()
            .symbols()
            .iter()
            .any(|s| s.name == symbol && s.visible)
    }
}

impl TerminalClient for PaperTerminal {
    fn initialize(&mut self) -> TerminalResult<()> {
        self.book().initialize()
    }

    fn last_error(&mut self) -> TerminalError {
        self.book().last_error()
    }

    fn account_info(&mut self) -> TerminalResult<AccountInfo> {
        Ok(self.book().account_info())
    }

    fn orders_get(&mut self) -> TerminalResult<Vec<TradeOrder>> {
        Ok(self.book().orders())
    }

    fn order_get(&mut self, ticket: u64) -> TerminalResult<Option<TradeOrder>> {
        Ok(self.book().order(ticket))
    }

    fn positions_get(&mut self) -> TerminalResult<Vec<TradePosition>> {
        Ok(self.book().positions())
    }

    fn symbols_get(&mut self) -> TerminalResult<Vec<SymbolInfo>> {
        Ok(self.book().symbols())
    }

    fn symbol_info(&mut self, symbol: &str) -> TerminalResult<Option<SymbolInfo>> {
        Ok(self.book().symbol_info(symbol))
    }

    fn symbol_select(&mut self, symbol: &str, visible: bool) -> TerminalResult<bool> {
        Ok(self.book().symbol_select(symbol, visible))
    }

    fn symbol_info_tick(&mut self, symbol: &str) -> TerminalResult<Option<Tick>> {
        Ok(self.book().tick(symbol))
    }

    fn history_deals_get(
        &mut self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> TerminalResult<Vec<TradeDeal>> {
        Ok(self.book().deals_between(from, to))
    }

    fn order_send(&mut self, request: &TradeRequest) -> TerminalResult<Option<OrderSendResult>> {
        Ok(self.book().send(request))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use mtg_schemas::{consts, WireF64};

    use super::*;

    fn market(symbol: &str, order_type: u32, volume: f64, price: f64) -> TradeRequest {
        TradeRequest {
            action: consts::TRADE_ACTION_DEAL,
            symbol: Some(symbol.to_string()),
            volume: Some(WireF64::new(volume).unwrap()),
            order_type: Some(order_type),
            price: Some(WireF64::new(price).unwrap()),
            deviation: Some(10),
            type_filling: Some(consts::ORDER_FILLING_IOC),
            ..Default::default()
        }
    }

    fn close(symbol: &str, order_type: u32, volume: f64, price: f64, position: u64) -> TradeRequest {
        TradeRequest {
            position: Some(position),
            ..market(symbol, order_type, volume, price)
        }
    }

    fn send(t: &mut PaperTerminal, req: TradeRequest) -> OrderSendResult {
        t.order_send(&req).unwrap().expect("paper terminal returns a record")
    }

    #[test]
    fn open_then_close_books_profit() {
        let mut t = PaperTerminal::demo();
        let opened = send(&mut t, market("EURUSD", consts::ORDER_TYPE_BUY, 1.0, 1.1000));
        assert_eq!(opened.retcode, consts::TRADE_RETCODE_DONE);
        assert_eq!(opened.price, 1.1000);

        let positions = t.open_positions();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].ticket, opened.order);

        t.set_quote("EURUSD", 1.1010, 1.1012);
        let closed = send(
            &mut t,
            close("EURUSD", consts::ORDER_TYPE_SELL, 1.0, 1.1010, opened.order),
        );
        assert_eq!(closed.retcode, consts::TRADE_RETCODE_DONE);
        assert!(t.open_positions().is_empty());
        assert!((t.balance() - 10_100.0).abs() < 1e-6);

        let deals = t.deals();
        assert_eq!(deals.len(), 2);
        assert_eq!(deals[0].entry, consts::DEAL_ENTRY_IN);
        assert_eq!(deals[1].entry, consts::DEAL_ENTRY_OUT);
        assert_eq!(deals[1].position_id, opened.order);
    }

    #[test]
    fn partial_close_leaves_remainder() {
        let mut t = PaperTerminal::demo();
        let opened = send(&mut t, market("EURUSD", consts::ORDER_TYPE_SELL, 1.0, 1.0998));
        send(
            &mut t,
            close("EURUSD", consts::ORDER_TYPE_BUY, 0.3, 1.1000, opened.order),
        );
        let positions = t.open_positions();
        assert_eq!(positions.len(), 1);
        assert!((positions[0].volume - 0.7).abs() < 1e-9);
    }

    #[test]
    fn closing_unknown_position_is_refused() {
        let mut t = PaperTerminal::demo();
        let r = send(&mut t, close("EURUSD", consts::ORDER_TYPE_SELL, 1.0, 1.0998, 9));
        assert_eq!(r.retcode, consts::TRADE_RETCODE_POSITION_CLOSED);
    }

    #[test]
    fn over_closing_is_refused() {
        let mut t = PaperTerminal::demo();
        let opened = send(&mut t, market("EURUSD", consts::ORDER_TYPE_BUY, 0.5, 1.1000));
        let r = send(
            &mut t,
            close("EURUSD", consts::ORDER_TYPE_SELL, 0.6, 1.0998, opened.order),
        );
        assert_eq!(r.retcode, consts::TRADE_RETCODE_INVALID_VOLUME);
        assert_eq!(t.open_positions().len(), 1);
    }

    #[test]
    fn boc_fill_and_off_step_volume_are_refused() {
        let mut t = PaperTerminal::demo();
        let mut req = market("EURUSD", consts::ORDER_TYPE_BUY, 1.0, 1.1000);
        req.type_filling = Some(consts::ORDER_FILLING_BOC);
        assert_eq!(send(&mut t, req).retcode, consts::TRADE_RETCODE_INVALID_FILL);

        let req = market("EURUSD", consts::ORDER_TYPE_BUY, 0.015, 1.1000);
        assert_eq!(send(&mut t, req).retcode, consts::TRADE_RETCODE_INVALID_VOLUME);
        assert!(t.open_positions().is_empty());
    }

    #[test]
    fn stale_price_beyond_deviation_is_requoted() {
        let mut t = PaperTerminal::demo();
        let r = send(&mut t, market("EURUSD", consts::ORDER_TYPE_BUY, 1.0, 1.0950));
        assert_eq!(r.retcode, consts::TRADE_RETCODE_REQUOTE);
        assert_eq!(r.ask, 1.1000);
    }

    #[test]
    fn request_without_required_fields_yields_no_record() {
        let mut t = PaperTerminal::demo();
        let req = TradeRequest {
            action: consts::TRADE_ACTION_DEAL,
            ..Default::default()
        };
        assert_eq!(t.order_send(&req).unwrap(), None);
        assert_eq!(t.last_error().code, -2);
    }

    #[test]
    fn pending_order_can_be_removed_once() {
        let mut t = PaperTerminal::demo();
        let ticket = t.place_pending("EURUSD", consts::ORDER_TYPE_BUY_LIMIT, 1.0, 1.0900);
        assert!(t.order_get(ticket).unwrap().is_some());

        let remove = TradeRequest {
            action: consts::TRADE_ACTION_REMOVE,
            order: Some(ticket),
            ..Default::default()
        };
        assert_eq!(send(&mut t, remove.clone()).retcode, consts::TRADE_RETCODE_DONE);
        assert!(t.order_get(ticket).unwrap().is_none());
        assert_eq!(send(&mut t, remove).retcode, consts::TRADE_RETCODE_INVALID_ORDER);
    }

    #[test]
    fn subscribing_starts_warmup_window() {
        let mut t = PaperTerminal::new(0.0);
        t.add_symbol(PaperSymbol::new("XAUUSD", 2400.0, 2400.5).with_warmup_reads(2));

        assert!(t.symbol_select("XAUUSD", true).unwrap());
        assert!(t.is_watched("XAUUSD"));
        assert_eq!(t.symbol_info("XAUUSD").unwrap().unwrap().ask, 0.0);
        assert_eq!(t.symbol_info("XAUUSD").unwrap().unwrap().ask, 0.0);
        assert_eq!(t.symbol_info("XAUUSD").unwrap().unwrap().ask, 2400.5);

        assert!(t.symbol_select("XAUUSD", false).unwrap());
        assert!(!t.is_watched("XAUUSD"));
        assert!(!t.symbol_select("NOPE", true).unwrap());
    }

    #[test]
    fn offline_terminal_fails_initialize() {
        let mut t = PaperTerminal::demo();
        t.set_offline(true);
        let err = t.initialize().unwrap_err();
        assert_eq!(err.code, -10004);
        t.set_offline(false);
        assert!(t.initialize().is_ok());
    }

    #[test]
    fn scripted_rejection_applies_once() {
        let mut t = PaperTerminal::demo();
        t.script_rejection(consts::TRADE_RETCODE_REJECT);
        let req = market("EURUSD", consts::ORDER_TYPE_BUY, 1.0, 1.1000);
        assert_eq!(send(&mut t, req.clone()).retcode, consts::TRADE_RETCODE_REJECT);
        assert_eq!(send(&mut t, req).retcode, consts::TRADE_RETCODE_DONE);
        assert_eq!(t.sent_requests().len(), 2);
    }

    #[test]
    fn history_filters_by_deal_time() {
        let mut t = PaperTerminal::demo();
        t.set_clock(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap().timestamp());
        send(&mut t, market("EURUSD", consts::ORDER_TYPE_BUY, 1.0, 1.1000));
        t.set_clock(Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap().timestamp());
        send(&mut t, market("EURUSD", consts::ORDER_TYPE_BUY, 1.0, 1.1000));

        let from = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();
        assert_eq!(t.history_deals_get(from, to).unwrap().len(), 1);
    }

    #[test]
    fn account_reflects_floating_profit() {
        let mut t = PaperTerminal::demo();
        send(&mut t, market("EURUSD", consts::ORDER_TYPE_BUY, 1.0, 1.1000));
        t.set_quote("EURUSD", 1.0990, 1.0992);
        let acct = t.account_info().unwrap();
        assert!((acct.profit + 100.0).abs() < 1e-6);
        assert!((acct.equity - 9_900.0).abs() < 1e-6);
        assert!(acct.margin > 0.0);
    }
}
