//! Order engine: turns intents into terminal trade requests.
//!
//! Every public operation initializes the session, reads the live state it
//! needs, builds one request and hands it to the terminal through the
//! [`BrokerGateway`]. The engine holds no position state of its own; the only
//! process-local memory is the trade-identifier registry.
//!
//! Rules applied to every trade request:
//! - market prices come from a tick fetched immediately before submission;
//!   a missing tick or one with both sides at zero is refused
//! - `deviation`, `magic`, `type_time = GTC` and the resolved fill mode are
//!   always present; stop-loss and take-profit only when supplied
//! - numeric fields pass through [`WireF64`], so whole values serialize with
//!   a fractional part
//! - any return code other than DONE / DONE_PARTIAL / PLACED is a failure

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use mtg_schemas::{
    consts, AccountInfo, OrderSendResult, Tick, TradeDeal, TradeOrder, TradePosition,
    TradeRequest, WireF64,
};
use tracing::{debug, info, warn};

use crate::error::GatewayError;
use crate::gateway::BrokerGateway;
use crate::id_map::TradeIdMap;
use crate::policy::{FillMode, OrderPolicy, RegistryClosePolicy};
use crate::symbols::SymbolWatch;
use crate::terminal::TerminalClient;
use crate::types::{
    CloseAllItem, CloseAllOutcome, CloseRequest, CloseTarget, OrderIntent, Side, Submission,
    SymbolQuote, TradeId, WatchClearReport,
};

/// Terminal comments are truncated to this many characters.
pub const MAX_COMMENT_CHARS: usize = 31;

/// Live record a close acts on, read from the terminal at close time.
#[derive(Debug)]
struct LiveTicket {
    ticket: u64,
    symbol: String,
    side: Side,
    volume: f64,
}

pub struct OrderEngine<B: TerminalClient> {
    gateway: BrokerGateway<B>,
    registry: Mutex<TradeIdMap>,
    symbols: SymbolWatch,
    policy: OrderPolicy,
}

impl<B: TerminalClient> OrderEngine<B> {
    pub fn new(terminal: B, policy: OrderPolicy) -> Self {
        Self {
            gateway: BrokerGateway::new(terminal),
            registry: Mutex::new(TradeIdMap::new()),
            symbols: SymbolWatch::new(policy.quote_retry),
            policy,
        }
    }

    pub fn policy(&self) -> &OrderPolicy {
        &self.policy
    }

    pub fn gateway(&self) -> &BrokerGateway<B> {
        &self.gateway
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn account_info(&self) -> Result<AccountInfo, GatewayError> {
        self.gateway.initialize()?;
        Ok(self.gateway.call(|t| t.account_info())?)
    }

    pub fn orders(&self) -> Result<Vec<TradeOrder>, GatewayError> {
        self.gateway.initialize()?;
        Ok(self.gateway.call(|t| t.orders_get())?)
    }

    pub fn positions(&self) -> Result<Vec<TradePosition>, GatewayError> {
        self.gateway.initialize()?;
        Ok(self.gateway.call(|t| t.positions_get())?)
    }

    /// Deals executed in `[from, to]`.
    pub fn history_deals(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<TradeDeal>, GatewayError> {
        if from > to {
            return Err(GatewayError::InvalidRequest(format!(
                "from_date {from} is after to_date {to}"
            )));
        }
        self.gateway.initialize()?;
        Ok(self.gateway.call(|t| t.history_deals_get(from, to))?)
    }

    /// Subscribe, settle and unsubscribe `symbol`; see [`SymbolWatch`].
    pub fn symbol_quote(&self, symbol: &str) -> Result<SymbolQuote, GatewayError> {
        require_symbol(symbol)?;
        self.gateway.initialize()?;
        self.symbols.ensure_quotable(&self.gateway, symbol)
    }

    pub fn clear_watches(&self) -> Result<WatchClearReport, GatewayError> {
        self.gateway.initialize()?;
        self.symbols.clear_all(&self.gateway)
    }

    /// Snapshot of the trade-identifier registry.
    pub fn trade_ids(&self) -> Vec<(TradeId, u64)> {
        self.registry().entries()
    }

    // -----------------------------------------------------------------------
    // Trading
    // -----------------------------------------------------------------------

    /// Open a market position. On success the intent's trade identifier (if
    /// any) is mapped to the new ticket; on failure the registry is untouched.
    pub fn open_position(&self, intent: &OrderIntent) -> Result<Submission, GatewayError> {
        require_symbol(&intent.symbol)?;
        let volume = positive_volume(intent.volume)?;
        let fill = self.policy.fill_mode.resolve(intent.fill_mode)?;
        let sl = intent.stop_loss.map(WireF64::new).transpose()?;
        let tp = intent.take_profit.map(WireF64::new).transpose()?;

        self.gateway.initialize()?;
        let tick = self.fresh_tick(&intent.symbol)?;
        let price = market_price(&intent.symbol, intent.side.open_price(&tick))?;

        let request = TradeRequest {
            action: consts::TRADE_ACTION_DEAL,
            symbol: Some(intent.symbol.clone()),
            volume: Some(volume),
            order_type: Some(intent.side.order_type()),
            price: Some(price),
            sl,
            tp,
            comment: Some(self.open_comment(intent)),
            ..self.tagged_request(fill)
        };

        let result = self.submit(&request)?;
        let ticket = result.order;

        if let Some(trade_id) = intent.trade_id.as_ref().filter(|id| !id.is_empty()) {
            if let Some(previous) = self.registry().record(trade_id.clone(), ticket) {
                warn!(trade_id = %trade_id, previous, ticket, "trade id reused; mapping overwritten");
            }
        }

        info!(
            symbol = %intent.symbol,
            side = %intent.side,
            volume = intent.volume,
            ticket,
            trade_id = ?intent.trade_id.as_ref().map(TradeId::as_str),
            "position opened"
        );
        Ok(Submission {
            ticket,
            request,
            result,
        })
    }

    /// Close (fully or partially) the position named by ticket or trade
    /// identifier. Symbol, side and default volume come from the live record;
    /// the caller's expectations are only cross-checked.
    pub fn close_position(&self, close: &CloseRequest) -> Result<Submission, GatewayError> {
        let fill = self.policy.fill_mode.resolve(close.fill_mode)?;
        let volume_override = close.volume.map(positive_volume).transpose()?;

        // An unknown identifier is refused before any terminal call.
        let ticket = match &close.target {
            CloseTarget::Ticket(ticket) => *ticket,
            CloseTarget::TradeId(id) => self
                .registry()
                .resolve(id)
                .ok_or_else(|| GatewayError::TradeNotFound(id.to_string()))?,
        };

        self.gateway.initialize()?;
        let live = self
            .find_live(ticket)?
            .ok_or_else(|| GatewayError::TradeNotFound(close.target.to_string()))?;
        warn_on_mismatch(close, &live);

        let volume = match volume_override {
            Some(v) => v,
            None => positive_volume(live.volume)?,
        };
        let tick = self.fresh_tick(&live.symbol)?;
        let price = market_price(&live.symbol, live.side.close_price(&tick))?;

        let request = TradeRequest {
            action: consts::TRADE_ACTION_DEAL,
            symbol: Some(live.symbol.clone()),
            volume: Some(volume),
            order_type: Some(live.side.opposite().order_type()),
            position: Some(ticket),
            price: Some(price),
            comment: Some(self.comment(&format!("close {}", close.target))),
            ..self.tagged_request(fill)
        };

        let result = self.submit(&request)?;
        self.after_close(ticket);

        info!(
            ticket,
            symbol = %live.symbol,
            volume = volume.get(),
            target = %close.target,
            "position closed"
        );
        Ok(Submission {
            ticket,
            request,
            result,
        })
    }

    /// Remove a pending order.
    pub fn cancel_order(&self, ticket: u64) -> Result<Submission, GatewayError> {
        self.gateway.initialize()?;
        if self.gateway.call(|t| t.order_get(ticket))?.is_none() {
            return Err(GatewayError::OrderNotFound(ticket));
        }

        let request = TradeRequest {
            action: consts::TRADE_ACTION_REMOVE,
            order: Some(ticket),
            ..Default::default()
        };
        let result = self.submit(&request)?;

        info!(ticket, "order cancelled");
        Ok(Submission {
            ticket,
            request,
            result,
        })
    }

    /// Close every open position with the default fill mode.
    ///
    /// Each position is attempted independently; a failure is recorded in
    /// that position's item and the batch continues.
    pub fn close_all_positions(&self) -> Result<CloseAllOutcome, GatewayError> {
        self.gateway.initialize()?;
        let positions = self.gateway.call(|t| t.positions_get())?;
        if positions.is_empty() {
            info!("close all: no open positions");
            return Ok(CloseAllOutcome::NoOpenPositions);
        }

        let fill = self.policy.fill_mode.default;
        let items: Vec<CloseAllItem> = positions
            .iter()
            .map(|pos| {
                let (result, error) = match self.close_one(pos, fill) {
                    Ok(result) => (Some(result), None),
                    Err(e) => {
                        warn!(ticket = pos.ticket, symbol = %pos.symbol, error = %e, "close all: position not closed");
                        (None, Some(e.to_string()))
                    }
                };
                CloseAllItem {
                    ticket: pos.ticket,
                    symbol: pos.symbol.clone(),
                    result,
                    error,
                }
            })
            .collect();

        info!(
            attempted = items.len(),
            closed = items
                .iter()
                .filter(|i| i.result.as_ref().is_some_and(OrderSendResult::is_success))
                .count(),
            "close all finished"
        );
        Ok(CloseAllOutcome::Closed(items))
    }

    /// One close-all leg. Every position gets a submission: without a usable
    /// tick the close goes out at price zero and the broker decides. A
    /// non-success return code is still a result here, reported as-is.
    fn close_one(&self, pos: &TradePosition, fill: FillMode) -> Result<OrderSendResult, GatewayError> {
        let side = position_side(pos.ticket, pos.position_type)?;
        let quoted = match self.gateway.call(|t| t.symbol_info_tick(&pos.symbol)) {
            Ok(Some(tick)) => side.close_price(&tick),
            Ok(None) => 0.0,
            Err(e) => {
                warn!(ticket = pos.ticket, symbol = %pos.symbol, error = %e, "close all: no tick; submitting without a price");
                0.0
            }
        };
        let price = WireF64::new(if quoted.is_finite() { quoted } else { 0.0 })?;

        let request = TradeRequest {
            action: consts::TRADE_ACTION_DEAL,
            symbol: Some(pos.symbol.clone()),
            volume: Some(WireF64::new(pos.volume)?),
            order_type: Some(side.opposite().order_type()),
            position: Some(pos.ticket),
            price: Some(price),
            comment: Some(self.comment("close all")),
            ..self.tagged_request(fill)
        };

        let result = self.send(&request)?;
        if result.is_success() {
            self.after_close(pos.ticket);
        } else {
            warn!(ticket = pos.ticket, retcode = result.retcode, comment = %result.comment, "close all: broker rejected");
        }
        Ok(result)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn registry(&self) -> MutexGuard<'_, TradeIdMap> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fields every market request carries.
    fn tagged_request(&self, fill: FillMode) -> TradeRequest {
        TradeRequest {
            deviation: Some(self.policy.deviation),
            magic: Some(self.policy.magic),
            type_time: Some(consts::ORDER_TIME_GTC),
            type_filling: Some(fill.as_wire()),
            ..Default::default()
        }
    }

    fn open_comment(&self, intent: &OrderIntent) -> String {
        match intent.strategy.as_deref().map(str::trim) {
            Some(strategy) if !strategy.is_empty() => truncate_comment(strategy),
            _ => match &intent.trade_id {
                Some(id) if !id.is_empty() => self.comment(&format!("open {id}")),
                _ => self.comment("open"),
            },
        }
    }

    fn comment(&self, suffix: &str) -> String {
        truncate_comment(&format!("{} {suffix}", self.policy.comment_prefix))
    }

    fn fresh_tick(&self, symbol: &str) -> Result<Tick, GatewayError> {
        match self.gateway.call(|t| t.symbol_info_tick(symbol))? {
            Some(tick) if !tick.is_degenerate() => Ok(tick),
            _ => Err(GatewayError::QuoteUnavailable(symbol.to_string())),
        }
    }

    /// Positions first, then orders. The terminal reports a position's side
    /// through the same type numbering as orders.
    fn find_live(&self, ticket: u64) -> Result<Option<LiveTicket>, GatewayError> {
        let positions = self.gateway.call(|t| t.positions_get())?;
        if let Some(pos) = positions.into_iter().find(|p| p.ticket == ticket) {
            return Ok(Some(LiveTicket {
                ticket,
                side: position_side(ticket, pos.position_type)?,
                symbol: pos.symbol,
                volume: pos.volume,
            }));
        }

        match self.gateway.call(|t| t.order_get(ticket))? {
            Some(order) => Ok(Some(LiveTicket {
                ticket,
                side: position_side(ticket, order.order_type)?,
                volume: order.volume_current,
                symbol: order.symbol,
            })),
            None => Ok(None),
        }
    }

    /// `order_send` plus the last-error read when it yields nothing, under
    /// one session lock.
    fn send(&self, request: &TradeRequest) -> Result<OrderSendResult, GatewayError> {
        debug!(?request, "order_send");
        self.gateway.call(|t| match t.order_send(request)? {
            Some(result) => Ok(result),
            None => Err(GatewayError::NoResult(t.last_error())),
        })
    }

    fn submit(&self, request: &TradeRequest) -> Result<OrderSendResult, GatewayError> {
        let result = self.send(request)?;
        if result.is_success() {
            return Ok(result);
        }
        warn!(
            retcode = result.retcode,
            comment = %result.comment,
            symbol = ?request.symbol,
            "broker rejected request"
        );
        Err(GatewayError::BrokerRejected {
            retcode: result.retcode,
            comment: result.comment.clone(),
            result: Box::new(result),
        })
    }

    fn after_close(&self, ticket: u64) {
        if self.policy.registry_close == RegistryClosePolicy::ReleaseOnClose {
            let released = self.registry().release_ticket(ticket);
            if !released.is_empty() {
                debug!(ticket, released = released.len(), "trade ids released");
            }
        }
    }
}

impl LiveTicket {
    fn describe(&self) -> String {
        format!("{} {} {}", self.ticket, self.side, self.symbol)
    }
}

fn warn_on_mismatch(close: &CloseRequest, live: &LiveTicket) {
    if let Some(symbol) = close.expected_symbol.as_deref() {
        if !symbol.eq_ignore_ascii_case(&live.symbol) {
            warn!(expected = symbol, live = %live.describe(), "close: caller symbol differs from live record; using live");
        }
    }
    if let Some(side) = close.expected_side {
        if side != live.side {
            warn!(expected = %side, live = %live.describe(), "close: caller side differs from live record; using live");
        }
    }
}

fn position_side(ticket: u64, order_type: u32) -> Result<Side, GatewayError> {
    Side::from_order_type(order_type).ok_or_else(|| {
        GatewayError::InvalidRequest(format!(
            "ticket {ticket} has order type {order_type}, which has no side"
        ))
    })
}

fn require_symbol(symbol: &str) -> Result<(), GatewayError> {
    if symbol.trim().is_empty() {
        return Err(GatewayError::InvalidRequest("symbol is required".to_string()));
    }
    Ok(())
}

fn positive_volume(volume: f64) -> Result<WireF64, GatewayError> {
    let v = WireF64::new(volume)?;
    if v.get() <= 0.0 {
        return Err(GatewayError::InvalidRequest(format!(
            "volume must be positive, got {volume}"
        )));
    }
    Ok(v)
}

fn market_price(symbol: &str, price: f64) -> Result<WireF64, GatewayError> {
    if price <= 0.0 || !price.is_finite() {
        return Err(GatewayError::QuoteUnavailable(symbol.to_string()));
    }
    Ok(WireF64::new(price)?)
}

pub fn truncate_comment(comment: &str) -> String {
    comment.chars().take(MAX_COMMENT_CHARS).collect()
}
