//! Paper terminal state and fill rules.
//!
//! - Market orders fill immediately and completely at the current quote.
//! - A position's ticket equals the ticket of the order that opened it.
//! - A request whose `price` is further from the market than `deviation`
//!   points is requoted.
//! - `ORDER_FILLING_BOC` is refused for market orders.
//! - Closing more than the open volume is refused; closing all of it
//!   removes the position.
//! - Time is a deterministic counter, advanced one second per deal.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use mtg_execution::{Side, TerminalError, TerminalResult};
use mtg_schemas::{
    consts, AccountInfo, OrderSendResult, SymbolInfo, Tick, TradeDeal, TradeOrder, TradePosition,
    TradeRequest,
};
use tracing::debug;

use crate::types::PaperSymbol;

/// 2024-01-01T00:00:00Z
pub const PAPER_EPOCH: i64 = 1_704_067_200;

const VOLUME_EPS: f64 = 1e-9;

#[derive(Clone, Debug)]
struct SymbolState {
    spec: PaperSymbol,
    visible: bool,
    cold_reads: u32,
}

#[derive(Clone, Debug)]
pub(crate) struct PaperBook {
    login: u64,
    balance: f64,
    leverage: u32,
    currency: String,
    symbols: BTreeMap<String, SymbolState>,
    positions: BTreeMap<u64, TradePosition>,
    orders: BTreeMap<u64, TradeOrder>,
    deals: Vec<TradeDeal>,
    next_ticket: u64,
    next_request_id: u64,
    clock: i64,
    pub(crate) offline: bool,
    pub(crate) rejections: VecDeque<u32>,
    last_error: TerminalError,
    pub(crate) sent: Vec<TradeRequest>,
}

impl PaperBook {
    pub(crate) fn new(balance: f64) -> Self {
        Self {
            login: 1,
            balance,
            leverage: 100,
            currency: "USD".to_string(),
            symbols: BTreeMap::new(),
            positions: BTreeMap::new(),
            orders: BTreeMap::new(),
            deals: Vec::new(),
            next_ticket: 100_000,
            next_request_id: 1,
            clock: PAPER_EPOCH,
            offline: false,
            rejections: VecDeque::new(),
            last_error: success(),
            sent: Vec::new(),
        }
    }

    pub(crate) fn add_symbol(&mut self, spec: PaperSymbol) {
        self.symbols.insert(
            spec.name.clone(),
            SymbolState {
                spec,
                visible: false,
                cold_reads: 0,
            },
        );
    }

    pub(crate) fn set_quote(&mut self, symbol: &str, bid: f64, ask: f64) -> bool {
        match self.symbols.get_mut(symbol) {
            Some(state) => {
                state.spec.bid = bid;
                state.spec.ask = ask;
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_clock(&mut self, unix_seconds: i64) {
        self.clock = unix_seconds;
    }

    pub(crate) fn place_pending(
        &mut self,
        symbol: &str,
        order_type: u32,
        volume: f64,
        price: f64,
    ) -> u64 {
        let ticket = self.next_ticket();
        self.orders.insert(
            ticket,
            TradeOrder {
                ticket,
                symbol: symbol.to_string(),
                order_type,
                time_setup: self.clock,
                volume_initial: volume,
                volume_current: volume,
                price_open: price,
                ..Default::default()
            },
        );
        ticket
    }

    // -----------------------------------------------------------------------
    // Terminal reads
    // -----------------------------------------------------------------------

    pub(crate) fn initialize(&mut self) -> TerminalResult<()> {
        if self.offline {
            self.last_error = TerminalError::new(-10004, "No IPC connection");
            return Err(self.last_error.clone());
        }
        Ok(())
    }

    pub(crate) fn last_error(&self) -> TerminalError {
        self.last_error.clone()
    }

    pub(crate) fn account_info(&self) -> AccountInfo {
        let positions = self.positions();
        let profit: f64 = positions.iter().map(|p| p.profit).sum();
        let margin: f64 = positions
            .iter()
            .filter_map(|p| {
                let spec = &self.symbols.get(&p.symbol)?.spec;
                Some(p.volume * spec.contract_size * p.price_open / f64::from(self.leverage))
            })
            .sum();
        let equity = self.balance + profit;
        AccountInfo {
            login: self.login,
            balance: self.balance,
            equity,
            margin,
            margin_free: equity - margin,
            margin_level: if margin > 0.0 {
                equity / margin * 100.0
            } else {
                0.0
            },
            profit,
            leverage: self.leverage,
            currency: self.currency.clone(),
            server: "Paper-Demo".to_string(),
            ..Default::default()
        }
    }

    pub(crate) fn symbols(&self) -> Vec<SymbolInfo> {
        self.symbols.values().map(symbol_record).collect()
    }

    pub(crate) fn symbol_info(&mut self, symbol: &str) -> Option<SymbolInfo> {
        let state = self.symbols.get_mut(symbol)?;
        let mut info = symbol_record(state);
        if state.cold_reads > 0 {
            state.cold_reads -= 1;
            info.bid = 0.0;
            info.ask = 0.0;
        }
        Some(info)
    }

    pub(crate) fn symbol_select(&mut self, symbol: &str, visible: bool) -> bool {
        let Some(state) = self.symbols.get_mut(symbol) else {
            self.last_error = TerminalError::new(-1, format!("unknown symbol {symbol}"));
            return false;
        };
        if visible && !state.visible {
            state.cold_reads = state.spec.warmup_reads;
        }
        state.visible = visible;
        true
    }

    pub(crate) fn tick(&self, symbol: &str) -> Option<Tick> {
        let spec = &self.symbols.get(symbol)?.spec;
        Some(Tick {
            time: self.clock,
            bid: spec.bid,
            ask: spec.ask,
            last: 0.0,
            volume: 0,
            time_msc: self.clock * 1000,
        })
    }

    /// Open positions marked to the current quote.
    pub(crate) fn positions(&self) -> Vec<TradePosition> {
        self.positions
            .values()
            .map(|p| {
                let mut p = p.clone();
                if let Some(state) = self.symbols.get(&p.symbol) {
                    if let Some(side) = Side::from_order_type(p.position_type) {
                        p.price_current = close_quote(side, &state.spec);
                        p.profit = pnl(side, p.price_open, p.price_current, p.volume, &state.spec);
                    }
                }
                p
            })
            .collect()
    }

    pub(crate) fn orders(&self) -> Vec<TradeOrder> {
        self.orders.values().cloned().collect()
    }

    pub(crate) fn order(&self, ticket: u64) -> Option<TradeOrder> {
        self.orders.get(&ticket).cloned()
    }

    pub(crate) fn deals_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<TradeDeal> {
        let (from, to) = (from.timestamp(), to.timestamp());
        self.deals
            .iter()
            .filter(|d| d.time >= from && d.time <= to)
            .cloned()
            .collect()
    }

    pub(crate) fn deals(&self) -> &[TradeDeal] {
        &self.deals
    }

    // -----------------------------------------------------------------------
    // order_send
    // -----------------------------------------------------------------------

    pub(crate) fn send(&mut self, req: &TradeRequest) -> Option<OrderSendResult> {
        self.sent.push(req.clone());

        if let Some(retcode) = self.rejections.pop_front() {
            return Some(self.reply(retcode, "Scripted rejection", req.symbol.as_deref()));
        }

        match req.action {
            consts::TRADE_ACTION_DEAL => self.deal(req),
            consts::TRADE_ACTION_REMOVE => self.remove(req),
            other => {
                self.last_error =
                    TerminalError::new(-2, format!("Invalid \"action\" argument {other}"));
                None
            }
        }
    }

    fn deal(&mut self, req: &TradeRequest) -> Option<OrderSendResult> {
        let (Some(symbol), Some(volume), Some(order_type)) =
            (req.symbol.as_deref(), req.volume, req.order_type)
        else {
            self.last_error = TerminalError::new(-2, "Invalid arguments");
            return None;
        };
        let volume = round_volume(f64::from(volume));

        let Some(spec) = self.symbols.get(symbol).map(|s| s.spec.clone()) else {
            return Some(self.reply(consts::TRADE_RETCODE_INVALID, "Unknown symbol", Some(symbol)));
        };
        let side = match order_type {
            consts::ORDER_TYPE_BUY => Side::Buy,
            consts::ORDER_TYPE_SELL => Side::Sell,
            _ => {
                return Some(self.reply(consts::TRADE_RETCODE_INVALID, "Invalid order type", Some(symbol)))
            }
        };
        if !spec.accepts_volume(volume) {
            return Some(self.reply(consts::TRADE_RETCODE_INVALID_VOLUME, "Invalid volume", Some(symbol)));
        }
        if req.type_filling == Some(consts::ORDER_FILLING_BOC) {
            return Some(self.reply(
                consts::TRADE_RETCODE_INVALID_FILL,
                "Unsupported filling mode",
                Some(symbol),
            ));
        }

        let market = side.open_price(&Tick {
            bid: spec.bid,
            ask: spec.ask,
            ..Default::default()
        });
        if market <= 0.0 {
            return Some(self.reply(
                consts::TRADE_RETCODE_PRICE_OFF,
                "No quotes to process the request",
                Some(symbol),
            ));
        }
        if let Some(requested) = req.price {
            let tolerance = f64::from(req.deviation.unwrap_or(0)) * spec.point() + spec.point() * 1e-6;
            if (f64::from(requested) - market).abs() > tolerance {
                return Some(self.reply(consts::TRADE_RETCODE_REQUOTE, "Requote", Some(symbol)));
            }
        }

        match req.position {
            Some(position) => self.close_fill(req, &spec, side, volume, market, position),
            None => Some(self.open_fill(req, &spec, side, volume, market)),
        }
    }

    fn open_fill(
        &mut self,
        req: &TradeRequest,
        spec: &PaperSymbol,
        side: Side,
        volume: f64,
        price: f64,
    ) -> OrderSendResult {
        let ticket = self.next_ticket();
        let comment = req.comment.clone().unwrap_or_default();
        let magic = req.magic.unwrap_or_default();

        self.positions.insert(
            ticket,
            TradePosition {
                ticket,
                symbol: spec.name.clone(),
                position_type: side.order_type(),
                volume,
                time: self.clock,
                price_open: price,
                price_current: price,
                sl: req.sl.map(f64::from).unwrap_or_default(),
                tp: req.tp.map(f64::from).unwrap_or_default(),
                magic,
                identifier: ticket,
                comment: comment.clone(),
                ..Default::default()
            },
        );
        let deal = self.record_deal(TradeDeal {
            order: ticket,
            deal_type: side.order_type(),
            entry: consts::DEAL_ENTRY_IN,
            position_id: ticket,
            symbol: spec.name.clone(),
            volume,
            price,
            magic,
            comment,
            ..Default::default()
        });

        debug!(ticket, symbol = %spec.name, %side, volume, price, "paper fill: open");
        self.filled(ticket, deal, volume, price, spec)
    }

    fn close_fill(
        &mut self,
        req: &TradeRequest,
        spec: &PaperSymbol,
        side: Side,
        volume: f64,
        price: f64,
        position: u64,
    ) -> Option<OrderSendResult> {
        let Some(open) = self.positions.get(&position).cloned() else {
            return Some(self.reply(
                consts::TRADE_RETCODE_POSITION_CLOSED,
                "Position doesn't exist",
                Some(&spec.name),
            ));
        };
        let Some(held) = Side::from_order_type(open.position_type) else {
            return Some(self.reply(consts::TRADE_RETCODE_INVALID, "Invalid position", Some(&spec.name)));
        };
        if open.symbol != spec.name || held.opposite() != side {
            return Some(self.reply(
                consts::TRADE_RETCODE_INVALID,
                "Close must oppose the position",
                Some(&spec.name),
            ));
        }
        if volume > open.volume + VOLUME_EPS {
            return Some(self.reply(
                consts::TRADE_RETCODE_INVALID_VOLUME,
                "Volume exceeds position",
                Some(&spec.name),
            ));
        }

        let profit = pnl(held, open.price_open, price, volume, spec);
        self.balance += profit;
        let remaining = round_volume(open.volume - volume);
        if remaining <= VOLUME_EPS {
            self.positions.remove(&position);
        } else if let Some(p) = self.positions.get_mut(&position) {
            p.volume = remaining;
        }

        let ticket = self.next_ticket();
        let deal = self.record_deal(TradeDeal {
            order: ticket,
            deal_type: side.order_type(),
            entry: consts::DEAL_ENTRY_OUT,
            position_id: position,
            symbol: spec.name.clone(),
            volume,
            price,
            profit,
            magic: req.magic.unwrap_or_default(),
            comment: req.comment.clone().unwrap_or_default(),
            ..Default::default()
        });

        debug!(position, symbol = %spec.name, volume, price, profit, remaining, "paper fill: close");
        Some(self.filled(ticket, deal, volume, price, spec))
    }

    fn remove(&mut self, req: &TradeRequest) -> Option<OrderSendResult> {
        let Some(ticket) = req.order else {
            self.last_error = TerminalError::new(-2, "Invalid arguments");
            return None;
        };
        match self.orders.remove(&ticket) {
            Some(order) => {
                debug!(ticket, symbol = %order.symbol, "paper order removed");
                let mut result = self.reply(consts::TRADE_RETCODE_DONE, "Request executed", Some(&order.symbol));
                result.order = ticket;
                Some(result)
            }
            None => Some(self.reply(consts::TRADE_RETCODE_INVALID_ORDER, "Invalid order", None)),
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn next_ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }

    fn record_deal(&mut self, mut deal: TradeDeal) -> u64 {
        self.clock += 1;
        deal.ticket = self.next_ticket();
        deal.time = self.clock;
        let ticket = deal.ticket;
        self.deals.push(deal);
        ticket
    }

    fn filled(&mut self, order: u64, deal: u64, volume: f64, price: f64, spec: &PaperSymbol) -> OrderSendResult {
        OrderSendResult {
            deal,
            order,
            volume,
            price,
            ..self.reply(consts::TRADE_RETCODE_DONE, "Request executed", Some(&spec.name))
        }
    }

    fn reply(&mut self, retcode: u32, comment: &str, symbol: Option<&str>) -> OrderSendResult {
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        let (bid, ask) = symbol
            .and_then(|s| self.symbols.get(s))
            .map(|s| (s.spec.bid, s.spec.ask))
            .unwrap_or_default();
        OrderSendResult {
            retcode,
            bid,
            ask,
            comment: comment.to_string(),
            request_id,
            ..Default::default()
        }
    }
}

fn success() -> TerminalError {
    TerminalError::new(1, "Success")
}

fn symbol_record(state: &SymbolState) -> SymbolInfo {
    let spec = &state.spec;
    SymbolInfo {
        name: spec.name.clone(),
        visible: state.visible,
        select: state.visible,
        bid: spec.bid,
        ask: spec.ask,
        digits: spec.digits,
        point: spec.point(),
        volume_min: spec.volume_min,
        volume_max: spec.volume_max,
        volume_step: spec.volume_step,
        trade_contract_size: spec.contract_size,
        description: spec.description.clone(),
        ..Default::default()
    }
}

fn close_quote(held: Side, spec: &PaperSymbol) -> f64 {
    match held {
        Side::Buy => spec.bid,
        Side::Sell => spec.ask,
    }
}

fn pnl(held: Side, open: f64, close: f64, volume: f64, spec: &PaperSymbol) -> f64 {
    let direction = match held {
        Side::Buy => 1.0,
        Side::Sell => -1.0,
    };
    (close - open) * direction * volume * spec.contract_size
}

fn round_volume(v: f64) -> f64 {
    (v * 1e8).round() / 1e8
}
