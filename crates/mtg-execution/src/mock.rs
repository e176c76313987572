//! Scriptable terminal double for unit tests. Records every call it sees.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use chrono::{DateTime, Utc};
use mtg_schemas::{
    consts, AccountInfo, OrderSendResult, SymbolInfo, Tick, TradeDeal, TradeOrder, TradePosition,
    TradeRequest,
};

use crate::terminal::{TerminalClient, TerminalError, TerminalResult};

pub(crate) struct MockTerminal {
    pub init_error: Option<TerminalError>,
    pub last_err: TerminalError,
    pub account: AccountInfo,
    pub symbols: BTreeMap<String, SymbolInfo>,
    /// Number of `symbol_info` reads that report `ask = 0` before the real quote.
    pub cold_reads: u32,
    pub ticks: BTreeMap<String, Tick>,
    pub positions: Vec<TradePosition>,
    pub orders: Vec<TradeOrder>,
    pub deals: Vec<TradeDeal>,
    /// Return codes handed out by successive `order_send` calls (default DONE).
    pub retcodes: VecDeque<u32>,
    pub send_returns_none: bool,
    pub refuse_select: BTreeSet<String>,
    pub failing_ticks: BTreeSet<String>,
    pub next_ticket: u64,

    pub sent: Vec<TradeRequest>,
    pub selects: Vec<(String, bool)>,
    pub symbol_info_reads: u32,
    pub tick_reads: u32,
    pub init_calls: u32,
    pub calls: u32,
    pub in_call: u32,
}

impl Default for MockTerminal {
    fn default() -> Self {
        Self {
            init_error: None,
            last_err: TerminalError::new(1, "Success"),
            account: AccountInfo::default(),
            symbols: BTreeMap::new(),
            cold_reads: 0,
            ticks: BTreeMap::new(),
            positions: Vec::new(),
            orders: Vec::new(),
            deals: Vec::new(),
            retcodes: VecDeque::new(),
            send_returns_none: false,
            refuse_select: BTreeSet::new(),
            failing_ticks: BTreeSet::new(),
            next_ticket: 5000,
            sent: Vec::new(),
            selects: Vec::new(),
            symbol_info_reads: 0,
            tick_reads: 0,
            init_calls: 0,
            calls: 0,
            in_call: 0,
        }
    }
}

impl MockTerminal {
    pub fn with_symbol(mut self, name: &str, bid: f64, ask: f64) -> Self {
        self.symbols.insert(
            name.to_string(),
            SymbolInfo {
                name: name.to_string(),
                bid,
                ask,
                ..Default::default()
            },
        );
        self.ticks.insert(
            name.to_string(),
            Tick {
                bid,
                ask,
                ..Default::default()
            },
        );
        self
    }

    pub fn with_position(mut self, ticket: u64, symbol: &str, position_type: u32, volume: f64) -> Self {
        self.positions.push(TradePosition {
            ticket,
            symbol: symbol.to_string(),
            position_type,
            volume,
            ..Default::default()
        });
        self
    }

    pub fn submitted_deals(&self) -> usize {
        self.sent
            .iter()
            .filter(|r| r.action == consts::TRADE_ACTION_DEAL)
            .count()
    }
}

impl TerminalClient for MockTerminal {
    fn initialize(&mut self) -> TerminalResult<()> {
        self.init_calls += 1;
        match &self.init_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn last_error(&mut self) -> TerminalError {
        self.last_err.clone()
    }

    fn account_info(&mut self) -> TerminalResult<AccountInfo> {
        Ok(self.account.clone())
    }

    fn orders_get(&mut self) -> TerminalResult<Vec<TradeOrder>> {
        Ok(self.orders.clone())
    }

    fn order_get(&mut self, ticket: u64) -> TerminalResult<Option<TradeOrder>> {
        Ok(self.orders.iter().find(|o| o.ticket == ticket).cloned())
    }

    fn positions_get(&mut self) -> TerminalResult<Vec<TradePosition>> {
        Ok(self.positions.clone())
    }

    fn symbols_get(&mut self) -> TerminalResult<Vec<SymbolInfo>> {
        Ok(self.symbols.values().cloned().collect())
    }

    fn symbol_info(&mut self, symbol: &str) -> TerminalResult<Option<SymbolInfo>> {
        self.symbol_info_reads += 1;
        let cold = self.cold_reads > 0;
        if cold {
            self.cold_reads -= 1;
        }
        Ok(self.symbols.get(symbol).cloned().map(|mut info| {
            if cold {
                info.ask = 0.0;
                info.bid = 0.0;
            }
            info
        }))
    }

    fn symbol_select(&mut self, symbol: &str, visible: bool) -> TerminalResult<bool> {
        self.selects.push((symbol.to_string(), visible));
        if self.refuse_select.contains(symbol) {
            return Ok(false);
        }
        match self.symbols.get_mut(symbol) {
            Some(info) => {
                info.visible = visible;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn symbol_info_tick(&mut self, symbol: &str) -> TerminalResult<Option<Tick>> {
        self.tick_reads += 1;
        if self.failing_ticks.contains(symbol) {
            return Err(TerminalError::new(-2, format!("no tick for {symbol}")));
        }
        Ok(self.ticks.get(symbol).copied())
    }

    fn history_deals_get(
        &mut self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> TerminalResult<Vec<TradeDeal>> {
        let (from, to) = (from.timestamp(), to.timestamp());
        Ok(self
            .deals
            .iter()
            .filter(|d| d.time >= from && d.time <= to)
            .cloned()
            .collect())
    }

    fn order_send(&mut self, request: &TradeRequest) -> TerminalResult<Option<OrderSendResult>> {
        self.sent.push(request.clone());
        if self.send_returns_none {
            return Ok(None);
        }
        let retcode = self
            .retcodes
            .pop_front()
            .unwrap_or(consts::TRADE_RETCODE_DONE);
        self.next_ticket += 1;
        Ok(Some(OrderSendResult {
            retcode,
            order: if consts::is_success_retcode(retcode) {
                self.next_ticket
            } else {
                0
            },
            volume: request.volume.map(f64::from).unwrap_or_default(),
            price: request.price.map(f64::from).unwrap_or_default(),
            comment: "mock".to_string(),
            ..Default::default()
        }))
    }
}
