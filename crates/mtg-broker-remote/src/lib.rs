//! Remote terminal adapter.
//!
//! Forwards every [`TerminalClient`] call to a terminal bridge over HTTP as a
//! JSON RPC envelope:
//!
//! ```text
//! POST {base_url}/rpc
//! {"method": "symbol_info", "params": {"symbol": "EURUSD"}}
//!
//! 200 {"result": {...}}                               success (null = absent)
//! 200 {"error": {"code": -2, "message": "..."}}       terminal diagnostic
//! ```
//!
//! The bridge owns the real terminal session; this crate only encodes and
//! decodes. Calls are blocking (`reqwest::blocking`). Callers running inside
//! a Tokio runtime must invoke them from a blocking context
//! (`spawn_blocking` / `block_in_place`).

use std::time::Duration;

use chrono::{DateTime, Utc};
use mtg_execution::{TerminalClient, TerminalError, TerminalResult};
use mtg_schemas::{
    AccountInfo, OrderSendResult, SymbolInfo, Tick, TradeDeal, TradeOrder, TradePosition,
    TradeRequest,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

mod codec;

pub use codec::{decode_reply, RpcCall, RpcFault, RpcReply};

/// Connection settings for a terminal bridge.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteSettings {
    pub base_url: String,
    pub timeout: Duration,
    /// Bearer token sent with every call, if the bridge requires one.
    pub token: Option<String>,
}

impl std::fmt::Debug for RemoteSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSettings")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl RemoteSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(10),
            token: None,
        }
    }

    fn rpc_url(&self) -> String {
        format!("{}/rpc", self.base_url.trim_end_matches('/'))
    }
}

pub struct RemoteTerminal {
    http: reqwest::blocking::Client,
    url: String,
    token: Option<String>,
}

impl std::fmt::Debug for RemoteTerminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteTerminal")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl RemoteTerminal {
    pub fn connect(settings: &RemoteSettings) -> TerminalResult<Self> {
        if settings.base_url.trim().is_empty() {
            return Err(TerminalError::transport("remote terminal url is empty"));
        }
        let http = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| TerminalError::transport(format!("http client build failed: {e}")))?;
        Ok(Self {
            http,
            url: settings.rpc_url(),
            token: settings.token.clone(),
        })
    }

    fn call<T: DeserializeOwned>(&self, method: &'static str, params: Value) -> TerminalResult<T> {
        debug!(method, "remote terminal call");
        let mut req = self.http.post(&self.url).json(&RpcCall { method, params });
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .map_err(|e| TerminalError::transport(format!("{method}: {e}")))?;
        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| TerminalError::transport(format!("{method}: reading body: {e}")))?;
        if !status.is_success() {
            return Err(TerminalError::transport(format!(
                "{method}: bridge answered HTTP {status}: {body}"
            )));
        }

        let reply: RpcReply = serde_json::from_str(&body)
            .map_err(|e| TerminalError::transport(format!("{method}: malformed reply: {e}")))?;
        decode_reply(method, reply)
    }
}

impl TerminalClient for RemoteTerminal {
    fn initialize(&mut self) -> TerminalResult<()> {
        let ok: bool = self.call("initialize", json!({}))?;
        if ok {
            Ok(())
        } else {
            Err(self.last_error())
        }
    }

    fn last_error(&mut self) -> TerminalError {
        match self.call::<RpcFault>("last_error", json!({})) {
            Ok(fault) => fault.into(),
            Err(e) => e,
        }
    }

    fn account_info(&mut self) -> TerminalResult<AccountInfo> {
        self.call("account_info", json!({}))
    }

    fn orders_get(&mut self) -> TerminalResult<Vec<TradeOrder>> {
        Ok(self
            .call::<Option<Vec<TradeOrder>>>("orders_get", json!({}))?
            .unwrap_or_default())
    }

    fn order_get(&mut self, ticket: u64) -> TerminalResult<Option<TradeOrder>> {
        self.call("order_get", json!({ "ticket": ticket }))
    }

    fn positions_get(&mut self) -> TerminalResult<Vec<TradePosition>> {
        Ok(self
            .call::<Option<Vec<TradePosition>>>("positions_get", json!({}))?
            .unwrap_or_default())
    }

    fn symbols_get(&mut self) -> TerminalResult<Vec<SymbolInfo>> {
        Ok(self
            .call::<Option<Vec<SymbolInfo>>>("symbols_get", json!({}))?
            .unwrap_or_default())
    }

    fn symbol_info(&mut self, symbol: &str) -> TerminalResult<Option<SymbolInfo>> {
        self.call("symbol_info", json!({ "symbol": symbol }))
    }

    fn symbol_select(&mut self, symbol: &str, visible: bool) -> TerminalResult<bool> {
        self.call("symbol_select", json!({ "symbol": symbol, "enable": visible }))
    }

    fn symbol_info_tick(&mut self, symbol: &str) -> TerminalResult<Option<Tick>> {
        self.call("symbol_info_tick", json!({ "symbol": symbol }))
    }

    fn history_deals_get(
        &mut self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> TerminalResult<Vec<TradeDeal>> {
        Ok(self
            .call::<Option<Vec<TradeDeal>>>(
                "history_deals_get",
                json!({ "date_from": from.timestamp(), "date_to": to.timestamp() }),
            )?
            .unwrap_or_default())
    }

    fn order_send(&mut self, request: &TradeRequest) -> TerminalResult<Option<OrderSendResult>> {
        self.call("order_send", json!({ "request": request }))
    }
}
