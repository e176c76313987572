//! Typed view of the effective configuration.
//!
//! Every field has a default, so an empty configuration is a working paper
//! gateway on `127.0.0.1:5000`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use mtg_broker_paper::PaperSymbol;
use mtg_execution::{FillModePolicy, OrderPolicy, QuoteRetry, RegistryClosePolicy};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub terminal: TerminalConfig,
    pub orders: OrdersConfig,
    pub symbols: SymbolsConfig,
    pub audit: AuditConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    /// Browser origins allowed by CORS.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:5000".to_string(),
            cors_origins: [
                "http://localhost",
                "http://127.0.0.1",
                "http://localhost:3000",
                "http://127.0.0.1:3000",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    #[default]
    Paper,
    Remote,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    pub transport: Transport,
    pub remote: RemoteConfig,
    pub paper: PaperConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub url: String,
    pub timeout_ms: u64,
    /// NAME of the env var holding the bridge's bearer token.
    pub token_env: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_ms: 10_000,
            token_env: None,
        }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperConfig {
    pub balance: f64,
    /// Empty means the built-in demo symbols.
    pub symbols: Vec<PaperSymbol>,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            balance: 10_000.0,
            symbols: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrdersConfig {
    pub deviation_points: u32,
    pub magic: u64,
    pub comment_prefix: String,
    pub fill_mode: FillModePolicy,
    pub registry_close_policy: RegistryClosePolicy,
}

impl Default for OrdersConfig {
    fn default() -> Self {
        let p = OrderPolicy::default();
        Self {
            deviation_points: p.deviation,
            magic: p.magic,
            comment_prefix: p.comment_prefix,
            fill_mode: p.fill_mode,
            registry_close_policy: p.registry_close,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolsConfig {
    pub quote_retry_attempts: u32,
    pub quote_retry_interval_ms: u64,
}

impl Default for SymbolsConfig {
    fn default() -> Self {
        Self {
            quote_retry_attempts: 5,
            quote_retry_interval_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// JSONL audit file. `None` disables auditing.
    pub path: Option<PathBuf>,
    pub hash_chain: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            path: None,
            hash_chain: true,
        }
    }
}

impl GatewayConfig {
    /// Deserialize and validate the merged JSON produced by
    /// [`crate::load_layered_yaml`].
    pub fn from_json(config_json: &Value) -> Result<Self> {
        let cfg: GatewayConfig =
            serde_json::from_value(config_json.clone()).context("CONFIG_INVALID: schema mismatch")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.bind_addr()?;
        if self.terminal.transport == Transport::Remote && self.terminal.remote.url.trim().is_empty() {
            bail!("CONFIG_INVALID: terminal.remote.url is required when transport is remote");
        }
        if self.terminal.remote.timeout_ms == 0 {
            bail!("CONFIG_INVALID: terminal.remote.timeout_ms must be positive");
        }
        if self.orders.comment_prefix.trim().is_empty() {
            bail!("CONFIG_INVALID: orders.comment_prefix must not be empty");
        }
        for s in &self.terminal.paper.symbols {
            if s.name.trim().is_empty() || s.bid < 0.0 || s.ask < s.bid {
                bail!("CONFIG_INVALID: paper symbol '{}' has an invalid quote", s.name);
            }
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .addr
            .parse()
            .with_context(|| format!("CONFIG_INVALID: server.addr '{}' is not host:port", self.server.addr))
    }

    pub fn order_policy(&self) -> OrderPolicy {
        OrderPolicy {
            deviation: self.orders.deviation_points,
            magic: self.orders.magic,
            comment_prefix: self.orders.comment_prefix.clone(),
            fill_mode: self.orders.fill_mode,
            registry_close: self.orders.registry_close_policy,
            quote_retry: QuoteRetry {
                attempts: self.symbols.quote_retry_attempts,
                interval: Duration::from_millis(self.symbols.quote_retry_interval_ms),
            },
        }
    }
}
