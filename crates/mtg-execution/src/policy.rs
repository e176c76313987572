//! Order submission policy: fixed request tags, fill-mode resolution,
//! registry retention and quote polling bounds.
//!
//! # Fill-mode resolution
//!
//! Callers have historically sent fill modes in two numberings: the terminal's
//! own (`0 = FOK, 1 = IOC, 2 = RETURN, 3 = BOC`) and a one-based variant that
//! is one higher. [`FillModePolicy::resolve`] applies a single rule chosen at
//! configuration time:
//!
//! | `caller_numbering` | caller sent `n` | caller sent nothing |
//! |--------------------|-----------------|---------------------|
//! | `ignore`           | `default`       | `default`           |
//! | `broker`           | `n`             | `default`           |
//! | `one_based`        | `n - 1`         | `default`           |
//!
//! Close-all never carries a caller value and always uses `default`.

use std::time::Duration;

use mtg_schemas::consts;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMode {
    Fok,
    Ioc,
    Return,
    Boc,
}

impl FillMode {
    pub fn as_wire(self) -> u32 {
        match self {
            FillMode::Fok => consts::ORDER_FILLING_FOK,
            FillMode::Ioc => consts::ORDER_FILLING_IOC,
            FillMode::Return => consts::ORDER_FILLING_RETURN,
            FillMode::Boc => consts::ORDER_FILLING_BOC,
        }
    }

    pub fn from_wire(value: i64) -> Option<FillMode> {
        match u32::try_from(value).ok()? {
            consts::ORDER_FILLING_FOK => Some(FillMode::Fok),
            consts::ORDER_FILLING_IOC => Some(FillMode::Ioc),
            consts::ORDER_FILLING_RETURN => Some(FillMode::Return),
            consts::ORDER_FILLING_BOC => Some(FillMode::Boc),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerNumbering {
    Ignore,
    Broker,
    OneBased,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillModePolicy {
    pub default: FillMode,
    pub caller_numbering: CallerNumbering,
}

impl Default for FillModePolicy {
    fn default() -> Self {
        Self {
            default: FillMode::Ioc,
            caller_numbering: CallerNumbering::Ignore,
        }
    }
}

impl FillModePolicy {
    pub fn resolve(&self, caller: Option<i64>) -> Result<FillMode, GatewayError> {
        let Some(raw) = caller else {
            return Ok(self.default);
        };
        let wire = match self.caller_numbering {
            CallerNumbering::Ignore => return Ok(self.default),
            CallerNumbering::Broker => Some(raw),
            CallerNumbering::OneBased => raw.checked_sub(1),
        };
        wire.and_then(FillMode::from_wire).ok_or_else(|| {
            GatewayError::InvalidRequest(format!(
                "filling_mode {raw} is out of range for {:?} numbering",
                self.caller_numbering
            ))
        })
    }
}

/// What happens to trade-identifier mappings once their position is closed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryClosePolicy {
    /// Keep the mapping; repeated partial closes by identifier keep working.
    #[default]
    Retain,
    /// Drop every identifier mapped to the ticket after a successful close.
    ReleaseOnClose,
}

/// Bounds for polling a symbol's quote while the terminal warms it up.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct QuoteRetry {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for QuoteRetry {
    fn default() -> Self {
        Self {
            attempts: 5,
            interval: Duration::from_secs(1),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderPolicy {
    /// Maximum tolerated slippage, in points.
    pub deviation: u32,
    /// Tag identifying orders placed by this gateway.
    pub magic: u64,
    pub comment_prefix: String,
    pub fill_mode: FillModePolicy,
    pub registry_close: RegistryClosePolicy,
    pub quote_retry: QuoteRetry,
}

impl Default for OrderPolicy {
    fn default() -> Self {
        Self {
            deviation: 10,
            magic: 234_000,
            comment_prefix: "gateway".to_string(),
            fill_mode: FillModePolicy::default(),
            registry_close: RegistryClosePolicy::Retain,
            quote_retry: QuoteRetry::default(),
        }
    }
}
