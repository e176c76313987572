use std::fmt;
use std::str::FromStr;

use mtg_schemas::{consts, OrderSendResult, SymbolInfo, Tick, TradeRequest};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Terminal order-type constant for a market order on this side.
    pub fn order_type(self) -> u32 {
        match self {
            Side::Buy => consts::ORDER_TYPE_BUY,
            Side::Sell => consts::ORDER_TYPE_SELL,
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Side of a terminal order/position type. Buy-side types are even,
    /// sell-side types odd; anything past the stop-limit pair has no side.
    pub fn from_order_type(order_type: u32) -> Option<Side> {
        match order_type {
            consts::ORDER_TYPE_BUY
            | consts::ORDER_TYPE_BUY_LIMIT
            | consts::ORDER_TYPE_BUY_STOP
            | consts::ORDER_TYPE_BUY_STOP_LIMIT => Some(Side::Buy),
            consts::ORDER_TYPE_SELL
            | consts::ORDER_TYPE_SELL_LIMIT
            | consts::ORDER_TYPE_SELL_STOP
            | consts::ORDER_TYPE_SELL_STOP_LIMIT => Some(Side::Sell),
            _ => None,
        }
    }

    /// Price paid to open on this side: buys lift the ask, sells hit the bid.
    pub fn open_price(self, tick: &Tick) -> f64 {
        match self {
            Side::Buy => tick.ask,
            Side::Sell => tick.bid,
        }
    }

    /// Price at which a position opened on this side is closed. Closing
    /// crosses the spread the other way: a buy closes at the bid.
    pub fn close_price(self, tick: &Tick) -> f64 {
        self.opposite().open_price(tick)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            other => Err(format!("unknown order side '{other}' (expected buy or sell)")),
        }
    }
}

impl Serialize for Side {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Accepts `"buy"`/`"SELL"` (any case) or the terminal's numeric order type.
impl<'de> Deserialize<'de> for Side {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SideVisitor;

        impl Visitor<'_> for SideVisitor {
            type Value = Side;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("\"buy\", \"sell\" or a terminal order type")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Side, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Side, E> {
                u32::try_from(v)
                    .ok()
                    .and_then(Side::from_order_type)
                    .ok_or_else(|| E::custom(format!("order type {v} has no side")))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Side, E> {
                u64::try_from(v)
                    .map_err(|_| E::custom(format!("order type {v} has no side")))
                    .and_then(|u| self.visit_u64(u))
            }
        }

        deserializer.deserialize_any(SideVisitor)
    }
}

// ---------------------------------------------------------------------------
// Trade identifier
// ---------------------------------------------------------------------------

/// Caller-chosen correlation token for one round-trip trade.
///
/// Callers send it as a string or a number; both normalize to the same
/// textual key, so `42` and `"42"` name the same trade.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TradeId(String);

impl TradeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for TradeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TradeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Unsigned(u64),
            Signed(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => TradeId(s),
            Raw::Unsigned(n) => TradeId(n.to_string()),
            Raw::Signed(n) => TradeId(n.to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// Intents
// ---------------------------------------------------------------------------

/// Desired opening action. Built per request, never stored.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderIntent {
    pub symbol: String,
    pub side: Side,
    pub volume: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    /// Raw caller fill-mode value; resolved by [`crate::FillModePolicy`].
    pub fill_mode: Option<i64>,
    /// Strategy tag; becomes the order comment when present.
    pub strategy: Option<String>,
    pub trade_id: Option<TradeId>,
}

impl OrderIntent {
    pub fn market(symbol: impl Into<String>, side: Side, volume: f64) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            volume,
            stop_loss: None,
            take_profit: None,
            fill_mode: None,
            strategy: None,
            trade_id: None,
        }
    }

    pub fn with_trade_id(mut self, trade_id: impl Into<String>) -> Self {
        self.trade_id = Some(TradeId::new(trade_id));
        self
    }
}

/// How a close request names the position to act on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CloseTarget {
    Ticket(u64),
    TradeId(TradeId),
}

impl fmt::Display for CloseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseTarget::Ticket(t) => write!(f, "{t}"),
            CloseTarget::TradeId(id) => write!(f, "{id}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CloseRequest {
    pub target: CloseTarget,
    /// Caller-trusted volume for a partial close. `None` closes the live volume.
    pub volume: Option<f64>,
    pub fill_mode: Option<i64>,
    /// Caller's belief about the position; the live record wins on mismatch.
    pub expected_symbol: Option<String>,
    pub expected_side: Option<Side>,
}

impl CloseRequest {
    pub fn ticket(ticket: u64) -> Self {
        Self::new(CloseTarget::Ticket(ticket))
    }

    pub fn trade_id(trade_id: impl Into<String>) -> Self {
        Self::new(CloseTarget::TradeId(TradeId::new(trade_id)))
    }

    fn new(target: CloseTarget) -> Self {
        Self {
            target,
            volume: None,
            fill_mode: None,
            expected_symbol: None,
            expected_side: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Accepted submission: the request as sent and the broker's record.
#[derive(Clone, Debug, PartialEq)]
pub struct Submission {
    pub ticket: u64,
    pub request: TradeRequest,
    pub result: OrderSendResult,
}

/// One position's outcome inside a close-all batch.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CloseAllItem {
    pub ticket: u64,
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<OrderSendResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CloseAllOutcome {
    NoOpenPositions,
    Closed(Vec<CloseAllItem>),
}

/// Result of a best-effort watch-list sweep.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WatchClearReport {
    pub removed: Vec<String>,
    pub failed: Vec<String>,
}

/// Symbol record after subscribe / quote settle / unsubscribe.
#[derive(Clone, Debug, PartialEq)]
pub struct SymbolQuote {
    pub info: SymbolInfo,
    /// `false` when the retry budget ran out with the ask still at zero.
    pub quote_settled: bool,
    /// Re-fetches performed after the first read.
    pub retries: u32,
}
