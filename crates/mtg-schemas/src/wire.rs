//! Always-fractional wire numbers.
//!
//! # Problem
//!
//! The terminal's transport decides between its integer and floating-point
//! types by looking at how a number is written. A volume of `1` (or a price
//! of `2`) that reaches it as an integer literal is miscategorized and the
//! request is rejected or misread.
//!
//! # Invariant
//!
//! Every volume, price, stop-loss and take-profit field of a
//! [`crate::TradeRequest`] is a [`WireF64`]. Its `Serialize` impl always goes
//! through `serialize_f64`, so a whole value is emitted as `1.0`, never `1`,
//! whatever the caller originally sent. The stored value is the caller's
//! value unchanged; nothing is added or subtracted.
//!
//! | Input            | Serialized |
//! |------------------|------------|
//! | `1` (integer)    | `1.0`      |
//! | `1.1`            | `1.1`      |
//! | `250`            | `250.0`    |
//!
//! Non-finite values cannot be represented on the wire and are rejected at
//! construction.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WireNumberError {
    /// NaN or infinite input. Indicates a broken upstream value.
    #[error("wire number must be finite (got NaN or Inf)")]
    NotFinite,
}

/// A finite `f64` that always serializes in fractional form.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct WireF64(f64);

impl WireF64 {
    pub fn new(value: f64) -> Result<Self, WireNumberError> {
        if !value.is_finite() {
            return Err(WireNumberError::NotFinite);
        }
        Ok(Self(value))
    }

    /// Integral input (e.g. a lot count parsed as an integer).
    pub fn from_integer(value: i64) -> Self {
        Self(value as f64)
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl fmt::Display for WireF64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `{:?}` keeps the trailing `.0` on whole values.
        write!(f, "{:?}", self.0)
    }
}

impl TryFrom<f64> for WireF64 {
    type Error = WireNumberError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<WireF64> for f64 {
    fn from(v: WireF64) -> Self {
        v.0
    }
}

impl Serialize for WireF64 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0)
    }
}

impl<'de> Deserialize<'de> for WireF64 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = f64::deserialize(deserializer)?;
        WireF64::new(raw).map_err(serde::de::Error::custom)
    }
}

/// `true` if `literal` is a JSON number written in floating-point form.
///
/// This is the classification the terminal transport applies to the encoded
/// payload.
pub fn is_fractional_literal(literal: &str) -> bool {
    let t = literal.trim();
    t.parse::<f64>().is_ok() && (t.contains('.') || t.contains('e') || t.contains('E'))
}
