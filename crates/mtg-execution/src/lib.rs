//! mtg-execution
//!
//! Order engine for a single trading-terminal session.
//!
//! - `TerminalClient` is the seam to the terminal; adapters live in their own
//!   crates (`mtg-broker-paper`, `mtg-broker-remote`).
//! - `BrokerGateway` is the only path to the terminal and serializes every
//!   call against the one session.
//! - `OrderEngine` builds trade requests from intents, resolves trade
//!   identifiers to tickets and classifies broker outcomes.
//!
//! No HTTP, no configuration loading, no persistence.

mod engine;
mod error;
mod gateway;
mod id_map;
mod policy;
mod symbols;
mod terminal;
mod types;

#[cfg(test)]
mod mock;

pub use engine::{truncate_comment, OrderEngine, MAX_COMMENT_CHARS};
pub use error::GatewayError;
pub use gateway::BrokerGateway;
pub use id_map::TradeIdMap;
pub use policy::{
    CallerNumbering, FillMode, FillModePolicy, OrderPolicy, QuoteRetry, RegistryClosePolicy,
};
pub use symbols::SymbolWatch;
pub use terminal::{TerminalClient, TerminalError, TerminalResult};
pub use types::{
    CloseAllItem, CloseAllOutcome, CloseRequest, CloseTarget, OrderIntent, Side, Submission,
    SymbolQuote, TradeId, WatchClearReport,
};
