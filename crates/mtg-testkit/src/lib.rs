//! Shared fixtures for cross-crate scenario tests.
//!
//! Engines built here never sleep between quote polls, and
//! [`CountingTerminal`] wraps any terminal to count calls, detect overlapping
//! access and inject missing `order_send` results.

mod counting;
mod fixtures;

pub use counting::{CallLog, CountingTerminal};
pub use fixtures::{engine_from_yaml, paper_engine, paper_engine_with, zero_delay_policy};
