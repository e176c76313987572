//! Trade identifier → broker ticket mapping.
//!
//! # Problem
//!
//! Callers name a round-trip trade with their own identifier and never learn
//! the terminal's ticket. To close "trade T1" the gateway must remember which
//! ticket T1 opened.
//!
//! # Contract
//!
//! 1. [`TradeIdMap::record`] after every *successful* open that carried an
//!    identifier. A reused identifier overwrites its previous ticket.
//! 2. [`TradeIdMap::resolve`] before closing by identifier. `None` means the
//!    close MUST be refused without contacting the terminal; never guess a
//!    ticket.
//! 3. [`TradeIdMap::release_ticket`] only under
//!    [`crate::RegistryClosePolicy::ReleaseOnClose`].
//!
//! Entries never expire and are not persisted.
//!
//! # Thread-safety
//! `TradeIdMap` is not `Sync`. [`crate::OrderEngine`] keeps it behind a
//! `Mutex` and holds the lock for exactly one read or one write.

use std::collections::BTreeMap;

use crate::types::TradeId;

#[derive(Clone, Debug, Default)]
pub struct TradeIdMap {
    /// trade_id → ticket
    map: BTreeMap<TradeId, u64>,
}

impl TradeIdMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the ticket previously mapped to `trade_id`, if any.
    pub fn record(&mut self, trade_id: TradeId, ticket: u64) -> Option<u64> {
        self.map.insert(trade_id, ticket)
    }

    pub fn resolve(&self, trade_id: &TradeId) -> Option<u64> {
        self.map.get(trade_id).copied()
    }

    /// Remove every identifier mapped to `ticket`. Returns the removed ids.
    pub fn release_ticket(&mut self, ticket: u64) -> Vec<TradeId> {
        let released: Vec<TradeId> = self
            .map
            .iter()
            .filter(|(_, t)| **t == ticket)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &released {
            self.map.remove(id);
        }
        released
    }

    /// Ordered snapshot for diagnostics.
    pub fn entries(&self) -> Vec<(TradeId, u64)> {
        self.map.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
