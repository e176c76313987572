//! Broker Gateway: the single critical section around the terminal session.
//!
//! The terminal transport is one logical session and is not safe for
//! unmediated concurrent use. `BrokerGateway` owns the only
//! [`TerminalClient`] instance behind a mutex; every terminal call made by
//! the engine goes through [`BrokerGateway::call`], which holds the lock for
//! exactly one terminal operation.
//!
//! ```text
//! request thread A ──┐
//! request thread B ──┼──► BrokerGateway::call ──► Mutex<B> ──► TerminalClient::*
//! request thread C ──┘         (one call at a time)
//! ```
//!
//! Waiting (quote polling sleeps) happens on the caller's own thread with the
//! lock released, so a slow symbol lookup never stalls unrelated requests.

use std::sync::{Mutex, PoisonError};

use crate::error::GatewayError;
use crate::terminal::TerminalClient;

pub struct BrokerGateway<B: TerminalClient> {
    session: Mutex<B>,
}

impl<B: TerminalClient> BrokerGateway<B> {
    pub fn new(terminal: B) -> Self {
        Self {
            session: Mutex::new(terminal),
        }
    }

    /// Run one terminal operation under the session lock.
    ///
    /// A poisoned lock is recovered: a panic inside a previous call cannot
    /// leave a half-built request behind, since requests are built outside
    /// the lock and passed in whole.
    pub(crate) fn call<R>(&self, op: impl FnOnce(&mut B) -> R) -> R {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        op(&mut session)
    }

    /// Ensure the terminal session is up. Fails with
    /// [`GatewayError::BrokerUnavailable`] carrying the terminal diagnostic.
    pub fn initialize(&self) -> Result<(), GatewayError> {
        self.call(|t| t.initialize())
            .map_err(GatewayError::BrokerUnavailable)
    }
}
