//! Shared runtime state for mtg-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. Engine calls block (the
//! terminal session lock, quote polling, remote HTTP), so every one of them
//! runs through [`AppState::blocking`] on Tokio's blocking pool and never on
//! a runtime worker.

use std::sync::{Arc, Mutex, PoisonError};

use mtg_audit::AuditWriter;
use mtg_execution::{GatewayError, OrderEngine, TerminalClient};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::error::ApiError;

/// Terminal behind the engine: paper or remote, chosen at startup.
pub type DynTerminal = Box<dyn TerminalClient + Send>;

pub type Engine = OrderEngine<DynTerminal>;

/// Static build metadata included in `/ping`.
#[derive(Clone, Debug, Serialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            service: "mtg-daemon",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

pub struct AppState {
    pub build: BuildInfo,
    pub engine: Engine,
    /// Hash of the effective configuration, if one was loaded.
    pub config_hash: Option<String>,
    audit: Option<Mutex<AuditWriter>>,
}

impl AppState {
    pub fn new(engine: Engine) -> Self {
        Self {
            build: BuildInfo::default(),
            engine,
            config_hash: None,
            audit: None,
        }
    }

    pub fn with_audit(mut self, writer: AuditWriter) -> Self {
        self.audit = Some(Mutex::new(writer));
        self
    }

    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    pub fn audit_enabled(&self) -> bool {
        self.audit.is_some()
    }

    /// Run `op` on the blocking pool with access to the state.
    pub async fn blocking<R, F>(self: &Arc<Self>, op: F) -> Result<R, ApiError>
    where
        F: FnOnce(&AppState) -> Result<R, GatewayError> + Send + 'static,
        R: Send + 'static,
    {
        let st = Arc::clone(self);
        tokio::task::spawn_blocking(move || op(&*st))
            .await
            .map_err(|e| ApiError::Internal(format!("engine task failed: {e}")))?
            .map_err(ApiError::from)
    }

    /// Append one event to the audit log, if one is configured.
    ///
    /// A write failure is logged and does not fail the request: the terminal
    /// action it describes has already happened.
    pub fn record(&self, topic: &str, event_type: &str, payload: Value) {
        let Some(audit) = &self.audit else {
            return;
        };
        let mut writer = audit.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writer.append(topic, event_type, payload) {
            warn!(topic, event_type, error = %e, "audit append failed");
        }
    }
}
