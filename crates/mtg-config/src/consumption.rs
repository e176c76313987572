//! Unknown-key guard.
//!
//! Every key the daemon reads lives under one of [`CONSUMED_PREFIXES`]. A leaf
//! outside them is a typo or a stale setting. [`report_unknown_keys`] lists
//! such leaves and, under [`UnknownKeyPolicy::Fail`], refuses the config.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pointer;

/// Sections of the configuration the daemon reads.
pub const CONSUMED_PREFIXES: &[&str] = &[
    "/server/addr",
    "/server/cors_origins",
    "/terminal/transport",
    "/terminal/remote",
    "/terminal/paper",
    "/orders",
    "/symbols/quote_retry_attempts",
    "/symbols/quote_retry_interval_ms",
    "/audit/path",
    "/audit/hash_chain",
];

/// How many unknown pointers a `Fail` error quotes.
const ERROR_PREVIEW: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnknownKeyReport {
    /// Sorted leaf pointers not covered by any consumed prefix.
    pub unknown_leaf_pointers: Vec<String>,
}

impl UnknownKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unknown_leaf_pointers.is_empty()
    }
}

pub fn report_unknown_keys(config_json: &Value, policy: UnknownKeyPolicy) -> Result<UnknownKeyReport> {
    let mut unknown: Vec<String> = pointer::leaves(config_json)
        .into_iter()
        .map(|(ptr, _)| ptr)
        .filter(|ptr| !CONSUMED_PREFIXES.iter().any(|prefix| pointer::covers(prefix, ptr)))
        .collect();
    unknown.sort();

    if policy == UnknownKeyPolicy::Fail && !unknown.is_empty() {
        let preview: Vec<&str> = unknown.iter().take(ERROR_PREVIEW).map(String::as_str).collect();
        bail!(
            "CONFIG_UNKNOWN_KEYS: {} config key(s) are not read by the gateway: {}",
            unknown.len(),
            preview.join(", ")
        );
    }

    Ok(UnknownKeyReport {
        unknown_leaf_pointers: unknown,
    })
}
