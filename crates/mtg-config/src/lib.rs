//! Layered gateway configuration.
//!
//! YAML layers are merged in order, later layers overriding earlier ones key
//! by key, then rendered as canonical JSON and hashed. The hash identifies the
//! exact effective configuration a daemon ran with and is logged at startup.
//!
//! Secrets never live in YAML: a leaf string that looks like a credential
//! aborts loading with `CONFIG_SECRET_DETECTED`. YAML stores env var NAMES
//! only; see [`secrets`].

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

mod consumption;
mod gateway;
mod pointer;
pub mod secrets;

pub use consumption::{report_unknown_keys, UnknownKeyPolicy, UnknownKeyReport, CONSUMED_PREFIXES};
pub use gateway::{
    AuditConfig, GatewayConfig, OrdersConfig, PaperConfig, RemoteConfig, ServerConfig,
    SymbolsConfig, TerminalConfig, Transport,
};
pub use secrets::{resolve_secrets, resolve_secrets_with, ResolvedSecrets};

/// Leaf strings starting with one of these are literal credentials.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",
    "sk_live",
    "sk_test",
    "AKIA",
    "-----BEGIN",
    "ghp_",
    "gho_",
    "glpat-",
    "xoxb-",
    "xoxp-",
    "Bearer ",
];

/// Shorter strings are never treated as credentials.
const MIN_SECRET_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Lowercase hex SHA-256 of `canonical_json`.
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

/// Read and merge YAML files in argument order.
pub fn load_layered_yaml<P: AsRef<Path>>(paths: &[P]) -> Result<LoadedConfig> {
    let docs = paths
        .iter()
        .map(|p| {
            let p = p.as_ref();
            fs::read_to_string(p).with_context(|| format!("read config layer {}", p.display()))
        })
        .collect::<Result<Vec<String>>>()?;

    let refs: Vec<&str> = docs.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Map::new());
    for (i, raw) in yaml_docs.iter().enumerate() {
        let layer: serde_yaml::Value =
            serde_yaml::from_str(raw).with_context(|| format!("config layer {i}: invalid yaml"))?;
        // An empty document parses as null.
        if layer.is_null() {
            continue;
        }
        let layer = serde_json::to_value(layer)
            .with_context(|| format!("config layer {i}: not representable as json"))?;
        overlay(&mut merged, layer);
    }

    reject_secret_literals(&merged)?;

    // `serde_json::Map` keeps keys sorted, so compact output is canonical.
    let canonical_json = serde_json::to_string(&merged).context("render canonical config")?;
    let config_hash = hex::encode(Sha256::digest(canonical_json.as_bytes()));
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

/// Objects merge recursively; any other value replaces what was there.
fn overlay(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base_map), Value::Object(layer_map)) => {
            for (key, value) in layer_map {
                overlay(base_map.entry(key).or_insert(Value::Null), value);
            }
        }
        (slot, value) => *slot = value,
    }
}

fn reject_secret_literals(config: &Value) -> Result<()> {
    let found = pointer::leaves(config)
        .into_iter()
        .find(|(_, v)| v.as_str().is_some_and(looks_like_secret));
    if let Some((ptr, _)) = found {
        bail!("CONFIG_SECRET_DETECTED leaf={ptr} value=REDACTED");
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let s = s.trim();
    s.len() >= MIN_SECRET_LEN && SECRET_PREFIXES.iter().any(|p| s.starts_with(p))
}
