//! Runtime secret resolution.
//!
//! # Contract
//! - Config YAML stores only env var NAMES (`terminal.remote.token_env`).
//! - The daemon calls [`resolve_secrets`] once at startup and passes the
//!   result to constructors; nothing else reads the environment for secrets.
//! - `Debug` redacts values; errors name the variable, never its value.
//!
//! # Enforcement
//! | Transport | `token_env` set | Variable unset / blank |
//! |-----------|-----------------|------------------------|
//! | remote    | yes             | error                  |
//! | remote    | no              | no token sent          |
//! | paper     | any             | ignored                |

use anyhow::{bail, Result};

use crate::gateway::{GatewayConfig, Transport};

#[derive(Clone, Default)]
pub struct ResolvedSecrets {
    /// Bearer token for the remote terminal bridge.
    pub remote_token: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field(
                "remote_token",
                &self.remote_token.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

/// Resolve secrets from the process environment.
pub fn resolve_secrets(cfg: &GatewayConfig) -> Result<ResolvedSecrets> {
    resolve_secrets_with(cfg, |name| std::env::var(name).ok())
}

/// Resolve secrets through `lookup` (env var name → value).
pub fn resolve_secrets_with(
    cfg: &GatewayConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedSecrets> {
    if cfg.terminal.transport != Transport::Remote {
        return Ok(ResolvedSecrets::default());
    }

    let Some(var) = cfg
        .terminal
        .remote
        .token_env
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
    else {
        return Ok(ResolvedSecrets::default());
    };

    match lookup(var).filter(|v| !v.trim().is_empty()) {
        Some(token) => Ok(ResolvedSecrets {
            remote_token: Some(token),
        }),
        None => bail!(
            "SECRETS_MISSING: required env var '{}' (remote terminal token) is not set or empty",
            var
        ),
    }
}
