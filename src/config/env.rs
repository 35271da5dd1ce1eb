// src/config/env.rs

//! Environment variables that shape spawned commands.
//!
//! - `DEVTOOL_MODE` (fallback `NODE_ENV`): `development` (default) or
//!   `production`. `DEVTOOL_MODE` is parsed strictly; any `NODE_ENV` value
//!   other than `production` means development.
//! - `DEVTOOL_FRONTEND_PORT` (fallback `PORT`): port handed to the front-end
//!   dev service.
//!
//! The environment is read once at startup into [`EnvSettings`]; nothing
//! downstream reads or mutates our own process environment.

use tracing::debug;

use crate::errors::{DevtoolError, Result};
use crate::types::RunMode;

pub const MODE_VAR: &str = "DEVTOOL_MODE";
pub const MODE_FALLBACK_VAR: &str = "NODE_ENV";
pub const PORT_VAR: &str = "DEVTOOL_FRONTEND_PORT";
pub const PORT_FALLBACK_VAR: &str = "PORT";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvSettings {
    pub mode: RunMode,
    pub frontend_port: Option<u16>,
}

impl EnvSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let mode = match (set(MODE_VAR), set(MODE_FALLBACK_VAR)) {
            (Some(value), _) => value
                .parse::<RunMode>()
                .map_err(|e| DevtoolError::ConfigError(format!("{MODE_VAR}: {e}")))?,
            (None, Some(value)) => node_env_mode(&value),
            (None, None) => RunMode::default(),
        };

        let port = set(PORT_VAR)
            .map(|v| (PORT_VAR, v))
            .or_else(|| set(PORT_FALLBACK_VAR).map(|v| (PORT_FALLBACK_VAR, v)));
        let frontend_port = match port {
            Some((var, value)) => Some(value.trim().parse::<u16>().map_err(|e| {
                DevtoolError::ConfigError(format!("{var}: invalid port '{value}': {e}"))
            })?),
            None => None,
        };

        Ok(Self {
            mode,
            frontend_port,
        })
    }
}

/// `NODE_ENV` is shared with the JS toolchain, which uses values such as
/// `test` or `staging`; only `production` selects production mode.
fn node_env_mode(value: &str) -> RunMode {
    match value.parse::<RunMode>() {
        Ok(mode) => mode,
        Err(_) => {
            debug!(
                var = MODE_FALLBACK_VAR,
                value, "unrecognised NODE_ENV value; using development mode"
            );
            RunMode::Development
        }
    }
}
