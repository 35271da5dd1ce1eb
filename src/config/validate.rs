// src/config/validate.rs

use std::path::Path;

use crate::artifacts::Manifest;
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{DevtoolError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::DevtoolError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_build(cfg)?;
    validate_lock(cfg)?;
    validate_services(cfg)?;
    Ok(())
}

fn validate_build(cfg: &RawConfigFile) -> Result<()> {
    ensure_command("[build].install_cmd", &cfg.build.install_cmd)?;
    ensure_command("[build].build_cmd", &cfg.build.build_cmd)?;
    ensure_relative("[build].entry_document", &cfg.build.entry_document)?;

    Manifest::from_lines(cfg.build.manifest.iter().map(String::as_str))
        .map_err(|e| DevtoolError::ConfigError(format!("[build].manifest: {e}")))?;

    Ok(())
}

fn validate_lock(cfg: &RawConfigFile) -> Result<()> {
    ensure_command("[lock].cmd", &cfg.lock.cmd)?;
    ensure_relative("[lock].lockfile", &cfg.lock.lockfile)?;
    Ok(())
}

fn validate_services(cfg: &RawConfigFile) -> Result<()> {
    for (name, svc) in cfg.services.iter() {
        validate_service_name(name)?;
        ensure_command(&format!("[services.{name}].cmd"), &svc.cmd)?;
        if let Some(port_env) = &svc.port_env {
            if port_env.trim().is_empty() {
                return Err(DevtoolError::ConfigError(format!(
                    "[services.{name}].port_env must not be empty"
                )));
            }
        }
    }
    Ok(())
}

/// Service names double as `name:cmd` CLI keys, so they can't contain the
/// separators.
pub fn validate_service_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(DevtoolError::ConfigError(
            "service name must not be empty".to_string(),
        ));
    }
    if name.contains([':', ',']) || name.chars().any(char::is_whitespace) {
        return Err(DevtoolError::ConfigError(format!(
            "service name '{name}' must not contain ':', ',' or whitespace"
        )));
    }
    Ok(())
}

fn ensure_command(field: &str, cmd: &str) -> Result<()> {
    if cmd.trim().is_empty() {
        return Err(DevtoolError::ConfigError(format!(
            "{field} must not be empty"
        )));
    }
    Ok(())
}

fn ensure_relative(field: &str, path: &str) -> Result<()> {
    let p = Path::new(path);
    if path.trim().is_empty() || p.is_absolute() || p.has_root() {
        return Err(DevtoolError::ConfigError(format!(
            "{field} must be a non-empty relative path (got '{path}')"
        )));
    }
    Ok(())
}
