// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::fmt;

use thiserror::Error;

use crate::exec::CommandSpec;

/// Why a process could not be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnErrorKind {
    /// The working directory does not exist or is not a directory.
    WorkingDirectory,
    /// The executable (or the shell wrapping it) could not be found.
    NotFound,
    PermissionDenied,
    Other,
}

impl SpawnErrorKind {
    pub fn from_io(err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => SpawnErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => SpawnErrorKind::PermissionDenied,
            _ => SpawnErrorKind::Other,
        }
    }
}

impl fmt::Display for SpawnErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SpawnErrorKind::WorkingDirectory => "invalid working directory",
            SpawnErrorKind::NotFound => "executable not found",
            SpawnErrorKind::PermissionDenied => "permission denied",
            SpawnErrorKind::Other => "spawn failed",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum DevtoolError {
    #[error("Failed to spawn `{spec}` ({kind}): {source}")]
    Spawn {
        spec: Box<CommandSpec>,
        kind: SpawnErrorKind,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Manifest error: {0}")]
    ManifestError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DevtoolError {
    /// Build a spawn error for `spec` from the underlying I/O failure.
    pub fn spawn(spec: &CommandSpec, source: std::io::Error) -> Self {
        DevtoolError::Spawn {
            spec: Box::new(spec.clone()),
            kind: SpawnErrorKind::from_io(&source),
            source,
        }
    }

    /// Spawn error raised before the process is created because its working
    /// directory is unusable.
    pub fn working_directory(spec: &CommandSpec, source: std::io::Error) -> Self {
        DevtoolError::Spawn {
            spec: Box::new(spec.clone()),
            kind: SpawnErrorKind::WorkingDirectory,
            source,
        }
    }

    pub fn is_spawn(&self) -> bool {
        matches!(self, DevtoolError::Spawn { .. })
    }
}

pub type Result<T> = std::result::Result<T, DevtoolError>;
