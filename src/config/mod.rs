// src/config/mod.rs

//! Configuration loading and validation for devtool.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate it (`validate.rs`).
//! - Read the environment variables we honor (`env.rs`).
//! - Resolve config into runnable `CommandSpec`s (`commands.rs`).

pub mod commands;
pub mod env;
pub mod loader;
pub mod model;
pub mod validate;

pub use env::EnvSettings;
pub use loader::{default_config_path, load_and_validate, load_for_cli, load_from_path};
pub use model::{
    BuildSection, ConfigFile, EnvSection, LockSection, RawConfigFile, ServiceConfig,
};
pub use validate::validate_service_name;
