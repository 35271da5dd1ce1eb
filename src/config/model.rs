// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::artifacts::DEFAULT_ENTRY_DOCUMENT;
use crate::types::OutputMode;

/// Configuration as read from `Devtool.toml`, before validation.
///
/// ```toml
/// [build]
/// dir = "web"
/// install_cmd = "npm ci"
/// manifest = ["index.html", "assets/app.js"]
///
/// [services.frontend]
/// cmd = "npm run dev"
/// cwd = "web"
/// port_env = "PORT"
///
/// [services.backend]
/// cmd = "cargo run"
/// cwd = "server"
///
/// [env.production]
/// API_URL = "/api"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub build: BuildSection,

    #[serde(default)]
    pub lock: LockSection,

    /// Dev services from `[services.<name>]`, keyed by service name.
    #[serde(default)]
    pub services: BTreeMap<String, ServiceConfig>,

    #[serde(default)]
    pub env: EnvSection,
}

/// Validated configuration. Only obtainable through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub build: BuildSection,
    pub lock: LockSection,
    pub services: BTreeMap<String, ServiceConfig>,
    pub env: EnvSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            build: raw.build,
            lock: raw.lock,
            services: raw.services,
            env: raw.env,
        }
    }
}

/// `[build]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildSection {
    /// Working directory for the install and build commands.
    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    /// Build output directory; defaults to `<dir>/dist`.
    #[serde(default)]
    pub out_dir: Option<PathBuf>,

    #[serde(default = "default_install_cmd")]
    pub install_cmd: String,

    #[serde(default = "default_build_cmd")]
    pub build_cmd: String,

    /// Expected artifacts, one manifest line each (`?path` = optional).
    #[serde(default)]
    pub manifest: Vec<String>,

    /// Entry document the static server falls back to; always required.
    #[serde(default = "default_entry_document")]
    pub entry_document: String,

    /// Output mode for install/build. Forced to `captured` with `--json`.
    #[serde(default = "default_build_output")]
    pub output: OutputMode,
}

impl BuildSection {
    pub fn effective_out_dir(&self) -> PathBuf {
        self.out_dir
            .clone()
            .unwrap_or_else(|| self.dir.join("dist"))
    }
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            out_dir: None,
            install_cmd: default_install_cmd(),
            build_cmd: default_build_cmd(),
            manifest: Vec::new(),
            entry_document: default_entry_document(),
            output: default_build_output(),
        }
    }
}

/// `[lock]` section: lockfile generation.
#[derive(Debug, Clone, Deserialize)]
pub struct LockSection {
    /// Working directory; falls back to `build.dir`.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    #[serde(default = "default_lock_cmd")]
    pub cmd: String,

    /// Lockfile the command must produce, relative to the working directory.
    #[serde(default = "default_lockfile")]
    pub lockfile: String,
}

impl Default for LockSection {
    fn default() -> Self {
        Self {
            dir: None,
            cmd: default_lock_cmd(),
            lockfile: default_lockfile(),
        }
    }
}

/// `[services.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub cmd: String,

    #[serde(default)]
    pub cwd: Option<PathBuf>,

    /// Extra variables for this service only.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub output: OutputMode,

    /// Variable that receives the front-end port override. A service named
    /// `frontend` gets `PORT` when this is unset.
    #[serde(default)]
    pub port_env: Option<String>,
}

impl ServiceConfig {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            cwd: None,
            env: BTreeMap::new(),
            output: OutputMode::default(),
            port_env: None,
        }
    }
}

/// `[env.development]` / `[env.production]`: variables forwarded to every
/// spawned command in that mode.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvSection {
    #[serde(default)]
    pub development: BTreeMap<String, String>,

    #[serde(default)]
    pub production: BTreeMap<String, String>,
}

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_install_cmd() -> String {
    "npm install".to_string()
}

fn default_build_cmd() -> String {
    "npm run build".to_string()
}

fn default_entry_document() -> String {
    DEFAULT_ENTRY_DOCUMENT.to_string()
}

fn default_build_output() -> OutputMode {
    OutputMode::Inherited
}

fn default_lock_cmd() -> String {
    "npm install --package-lock-only".to_string()
}

fn default_lockfile() -> String {
    "package-lock.json".to_string()
}
