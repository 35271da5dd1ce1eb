// src/config/commands.rs

//! Turn validated config plus [`EnvSettings`] into concrete `CommandSpec`s.

use std::collections::BTreeMap;
use std::path::Path;

use crate::config::env::EnvSettings;
use crate::config::model::{BuildSection, ConfigFile, LockSection, ServiceConfig};
use crate::exec::CommandSpec;
use crate::types::{OutputMode, RunMode};

/// Name of the service that receives the port override by default.
pub const FRONTEND_SERVICE: &str = "frontend";

const DEFAULT_PORT_ENV: &str = "PORT";

/// Variables forwarded to every spawned command: `NODE_ENV` plus the
/// `[env.<mode>]` table of the active mode.
pub fn forwarded_env(cfg: &ConfigFile, env: &EnvSettings) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    vars.insert("NODE_ENV".to_string(), env.mode.as_str().to_string());

    let table = match env.mode {
        RunMode::Development => &cfg.env.development,
        RunMode::Production => &cfg.env.production,
    };
    vars.extend(table.iter().map(|(k, v)| (k.clone(), v.clone())));
    vars
}

/// Install and build specs for `build`.
pub fn build_specs(
    cfg: &ConfigFile,
    build: &BuildSection,
    env: &EnvSettings,
) -> (CommandSpec, CommandSpec) {
    let vars = forwarded_env(cfg, env);
    let make = |line: &str| {
        CommandSpec::shell(line)
            .cwd(&build.dir)
            .envs(vars.clone())
            .output(build.output)
    };
    (make(&build.install_cmd), make(&build.build_cmd))
}

/// Lockfile generation spec. Output is always captured.
pub fn lock_spec(cfg: &ConfigFile, lock: &LockSection, env: &EnvSettings) -> CommandSpec {
    CommandSpec::shell(lock.cmd.as_str())
        .cwd(lock_dir(cfg, lock))
        .envs(forwarded_env(cfg, env))
        .output(OutputMode::Captured)
}

pub fn lock_dir<'a>(cfg: &'a ConfigFile, lock: &'a LockSection) -> &'a Path {
    lock.dir.as_deref().unwrap_or(cfg.build.dir.as_path())
}

/// One `(name, spec)` per service, in the given order.
pub fn service_specs<'a, I>(
    cfg: &ConfigFile,
    services: I,
    env: &EnvSettings,
) -> Vec<(String, CommandSpec)>
where
    I: IntoIterator<Item = (&'a String, &'a ServiceConfig)>,
{
    let vars = forwarded_env(cfg, env);
    services
        .into_iter()
        .map(|(name, svc)| (name.clone(), service_spec(name, svc, &vars, env)))
        .collect()
}

fn service_spec(
    name: &str,
    svc: &ServiceConfig,
    vars: &BTreeMap<String, String>,
    env: &EnvSettings,
) -> CommandSpec {
    let mut spec = CommandSpec::shell(svc.cmd.as_str())
        .cwd(svc.cwd.clone().unwrap_or_else(|| ".".into()))
        .envs(vars.clone())
        .envs(svc.env.clone())
        .output(svc.output);

    if let Some(port) = env.frontend_port {
        let port_env = match (&svc.port_env, name == FRONTEND_SERVICE) {
            (Some(var), _) => Some(var.as_str()),
            (None, true) => Some(DEFAULT_PORT_ENV),
            (None, false) => None,
        };
        if let Some(var) = port_env {
            spec = spec.env(var, port.to_string());
        }
    }

    spec
}
