// tests/config_loading.rs

mod common;
use crate::common::builders::{ConfigFileBuilder, ServiceConfigBuilder};
use crate::common::write_file;

use std::collections::HashMap;
use std::error::Error;
use std::path::{Path, PathBuf};

use tempfile::tempdir;

use devtool::config::commands::{build_specs, lock_dir, lock_spec, service_specs};
use devtool::config::{load_and_validate, load_for_cli, ConfigFile, EnvSettings};
use devtool::errors::DevtoolError;
use devtool::types::{OutputMode, RunMode};

type TestResult = Result<(), Box<dyn Error>>;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn loads_full_config_file() -> TestResult {
    let dir = tempdir()?;
    write_file(
        dir.path(),
        "Devtool.toml",
        r#"
[build]
dir = "web"
install_cmd = "npm ci"
manifest = ["index.html", "?robots.txt"]

[lock]
lockfile = "npm-shrinkwrap.json"

[services.frontend]
cmd = "npm run dev"
cwd = "web"

[services.backend]
cmd = "cargo run"
cwd = "server"
output = "inherited"
port_env = "API_PORT"

[env.production]
API_URL = "/api"
"#,
    );

    let cfg = load_and_validate(dir.path().join("Devtool.toml"))?;

    assert_eq!(cfg.build.dir, PathBuf::from("web"));
    assert_eq!(cfg.build.install_cmd, "npm ci");
    assert_eq!(cfg.build.build_cmd, "npm run build");
    assert_eq!(cfg.build.effective_out_dir(), PathBuf::from("web/dist"));
    assert_eq!(cfg.build.output, OutputMode::Inherited);
    assert_eq!(cfg.lock.lockfile, "npm-shrinkwrap.json");
    assert_eq!(cfg.services.len(), 2);
    assert_eq!(cfg.services["backend"].output, OutputMode::Inherited);
    assert_eq!(cfg.services["frontend"].output, OutputMode::Captured);
    assert_eq!(cfg.env.production["API_URL"], "/api");
    Ok(())
}

#[test]
fn empty_file_yields_defaults() -> TestResult {
    let dir = tempdir()?;
    write_file(dir.path(), "Devtool.toml", "");

    let cfg = load_and_validate(dir.path().join("Devtool.toml"))?;

    assert_eq!(cfg.build.install_cmd, "npm install");
    assert_eq!(cfg.build.entry_document, "index.html");
    assert_eq!(cfg.lock.cmd, "npm install --package-lock-only");
    assert!(cfg.services.is_empty());
    Ok(())
}

#[test]
fn malformed_toml_is_a_toml_error() -> TestResult {
    let dir = tempdir()?;
    write_file(dir.path(), "Devtool.toml", "[build\ndir = ");

    let err = load_and_validate(dir.path().join("Devtool.toml")).expect_err("bad toml");
    assert!(matches!(err, DevtoolError::TomlError(_)));
    Ok(())
}

#[test]
fn explicit_config_path_must_exist() -> TestResult {
    let dir = tempdir()?;
    let missing = dir.path().join("nope.toml");
    let err = load_for_cli(Some(missing.as_path())).expect_err("missing config");
    assert!(matches!(err, DevtoolError::IoError(_)));
    Ok(())
}

#[test]
fn rejects_empty_commands() {
    let mut raw = ConfigFileBuilder::new().raw();
    raw.build.build_cmd = "   ".to_string();

    match ConfigFile::try_from(raw) {
        Err(DevtoolError::ConfigError(msg)) => assert!(msg.contains("build_cmd")),
        other => panic!("expected ConfigError, got {other:?}"),
    }

    let raw = ConfigFileBuilder::new()
        .with_service("web", ServiceConfigBuilder::new("").build())
        .raw();
    assert!(ConfigFile::try_from(raw).is_err());
}

#[test]
fn rejects_service_names_with_separators() {
    for name in ["a:b", "a,b", "two words", ""] {
        let raw = ConfigFileBuilder::new()
            .with_service(name, ServiceConfigBuilder::new("true").build())
            .raw();
        assert!(
            ConfigFile::try_from(raw).is_err(),
            "name '{name}' should be rejected"
        );
    }
}

#[test]
fn rejects_invalid_manifest_lines() {
    let raw = ConfigFileBuilder::new()
        .with_manifest_line("../escape.js")
        .raw();
    match ConfigFile::try_from(raw) {
        Err(DevtoolError::ConfigError(msg)) => assert!(msg.contains("[build].manifest")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn rejects_absolute_entry_document() {
    let mut raw = ConfigFileBuilder::new().raw();
    raw.build.entry_document = "/index.html".to_string();
    assert!(ConfigFile::try_from(raw).is_err());
}

#[test]
fn env_settings_default_to_development_without_port() -> TestResult {
    let env = EnvSettings::from_lookup(lookup(&[]))?;
    assert_eq!(env.mode, RunMode::Development);
    assert_eq!(env.frontend_port, None);
    Ok(())
}

#[test]
fn env_settings_prefer_primary_variables() -> TestResult {
    let env = EnvSettings::from_lookup(lookup(&[
        ("DEVTOOL_MODE", "production"),
        ("NODE_ENV", "development"),
        ("DEVTOOL_FRONTEND_PORT", "5173"),
        ("PORT", "3000"),
    ]))?;
    assert_eq!(env.mode, RunMode::Production);
    assert_eq!(env.frontend_port, Some(5173));
    Ok(())
}

#[test]
fn env_settings_fall_back_and_ignore_empty_values() -> TestResult {
    let env = EnvSettings::from_lookup(lookup(&[
        ("DEVTOOL_MODE", ""),
        ("NODE_ENV", "prod"),
        ("PORT", "8080"),
    ]))?;
    assert_eq!(env.mode, RunMode::Production);
    assert_eq!(env.frontend_port, Some(8080));
    Ok(())
}

#[test]
fn invalid_env_values_name_the_variable() {
    match EnvSettings::from_lookup(lookup(&[("DEVTOOL_FRONTEND_PORT", "http")])) {
        Err(DevtoolError::ConfigError(msg)) => assert!(msg.starts_with("DEVTOOL_FRONTEND_PORT")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
    match EnvSettings::from_lookup(lookup(&[("DEVTOOL_MODE", "staging")])) {
        Err(DevtoolError::ConfigError(msg)) => assert!(msg.starts_with("DEVTOOL_MODE")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn unknown_node_env_values_mean_development() -> TestResult {
    for value in ["test", "staging", "ci"] {
        let env = EnvSettings::from_lookup(lookup(&[("NODE_ENV", value)]))?;
        assert_eq!(env.mode, RunMode::Development, "NODE_ENV={value}");
    }

    let env = EnvSettings::from_lookup(lookup(&[("NODE_ENV", "production")]))?;
    assert_eq!(env.mode, RunMode::Production);

    let env = EnvSettings::from_lookup(lookup(&[
        ("DEVTOOL_MODE", "production"),
        ("NODE_ENV", "test"),
    ]))?;
    assert_eq!(env.mode, RunMode::Production);
    Ok(())
}

#[test]
fn build_specs_run_in_build_dir_with_mode_env() {
    let cfg = ConfigFileBuilder::new()
        .with_build_dir("web")
        .with_env(true, "API_URL", "/api")
        .with_env(false, "API_URL", "http://localhost:8000")
        .build();
    let env = EnvSettings {
        mode: RunMode::Production,
        frontend_port: None,
    };

    let (install, build) = build_specs(&cfg, &cfg.build, &env);

    assert_eq!(install.to_string(), "npm install");
    assert_eq!(build.to_string(), "npm run build");
    for spec in [&install, &build] {
        assert_eq!(spec.working_dir(), Path::new("web"));
        assert_eq!(spec.env_overrides()["NODE_ENV"], "production");
        assert_eq!(spec.env_overrides()["API_URL"], "/api");
        assert_eq!(spec.output_mode(), OutputMode::Inherited);
    }
}

#[test]
fn frontend_receives_port_and_others_do_not() {
    let cfg = ConfigFileBuilder::new()
        .with_service("frontend", ServiceConfigBuilder::new("npm run dev").cwd("web").build())
        .with_service(
            "backend",
            ServiceConfigBuilder::new("cargo run").env("RUST_LOG", "debug").build(),
        )
        .build();
    let env = EnvSettings {
        mode: RunMode::Development,
        frontend_port: Some(5173),
    };

    let specs = service_specs(&cfg, cfg.services.iter(), &env);
    let by_name: HashMap<_, _> = specs.into_iter().collect();

    let frontend = &by_name["frontend"];
    assert_eq!(frontend.working_dir(), Path::new("web"));
    assert_eq!(frontend.env_overrides()["PORT"], "5173");
    assert_eq!(frontend.env_overrides()["NODE_ENV"], "development");

    let backend = &by_name["backend"];
    assert!(!backend.env_overrides().contains_key("PORT"));
    assert_eq!(backend.env_overrides()["RUST_LOG"], "debug");
}

#[test]
fn custom_port_env_overrides_default_variable() {
    let cfg = ConfigFileBuilder::new()
        .with_service(
            "frontend",
            ServiceConfigBuilder::new("vite").port_env("VITE_PORT").build(),
        )
        .build();
    let env = EnvSettings {
        mode: RunMode::Development,
        frontend_port: Some(4000),
    };

    let specs = service_specs(&cfg, cfg.services.iter(), &env);
    let overrides = specs[0].1.env_overrides();
    assert_eq!(overrides["VITE_PORT"], "4000");
    assert!(!overrides.contains_key("PORT"));
}

#[test]
fn lock_runs_in_lock_dir_or_build_dir() {
    let mut cfg = ConfigFileBuilder::new().with_build_dir("web").build();
    let env = EnvSettings::default();

    assert_eq!(lock_dir(&cfg, &cfg.lock), Path::new("web"));
    let spec = lock_spec(&cfg, &cfg.lock, &env);
    assert_eq!(spec.working_dir(), Path::new("web"));
    assert_eq!(spec.output_mode(), OutputMode::Captured);

    cfg.lock.dir = Some(PathBuf::from("packages/app"));
    assert_eq!(lock_dir(&cfg, &cfg.lock), Path::new("packages/app"));
}
