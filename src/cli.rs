// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::validate_service_name;

/// Command-line arguments for `devtool`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "devtool",
    version,
    about = "Build, verify and run a web application's dev services.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Devtool.toml` in the current working directory, if present.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DEVTOOL_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print machine-readable JSON results on stdout.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Install dependencies, build, then verify the output artifacts.
    ///
    /// Exit code: 0 success, 1 install failed, 2 build failed,
    /// 3 verification failed.
    Build(BuildArgs),

    /// Run dev services until interrupted.
    Dev(DevArgs),

    /// Check an existing output directory against a manifest (exit 0 or 3).
    Verify(VerifyArgs),

    /// Generate the dependency lockfile and check it was written.
    Lock(LockArgs),
}

#[derive(Debug, Clone, Args)]
pub struct BuildArgs {
    /// Working directory for the install and build commands.
    #[arg(long, value_name = "PATH")]
    pub dir: Option<PathBuf>,

    /// Manifest file listing expected artifacts, one per line.
    #[arg(long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Build output directory (default: `<dir>/dist`).
    #[arg(long, value_name = "PATH")]
    pub out_dir: Option<PathBuf>,

    #[arg(long, value_name = "CMD")]
    pub install_cmd: Option<String>,

    #[arg(long, value_name = "CMD")]
    pub build_cmd: Option<String>,

    /// SPA entry document that must exist in the output.
    #[arg(long, value_name = "NAME")]
    pub entry_document: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct DevArgs {
    /// Services as `name:cmd`, comma separated or repeated.
    ///
    /// Example: `--services frontend:"npm run dev",backend:"cargo run"`.
    /// Overrides the command of a configured service with the same name.
    #[arg(
        long,
        value_name = "NAME:CMD",
        value_delimiter = ',',
        value_parser = parse_service
    )]
    pub services: Vec<ServiceArg>,

    /// Stop every other service when one terminates unexpectedly.
    #[arg(long)]
    pub kill_others_on_fail: bool,
}

#[derive(Debug, Clone, Args)]
pub struct VerifyArgs {
    /// Output directory to check.
    #[arg(long, value_name = "PATH")]
    pub dir: Option<PathBuf>,

    #[arg(long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    #[arg(long, value_name = "NAME")]
    pub entry_document: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct LockArgs {
    #[arg(long, value_name = "PATH")]
    pub dir: Option<PathBuf>,

    #[arg(long, value_name = "CMD")]
    pub lock_cmd: Option<String>,

    /// Lockfile the command must produce, relative to `--dir`.
    #[arg(long, value_name = "NAME")]
    pub lockfile: Option<String>,
}

/// One `name:cmd` pair from `--services`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceArg {
    pub name: String,
    pub cmd: String,
}

fn parse_service(s: &str) -> Result<ServiceArg, String> {
    let (name, cmd) = s
        .split_once(':')
        .ok_or_else(|| format!("expected NAME:CMD, got '{s}'"))?;
    let name = name.trim();
    let cmd = cmd.trim();

    validate_service_name(name).map_err(|e| e.to_string())?;
    if cmd.is_empty() {
        return Err(format!("service '{name}' has an empty command"));
    }

    Ok(ServiceArg {
        name: name.to_string(),
        cmd: cmd.to_string(),
    })
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
