// src/lib.rs

pub mod artifacts;
pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod types;

use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::{debug, info, warn};

use crate::artifacts::{ArtifactChecker, ArtifactReport, Manifest};
use crate::cli::{BuildArgs, CliArgs, Command, DevArgs, LockArgs, ServiceArg, VerifyArgs};
use crate::config::commands::{build_specs, lock_dir, lock_spec, service_specs};
use crate::config::{load_for_cli, ConfigFile, EnvSettings, ServiceConfig};
use crate::exec::build::verify_outcome;
use crate::exec::{
    ArtifactVerification, BuildOrchestrator, BuildOutcome, DevServerSupervisor, SupervisorEvent,
    SystemRunner,
};
use crate::fs::RealFileSystem;
use crate::types::OutputMode;

/// Exit code for failures of devtool itself (bad config, unreadable
/// manifest, ...), distinct from the pipeline codes 0-3.
pub const TOOL_ERROR_EXIT_CODE: i32 = 4;

/// High-level entry point used by `main.rs`.
///
/// Loads config and environment settings, then dispatches the subcommand.
/// Returns the process exit code.
pub async fn run(args: CliArgs) -> Result<i32> {
    let cfg = load_for_cli(args.config.as_deref())?;
    let env = EnvSettings::from_env()?;
    debug!(?env, "resolved environment settings");

    match args.command {
        Command::Build(build) => run_build(&cfg, &env, build, args.json).await,
        Command::Dev(dev) => run_dev(&cfg, &env, dev, args.json).await,
        Command::Verify(verify) => run_verify(&cfg, verify, args.json),
        Command::Lock(lock) => run_lock(&cfg, &env, lock, args.json).await,
    }
}

async fn run_build(cfg: &ConfigFile, env: &EnvSettings, args: BuildArgs, json: bool) -> Result<i32> {
    let mut build = cfg.build.clone();
    if let Some(dir) = args.dir {
        build.dir = dir;
    }
    if let Some(out_dir) = args.out_dir {
        build.out_dir = Some(out_dir);
    }
    if let Some(cmd) = args.install_cmd {
        build.install_cmd = cmd;
    }
    if let Some(cmd) = args.build_cmd {
        build.build_cmd = cmd;
    }
    if let Some(doc) = args.entry_document {
        build.entry_document = doc;
    }
    if json {
        // Child output on stdout would corrupt the JSON document.
        build.output = OutputMode::Captured;
    }

    let manifest = resolve_manifest(args.manifest.as_deref(), &build.manifest, &build.entry_document)?;
    let verify = manifest.map(|manifest| ArtifactVerification {
        output_dir: build.effective_out_dir(),
        manifest,
    });

    let (install, build_cmd) = build_specs(cfg, &build, env);
    let orchestrator = BuildOrchestrator::new(SystemRunner::new(), ArtifactChecker::default());
    let outcome = orchestrator.build(&install, &build_cmd, verify.as_ref()).await;

    report_outcome("build", &outcome, json)?;
    Ok(outcome.exit_code())
}

fn run_verify(cfg: &ConfigFile, args: VerifyArgs, json: bool) -> Result<i32> {
    let entry_document = args
        .entry_document
        .unwrap_or_else(|| cfg.build.entry_document.clone());
    let Some(manifest) =
        resolve_manifest(args.manifest.as_deref(), &cfg.build.manifest, &entry_document)?
    else {
        bail!("no manifest given: pass --manifest or set [build].manifest");
    };

    let verify = ArtifactVerification {
        output_dir: args.dir.unwrap_or_else(|| cfg.build.effective_out_dir()),
        manifest,
    };
    let outcome = verify_outcome(&ArtifactChecker::default(), &verify);

    report_outcome("verify", &outcome, json)?;
    Ok(outcome.exit_code())
}

async fn run_lock(cfg: &ConfigFile, env: &EnvSettings, args: LockArgs, json: bool) -> Result<i32> {
    let mut lock = cfg.lock.clone();
    if let Some(dir) = args.dir {
        lock.dir = Some(dir);
    }
    if let Some(cmd) = args.lock_cmd {
        lock.cmd = cmd;
    }
    if let Some(lockfile) = args.lockfile {
        lock.lockfile = lockfile;
    }

    let verify = ArtifactVerification {
        output_dir: lock_dir(cfg, &lock).to_path_buf(),
        manifest: Manifest::from_paths([lock.lockfile.as_str()])?,
    };
    let spec = lock_spec(cfg, &lock, env);
    let orchestrator = BuildOrchestrator::new(SystemRunner::new(), ArtifactChecker::default());
    let outcome = orchestrator.generate(&spec, &verify).await;

    report_outcome("lock", &outcome, json)?;
    Ok(outcome.exit_code())
}

async fn run_dev(cfg: &ConfigFile, env: &EnvSettings, args: DevArgs, json: bool) -> Result<i32> {
    let mut services = merge_services(cfg, &args.services)?;
    if json {
        // stdout carries one JSON event per line.
        for (_, svc) in &mut services {
            svc.output = OutputMode::Captured;
        }
    }
    if services.is_empty() {
        bail!("no services to run: pass --services or add [services.<name>] to the config");
    }

    let specs = service_specs(cfg, services.iter().map(|(n, s)| (n, s)), env);
    let (mut supervisor, mut events) = DevServerSupervisor::new();
    let handles = supervisor.start(specs).await;
    info!(
        services = ?handles.iter().map(|h| h.name()).collect::<Vec<_>>(),
        running = supervisor.running_count(),
        "dev services launched"
    );

    let mut session = DevSession::new(json);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown requested; stopping services");
                break;
            }
            Some(event) = events.recv() => {
                let failed = session.handle(&event)?;
                if failed && args.kill_others_on_fail {
                    warn!(service = %event.service(), "service failed; stopping the others");
                    break;
                }
                if supervisor.running_count() == 0 {
                    info!("all services have exited");
                    break;
                }
            }
        }
    }

    supervisor.stop_all().await;
    while let Ok(event) = events.try_recv() {
        session.handle(&event)?;
    }

    Ok(session.exit_code())
}

/// Tracks what the `dev` command reports and which exit code it ends with.
struct DevSession {
    json: bool,
    first_failure: Option<i32>,
}

impl DevSession {
    fn new(json: bool) -> Self {
        Self {
            json,
            first_failure: None,
        }
    }

    /// Print the event; returns true if it is an unexpected failure.
    fn handle(&mut self, event: &SupervisorEvent) -> Result<bool> {
        if self.json {
            println!("{}", serde_json::to_string(event)?);
        } else {
            println!("{}", describe_event(event));
        }

        let failed_with = match event {
            SupervisorEvent::FailedToStart { .. } => Some(1),
            SupervisorEvent::Exited {
                requested: false,
                code,
                ..
            } => match code {
                Some(0) => None,
                Some(c) => Some(*c),
                None => Some(1),
            },
            _ => None,
        };

        if let Some(code) = failed_with {
            self.first_failure.get_or_insert(code);
        }
        Ok(failed_with.is_some())
    }

    fn exit_code(&self) -> i32 {
        self.first_failure.unwrap_or(0)
    }
}

fn describe_event(event: &SupervisorEvent) -> String {
    match event {
        SupervisorEvent::Started { service, pid } => match pid {
            Some(pid) => format!("[{service}] started (pid {pid})"),
            None => format!("[{service}] started"),
        },
        SupervisorEvent::FailedToStart { service, reason } => {
            format!("[{service}] failed to start: {reason}")
        }
        SupervisorEvent::Exited {
            service,
            code,
            requested,
        } => {
            let how = if *requested { "stopped" } else { "exited" };
            match code {
                Some(code) => format!("[{service}] {how} with code {code}"),
                None => format!("[{service}] {how} by signal"),
            }
        }
    }
}

/// Services to run: the configured ones, or exactly the `--services` entries
/// (in CLI order) when given. A CLI entry keeps the cwd/env/port settings of a
/// same-named configured service and replaces its command.
fn merge_services(cfg: &ConfigFile, cli: &[ServiceArg]) -> Result<Vec<(String, ServiceConfig)>> {
    if cli.is_empty() {
        return Ok(cfg
            .services
            .iter()
            .map(|(name, svc)| (name.clone(), svc.clone()))
            .collect());
    }

    let mut merged: Vec<(String, ServiceConfig)> = Vec::with_capacity(cli.len());
    for arg in cli {
        if merged.iter().any(|(name, _)| name == &arg.name) {
            bail!("service '{}' given more than once in --services", arg.name);
        }
        let mut svc = cfg
            .services
            .get(&arg.name)
            .cloned()
            .unwrap_or_else(|| ServiceConfig::new(arg.cmd.as_str()));
        svc.cmd = arg.cmd.clone();
        merged.push((arg.name.clone(), svc));
    }
    Ok(merged)
}

/// Manifest from `--manifest` (file) or the config list, with the SPA entry
/// document enforced. `None` when neither source provides one.
fn resolve_manifest(
    file: Option<&Path>,
    configured: &[String],
    entry_document: &str,
) -> Result<Option<Manifest>> {
    let mut manifest = match file {
        Some(path) => Manifest::load(&RealFileSystem, path)
            .with_context(|| format!("loading manifest {}", path.display()))?,
        None if !configured.is_empty() => {
            Manifest::from_lines(configured.iter().map(String::as_str))?
        }
        None => return Ok(None),
    };
    manifest.require_entry_document(entry_document)?;
    Ok(Some(manifest))
}

fn report_outcome(command: &str, outcome: &BuildOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    let verdict = if outcome.succeeded { "succeeded" } else { "FAILED" };
    println!("{command} {verdict} (stage: {})", outcome.stage);
    if let Some(failure) = &outcome.failure {
        println!("  {failure}");
    }
    for report in &outcome.reports {
        println!("  {}", describe_report(report));
    }
    Ok(())
}

fn describe_report(report: &ArtifactReport) -> String {
    let path = report.path();
    match (report.size(), report.error()) {
        (Some(size), _) => format!("ok       {} ({size} bytes)", path.display()),
        (None, Some(err)) => format!("error    {} ({err})", path.display()),
        (None, None) => format!("missing  {}", path.display()),
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM; only Ctrl+C will stop devtool");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
