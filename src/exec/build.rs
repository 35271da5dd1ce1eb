// src/exec/build.rs

//! Install → build → verify pipeline.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, warn};

use crate::artifacts::checker::unmet_expectations;
use crate::artifacts::{ArtifactChecker, ArtifactReport, Manifest};
use crate::errors::DevtoolError;
use crate::exec::command::CommandSpec;
use crate::exec::runner::ProcessRunner;

/// Pipeline stage an outcome refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStage {
    Install,
    Build,
    Verify,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BuildStage::Install => "install",
            BuildStage::Build => "build",
            BuildStage::Verify => "verify",
        };
        f.write_str(s)
    }
}

/// Why a pipeline stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildFailure {
    /// The process could not be created at all.
    Spawn { command: String, reason: String },
    /// The process ran and reported failure.
    NonZeroExit {
        command: String,
        exit_code: Option<i32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        stderr: Option<String>,
    },
    /// Expected artifacts absent (or not inspectable) after a successful build.
    MissingArtifacts {
        missing: Vec<PathBuf>,
        unreadable: Vec<PathBuf>,
    },
}

impl fmt::Display for BuildFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildFailure::Spawn { command, reason } => {
                write!(f, "could not start `{command}`: {reason}")
            }
            BuildFailure::NonZeroExit {
                command, exit_code, ..
            } => match exit_code {
                Some(code) => write!(f, "`{command}` exited with code {code}"),
                None => write!(f, "`{command}` was terminated by a signal"),
            },
            BuildFailure::MissingArtifacts {
                missing,
                unreadable,
            } => {
                write!(f, "{} expected artifact(s) missing", missing.len())?;
                if !unreadable.is_empty() {
                    write!(f, ", {} unreadable", unreadable.len())?;
                }
                Ok(())
            }
        }
    }
}

/// Machine-readable result of one [`BuildOrchestrator::build`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildOutcome {
    /// The last stage that was attempted.
    pub stage: BuildStage,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<BuildFailure>,
    /// Artifact reports, only populated once the verify stage ran.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reports: Vec<ArtifactReport>,
}

impl BuildOutcome {
    fn failed(stage: BuildStage, failure: BuildFailure) -> Self {
        Self {
            stage,
            succeeded: false,
            failure: Some(failure),
            reports: Vec::new(),
        }
    }

    /// Process exit code for the CLI: 0 ok, 1 install, 2 build, 3 verify.
    pub fn exit_code(&self) -> i32 {
        if self.succeeded {
            return 0;
        }
        match self.stage {
            BuildStage::Install => 1,
            BuildStage::Build => 2,
            BuildStage::Verify => 3,
        }
    }

    /// Expected artifacts that were not found.
    pub fn missing(&self) -> &[PathBuf] {
        match &self.failure {
            Some(BuildFailure::MissingArtifacts { missing, .. }) => missing,
            _ => &[],
        }
    }
}

/// Where to look for build output and what to expect there.
#[derive(Debug, Clone)]
pub struct ArtifactVerification {
    pub output_dir: PathBuf,
    pub manifest: Manifest,
}

/// Runs install and build commands in sequence and optionally verifies the
/// result.
///
/// Each call runs at most one install and one build process. Nothing is
/// retried; the caller owns any retry policy.
#[derive(Debug)]
pub struct BuildOrchestrator<R: ProcessRunner> {
    runner: R,
    checker: ArtifactChecker,
}

impl<R: ProcessRunner> BuildOrchestrator<R> {
    pub fn new(runner: R, checker: ArtifactChecker) -> Self {
        Self { runner, checker }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub async fn build(
        &self,
        install: &CommandSpec,
        build: &CommandSpec,
        verify: Option<&ArtifactVerification>,
    ) -> BuildOutcome {
        if let Err(failure) = self.run_stage(BuildStage::Install, install).await {
            return BuildOutcome::failed(BuildStage::Install, failure);
        }

        if let Err(failure) = self.run_stage(BuildStage::Build, build).await {
            return BuildOutcome::failed(BuildStage::Build, failure);
        }

        let Some(verify) = verify else {
            info!("build finished; no manifest supplied, skipping verification");
            return BuildOutcome {
                stage: BuildStage::Build,
                succeeded: true,
                failure: None,
                reports: Vec::new(),
            };
        };

        verify_outcome(&self.checker, verify)
    }

    /// Run a single generating command (e.g. lockfile generation) as the
    /// build stage, then verify what it should have produced.
    pub async fn generate(&self, cmd: &CommandSpec, verify: &ArtifactVerification) -> BuildOutcome {
        if let Err(failure) = self.run_stage(BuildStage::Build, cmd).await {
            return BuildOutcome::failed(BuildStage::Build, failure);
        }
        verify_outcome(&self.checker, verify)
    }

    /// Run one process stage; `Err` carries the reason the pipeline stops.
    async fn run_stage(
        &self,
        stage: BuildStage,
        spec: &CommandSpec,
    ) -> std::result::Result<(), BuildFailure> {
        info!(%stage, cmd = %spec, "running build stage");

        match self.runner.run(spec).await {
            Ok(result) if result.success() => Ok(()),
            Ok(result) => {
                warn!(
                    %stage,
                    cmd = %spec,
                    exit_code = ?result.exit_code,
                    "stage failed; stopping pipeline"
                );
                Err(BuildFailure::NonZeroExit {
                    command: spec.to_string(),
                    exit_code: result.exit_code,
                    stderr: result.stderr,
                })
            }
            Err(err) => {
                warn!(%stage, cmd = %spec, error = %err, "stage could not start");
                Err(spawn_failure(spec, &err))
            }
        }
    }
}

/// Run the checker and fold its reports into a verify-stage outcome.
pub fn verify_outcome(checker: &ArtifactChecker, verify: &ArtifactVerification) -> BuildOutcome {
    let reports = checker.verify(&verify.output_dir, &verify.manifest);
    let (missing, unreadable) = unmet_expectations(&verify.manifest, &reports);

    let failure = if missing.is_empty() && unreadable.is_empty() {
        info!(
            dir = %verify.output_dir.display(),
            artifacts = reports.len(),
            "all expected artifacts present"
        );
        None
    } else {
        warn!(
            dir = %verify.output_dir.display(),
            ?missing,
            ?unreadable,
            "expected artifacts not found"
        );
        Some(BuildFailure::MissingArtifacts {
            missing,
            unreadable,
        })
    };

    BuildOutcome {
        stage: BuildStage::Verify,
        succeeded: failure.is_none(),
        failure,
        reports,
    }
}

fn spawn_failure(spec: &CommandSpec, err: &DevtoolError) -> BuildFailure {
    let reason = match err {
        DevtoolError::Spawn { kind, source, .. } => format!("{kind}: {source}"),
        other => other.to_string(),
    };
    BuildFailure::Spawn {
        command: spec.to_string(),
        reason,
    }
}
