// tests/build_orchestrator.rs

mod common;
use crate::common::{init_tracing, with_timeout, write_file, SpyRunner};

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::tempdir;

use devtool::artifacts::{ArtifactChecker, Manifest};
use devtool::exec::{
    ArtifactVerification, BuildFailure, BuildOrchestrator, BuildStage, CommandSpec, SystemRunner,
};
use devtool::fs::mock::MockFileSystem;

type TestResult = Result<(), Box<dyn Error>>;

const INSTALL: &str = "npm install";
const BUILD: &str = "npm run build";

fn specs() -> (CommandSpec, CommandSpec) {
    (CommandSpec::shell(INSTALL), CommandSpec::shell(BUILD))
}

fn mock_checker(fs: MockFileSystem) -> ArtifactChecker {
    ArtifactChecker::new(Arc::new(fs))
}

#[tokio::test]
async fn install_failure_skips_build() -> TestResult {
    init_tracing();
    let spy = SpyRunner::new().exit_with(INSTALL, 1);
    let orchestrator = BuildOrchestrator::new(spy, ArtifactChecker::default());
    let (install, build) = specs();

    let outcome = orchestrator.build(&install, &build, None).await;

    assert_eq!(outcome.stage, BuildStage::Install);
    assert!(!outcome.succeeded);
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(orchestrator.runner().count(INSTALL), 1);
    assert_eq!(orchestrator.runner().count(BUILD), 0);
    match outcome.failure {
        Some(BuildFailure::NonZeroExit {
            exit_code, stderr, ..
        }) => {
            assert_eq!(exit_code, Some(1));
            assert_eq!(stderr.as_deref(), Some("npm install: exit 1"));
        }
        other => panic!("expected NonZeroExit, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn install_spawn_failure_is_reported_as_install_stage() -> TestResult {
    init_tracing();
    let spy = SpyRunner::new().fail_spawn(INSTALL);
    let orchestrator = BuildOrchestrator::new(spy, ArtifactChecker::default());
    let (install, build) = specs();

    let outcome = orchestrator.build(&install, &build, None).await;

    assert_eq!(outcome.exit_code(), 1);
    assert!(matches!(outcome.failure, Some(BuildFailure::Spawn { .. })));
    assert_eq!(orchestrator.runner().count(BUILD), 0);
    Ok(())
}

#[tokio::test]
async fn build_failure_stops_before_verification() -> TestResult {
    init_tracing();
    let spy = SpyRunner::new().exit_with(BUILD, 2);
    let orchestrator = BuildOrchestrator::new(spy, ArtifactChecker::default());
    let (install, build) = specs();
    let verify = ArtifactVerification {
        output_dir: PathBuf::from("/nowhere/dist"),
        manifest: Manifest::from_paths(["index.html"])?,
    };

    let outcome = orchestrator.build(&install, &build, Some(&verify)).await;

    assert_eq!(outcome.stage, BuildStage::Build);
    assert_eq!(outcome.exit_code(), 2);
    assert!(outcome.reports.is_empty());
    assert_eq!(orchestrator.runner().runs().len(), 2);
    Ok(())
}

#[tokio::test]
async fn success_without_manifest_ends_at_build_stage() -> TestResult {
    init_tracing();
    let orchestrator = BuildOrchestrator::new(SpyRunner::new(), ArtifactChecker::default());
    let (install, build) = specs();

    let outcome = orchestrator.build(&install, &build, None).await;

    assert!(outcome.succeeded);
    assert_eq!(outcome.stage, BuildStage::Build);
    assert_eq!(outcome.exit_code(), 0);
    assert!(outcome.failure.is_none());

    let order: Vec<String> = orchestrator
        .runner()
        .runs()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(order, vec![INSTALL.to_string(), BUILD.to_string()]);
    Ok(())
}

#[tokio::test]
async fn missing_artifacts_fail_the_verify_stage() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("/app/dist/index.html", "0123456789");
    let orchestrator = BuildOrchestrator::new(SpyRunner::new(), mock_checker(fs));
    let (install, build) = specs();
    let verify = ArtifactVerification {
        output_dir: PathBuf::from("/app/dist"),
        manifest: Manifest::from_paths(["index.html", "assets/app.js"])?,
    };

    let outcome = orchestrator.build(&install, &build, Some(&verify)).await;

    assert_eq!(outcome.stage, BuildStage::Verify);
    assert_eq!(outcome.exit_code(), 3);
    assert_eq!(outcome.missing(), &[PathBuf::from("assets/app.js")]);
    assert_eq!(outcome.reports.len(), 2);
    assert_eq!(outcome.reports[0].size(), Some(10));

    let json = serde_json::to_value(&outcome)?;
    assert_eq!(json["stage"], "verify");
    assert_eq!(json["failure"]["kind"], "missing_artifacts");
    assert_eq!(json["failure"]["missing"][0], "assets/app.js");
    Ok(())
}

#[tokio::test]
async fn all_artifacts_present_succeeds_at_verify_stage() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("/app/dist/index.html", "<html/>");
    let orchestrator = BuildOrchestrator::new(SpyRunner::new(), mock_checker(fs));
    let (install, build) = specs();
    let verify = ArtifactVerification {
        output_dir: PathBuf::from("/app/dist"),
        manifest: Manifest::from_paths(["index.html"])?,
    };

    let outcome = orchestrator.build(&install, &build, Some(&verify)).await;

    assert!(outcome.succeeded);
    assert_eq!(outcome.stage, BuildStage::Verify);
    assert_eq!(outcome.exit_code(), 0);
    assert!(outcome.missing().is_empty());
    Ok(())
}

#[tokio::test]
async fn generate_verifies_the_lockfile() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("/app/package-lock.json", "{}");
    let orchestrator = BuildOrchestrator::new(SpyRunner::new(), mock_checker(fs.clone()));
    let lock = CommandSpec::shell("npm install --package-lock-only");
    let verify = ArtifactVerification {
        output_dir: PathBuf::from("/app"),
        manifest: Manifest::from_paths(["package-lock.json"])?,
    };

    let outcome = orchestrator.generate(&lock, &verify).await;
    assert!(outcome.succeeded);

    fs.remove("/app/package-lock.json");
    let outcome = orchestrator.generate(&lock, &verify).await;
    assert_eq!(outcome.exit_code(), 3);
    assert_eq!(outcome.missing(), &[PathBuf::from("package-lock.json")]);
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn real_install_failure_never_runs_build() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let marker = dir.path().join("built.marker");

    let orchestrator = BuildOrchestrator::new(SystemRunner::new(), ArtifactChecker::default());
    let install = CommandSpec::shell("exit 1").cwd(dir.path());
    let build = CommandSpec::shell("touch built.marker").cwd(dir.path());

    let outcome = with_timeout(orchestrator.build(&install, &build, None)).await;

    assert_eq!(outcome.exit_code(), 1);
    assert!(!marker.exists());
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn real_pipeline_produces_verified_output() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    write_file(dir.path(), "package.json", "{}");

    let orchestrator = BuildOrchestrator::new(SystemRunner::new(), ArtifactChecker::default());
    let install = CommandSpec::shell("mkdir -p node_modules").cwd(dir.path());
    let build = CommandSpec::shell("mkdir -p dist && printf '<html/>' > dist/index.html")
        .cwd(dir.path());
    let verify = ArtifactVerification {
        output_dir: dir.path().join("dist"),
        manifest: Manifest::from_paths(["index.html"])?,
    };

    let outcome = with_timeout(orchestrator.build(&install, &build, Some(&verify))).await;

    assert!(outcome.succeeded, "unexpected failure: {:?}", outcome.failure);
    assert_eq!(outcome.reports[0].path(), Path::new("index.html"));
    assert_eq!(outcome.reports[0].size(), Some(7));
    Ok(())
}
