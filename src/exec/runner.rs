// src/exec/runner.rs

//! One-shot process execution.
//!
//! The orchestration code talks to a [`ProcessRunner`] instead of spawning
//! processes itself, so tests can swap in a spy runner that records which
//! commands were run without touching the OS.

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info};

use crate::errors::{DevtoolError, Result};
use crate::exec::command::{check_working_dir, CommandSpec};

/// Result of one completed process run.
///
/// `exit_code` is `None` when the process was terminated by a signal.
/// `stdout` / `stderr` are only present when the spec used
/// [`OutputMode::Captured`](crate::types::OutputMode::Captured).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessResult {
    pub exit_code: Option<i32>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    #[serde(skip)]
    pub duration: Duration,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Trait abstracting how a single command is run to completion.
///
/// A non-zero exit is **not** an error: it comes back inside `Ok` and the
/// caller decides what it means. `Err` is reserved for processes that could
/// not be created at all ([`DevtoolError::Spawn`]).
pub trait ProcessRunner: Send + Sync {
    fn run<'a>(
        &'a self,
        spec: &'a CommandSpec,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessResult>> + Send + 'a>>;
}

/// Runner that spawns real OS processes through `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessRunner for SystemRunner {
    fn run<'a>(
        &'a self,
        spec: &'a CommandSpec,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessResult>> + Send + 'a>> {
        Box::pin(run_to_completion(spec))
    }
}

async fn run_to_completion(spec: &CommandSpec) -> Result<ProcessResult> {
    check_working_dir(spec)
        .await
        .map_err(|e| DevtoolError::working_directory(spec, e))?;

    info!(
        cmd = %spec,
        cwd = %spec.working_dir().display(),
        output = ?spec.output_mode(),
        "starting process"
    );

    let started = Instant::now();
    let mut child = spec
        .to_command()
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| DevtoolError::spawn(spec, e))?;

    // Drain both pipes concurrently so a chatty child can't block on a full
    // stderr buffer while we are still reading stdout.
    let stdout_task = child.stdout.take().map(|s| tokio::spawn(read_all(s)));
    let stderr_task = child.stderr.take().map(|s| tokio::spawn(read_all(s)));

    let status = child.wait().await?;

    let stdout = join_output(stdout_task).await?;
    let stderr = join_output(stderr_task).await?;
    let duration = started.elapsed();

    info!(
        cmd = %spec,
        exit_code = ?status.code(),
        success = status.success(),
        elapsed_ms = duration.as_millis() as u64,
        "process exited"
    );

    Ok(ProcessResult {
        exit_code: status.code(),
        stdout,
        stderr,
        duration,
    })
}

async fn read_all<R>(mut reader: R) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

async fn join_output(
    task: Option<tokio::task::JoinHandle<std::io::Result<String>>>,
) -> Result<Option<String>> {
    let Some(task) = task else {
        return Ok(None);
    };
    match task.await {
        Ok(res) => Ok(Some(res?)),
        Err(e) => {
            debug!(error = %e, "output reader task did not complete");
            Err(DevtoolError::Other(e.into()))
        }
    }
}
