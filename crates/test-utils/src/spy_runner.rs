use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use devtool::errors::{DevtoolError, Result};
use devtool::exec::{CommandSpec, ProcessResult, ProcessRunner};
use devtool::types::OutputMode;

/// What the spy does when asked to run a given command line.
#[derive(Debug, Clone)]
pub enum Scripted {
    Exit { code: i32, stderr: String },
    SpawnFails,
}

/// A runner that never touches the OS:
/// - records every spec it was asked to run
/// - answers with a scripted result per command line (exit 0 by default).
#[derive(Debug, Clone, Default)]
pub struct SpyRunner {
    runs: Arc<Mutex<Vec<CommandSpec>>>,
    script: Arc<Mutex<HashMap<String, Scripted>>>,
}

impl SpyRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exit_with(self, line: &str, code: i32) -> Self {
        self.script.lock().unwrap().insert(
            line.to_string(),
            Scripted::Exit {
                code,
                stderr: format!("{line}: exit {code}"),
            },
        );
        self
    }

    pub fn fail_spawn(self, line: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .insert(line.to_string(), Scripted::SpawnFails);
        self
    }

    /// Specs in the order they were run.
    pub fn runs(&self) -> Vec<CommandSpec> {
        self.runs.lock().unwrap().clone()
    }

    /// How many times a command line was run.
    pub fn count(&self, line: &str) -> usize {
        self.runs
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.to_string() == line)
            .count()
    }
}

impl ProcessRunner for SpyRunner {
    fn run<'a>(
        &'a self,
        spec: &'a CommandSpec,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessResult>> + Send + 'a>> {
        Box::pin(async move {
            let scripted = self.script.lock().unwrap().get(&spec.to_string()).cloned();

            let (code, stderr) = match scripted {
                Some(Scripted::SpawnFails) => {
                    return Err(DevtoolError::spawn(
                        spec,
                        io::Error::new(io::ErrorKind::NotFound, "scripted spawn failure"),
                    ));
                }
                Some(Scripted::Exit { code, stderr }) => (code, stderr),
                None => (0, String::new()),
            };

            self.runs.lock().unwrap().push(spec.clone());

            let captured = spec.output_mode() == OutputMode::Captured;
            Ok(ProcessResult {
                exit_code: Some(code),
                stdout: captured.then(String::new),
                stderr: captured.then_some(stderr),
                duration: Duration::ZERO,
            })
        })
    }
}
