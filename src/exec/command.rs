// src/exec/command.rs

//! Immutable description of an external command.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::types::OutputMode;

/// The command line to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    /// A line handed to the platform shell (`sh -c` / `cmd /C`).
    Shell(String),
    /// A program and its argument vector, executed without a shell.
    Exec { program: String, args: Vec<String> },
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandLine::Shell(line) => f.write_str(line),
            CommandLine::Exec { program, args } => {
                f.write_str(program)?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                Ok(())
            }
        }
    }
}

/// Everything needed to run one external process.
///
/// Built with the consuming builder methods below, then handed to a
/// [`ProcessRunner`](crate::exec::ProcessRunner) or the dev supervisor by
/// reference. Environment overrides are layered on top of the inherited
/// environment of the child only; nothing here touches our own process state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    line: CommandLine,
    cwd: PathBuf,
    env: BTreeMap<String, String>,
    output: OutputMode,
}

impl CommandSpec {
    /// A shell command line, run in the current directory with captured output.
    pub fn shell(line: impl Into<String>) -> Self {
        Self::from_line(CommandLine::Shell(line.into()))
    }

    /// A program executed directly (no shell).
    pub fn program<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_line(CommandLine::Exec {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        })
    }

    fn from_line(line: CommandLine) -> Self {
        Self {
            line,
            cwd: PathBuf::from("."),
            env: BTreeMap::new(),
            output: OutputMode::Captured,
        }
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in vars {
            self.env.insert(k.into(), v.into());
        }
        self
    }

    pub fn output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    pub fn working_dir(&self) -> &Path {
        &self.cwd
    }

    pub fn env_overrides(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output
    }

    /// Build the tokio `Command` for this spec.
    ///
    /// stdin is always null; stdout/stderr follow the output mode.
    pub(crate) fn to_command(&self) -> Command {
        let mut cmd = match &self.line {
            CommandLine::Shell(line) => {
                if cfg!(windows) {
                    let mut c = Command::new("cmd");
                    c.arg("/C").arg(line);
                    c
                } else {
                    let mut c = Command::new("sh");
                    c.arg("-c").arg(line);
                    c
                }
            }
            CommandLine::Exec { program, args } => {
                let mut c = Command::new(program);
                c.args(args);
                c
            }
        };

        cmd.current_dir(&self.cwd).envs(&self.env).stdin(Stdio::null());

        match self.output {
            OutputMode::Captured => {
                cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
            }
            OutputMode::Inherited => {
                cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
            }
        }

        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.line.fmt(f)
    }
}

/// Check that `spec`'s working directory exists and is a directory.
pub(crate) async fn check_working_dir(spec: &CommandSpec) -> std::io::Result<()> {
    let meta = tokio::fs::metadata(spec.working_dir()).await?;
    if meta.is_dir() {
        Ok(())
    } else {
        Err(std::io::Error::new(
            std::io::ErrorKind::NotADirectory,
            format!("{} is not a directory", spec.working_dir().display()),
        ))
    }
}
