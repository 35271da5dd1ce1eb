// src/exec/mod.rs

//! Process execution layer.
//!
//! Everything that creates OS processes lives here, on top of
//! `tokio::process::Command`:
//!
//! - [`command`] defines [`CommandSpec`], the immutable description of a
//!   command (line, working directory, env overrides, output mode).
//! - [`runner`] runs one spec to completion behind the [`ProcessRunner`]
//!   trait; [`SystemRunner`] is the real implementation and tests can plug in
//!   a spy.
//! - [`build`] sequences install → build → verify with short-circuiting.
//! - [`supervisor`] keeps long-running dev services alive until told to stop
//!   and reports their lifecycle on an event stream.

pub mod build;
pub mod command;
pub mod runner;
pub mod supervisor;

pub use build::{ArtifactVerification, BuildFailure, BuildOrchestrator, BuildOutcome, BuildStage};
pub use command::CommandSpec;
pub use runner::{ProcessResult, ProcessRunner, SystemRunner};
pub use supervisor::{DevServerSupervisor, ServiceHandle, ServiceState, SupervisorEvent};
