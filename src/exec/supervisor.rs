// src/exec/supervisor.rs

//! Supervision of long-running dev services (front end, back end, ...).
//!
//! Each service runs in its own Tokio task that owns the child process. The
//! supervisor keeps, per service:
//! - a `watch` receiver with the current [`ServiceState`],
//! - a `oneshot` sender used to request termination,
//! - the `JoinHandle` of the owning task, awaited on teardown.
//!
//! Lifecycle transitions are published on an event channel. Services are
//! never restarted automatically.

use std::process::ExitStatus;
use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::exec::command::{check_working_dir, CommandSpec};

/// How long a service gets to exit after SIGTERM before it is killed.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(5);

/// Lifecycle state of one supervised service.
///
/// Transitions are monotonic:
/// `Starting -> Running -> Exited` or `Starting -> FailedToStart`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ServiceState {
    Starting,
    Running { pid: Option<u32> },
    /// `code` is `None` when the process was ended by a signal.
    Exited { code: Option<i32> },
    FailedToStart { reason: String },
}

impl ServiceState {
    /// Starting or running.
    pub fn is_live(&self) -> bool {
        matches!(self, ServiceState::Starting | ServiceState::Running { .. })
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_live()
    }

    pub fn can_transition_to(&self, next: &ServiceState) -> bool {
        matches!(
            (self, next),
            (ServiceState::Starting, ServiceState::Running { .. })
                | (ServiceState::Starting, ServiceState::FailedToStart { .. })
                | (ServiceState::Running { .. }, ServiceState::Exited { .. })
        )
    }
}

/// Lifecycle transitions reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SupervisorEvent {
    Started {
        service: String,
        pid: Option<u32>,
    },
    FailedToStart {
        service: String,
        reason: String,
    },
    /// `requested` is false when the service exited on its own.
    Exited {
        service: String,
        code: Option<i32>,
        requested: bool,
    },
}

impl SupervisorEvent {
    pub fn service(&self) -> &str {
        match self {
            SupervisorEvent::Started { service, .. }
            | SupervisorEvent::FailedToStart { service, .. }
            | SupervisorEvent::Exited { service, .. } => service,
        }
    }

    /// The service stopped without being asked to (including spawn failure).
    pub fn is_unexpected_termination(&self) -> bool {
        matches!(
            self,
            SupervisorEvent::FailedToStart { .. }
                | SupervisorEvent::Exited {
                    requested: false,
                    ..
                }
        )
    }
}

/// Read-only view of a supervised service.
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    name: String,
    state: watch::Receiver<ServiceState>,
}

impl ServiceHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ServiceState {
        self.state.borrow().clone()
    }

    /// Wait until the service reaches a terminal state and return it.
    pub async fn wait_terminal(&mut self) -> ServiceState {
        if let Ok(state) = self.state.wait_for(ServiceState::is_terminal).await {
            return state.clone();
        }
        // Sender gone: the owning task ended, the last value is final.
        self.state.borrow().clone()
    }
}

struct ActiveService {
    handle: ServiceHandle,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

/// Starts dev services concurrently and tears them down on request.
pub struct DevServerSupervisor {
    services: Vec<ActiveService>,
    // Unbounded: service tasks must never block on a slow event consumer.
    events: mpsc::UnboundedSender<SupervisorEvent>,
    stop_grace: Duration,
}

impl std::fmt::Debug for DevServerSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.services.iter().map(|s| s.handle.name()).collect();
        f.debug_struct("DevServerSupervisor")
            .field("services", &names)
            .field("stop_grace", &self.stop_grace)
            .finish_non_exhaustive()
    }
}

impl DevServerSupervisor {
    /// Create a supervisor and the receiving end of its event stream.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SupervisorEvent>) {
        Self::with_stop_grace(DEFAULT_STOP_GRACE)
    }

    pub fn with_stop_grace(
        stop_grace: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<SupervisorEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let supervisor = Self {
            services: Vec::new(),
            events: tx,
            stop_grace,
        };
        (supervisor, rx)
    }

    /// Launch every service concurrently.
    ///
    /// Returns once each service has either started or failed to start; the
    /// returned handles are in input order.
    pub async fn start(&mut self, specs: Vec<(String, CommandSpec)>) -> Vec<ServiceHandle> {
        let mut pending = Vec::with_capacity(specs.len());

        for (name, spec) in specs {
            if self.services.iter().any(|s| s.handle.name() == name) {
                warn!(service = %name, "a service with this name is already supervised");
            }

            let (state_tx, state_rx) = watch::channel(ServiceState::Starting);
            let (stop_tx, stop_rx) = oneshot::channel::<()>();
            let (ack_tx, ack_rx) = oneshot::channel::<()>();

            let run = ServiceRun {
                name: name.clone(),
                spec,
                state: state_tx,
                events: self.events.clone(),
                stop_grace: self.stop_grace,
            };
            let task = tokio::spawn(run.run(ack_tx, stop_rx));

            let handle = ServiceHandle {
                name,
                state: state_rx,
            };
            self.services.push(ActiveService {
                handle: handle.clone(),
                stop: Some(stop_tx),
                task: Some(task),
            });
            pending.push((handle, ack_rx));
        }

        let mut handles = Vec::with_capacity(pending.len());
        for (handle, ack) in pending {
            if ack.await.is_err() {
                debug!(service = %handle.name(), "service task ended before acknowledging start");
            }
            handles.push(handle);
        }
        handles
    }

    pub fn handles(&self) -> Vec<ServiceHandle> {
        self.services.iter().map(|s| s.handle.clone()).collect()
    }

    /// Number of services still starting or running.
    pub fn running_count(&self) -> usize {
        self.services
            .iter()
            .filter(|s| s.handle.state.borrow().is_live())
            .count()
    }

    /// Terminate every live service and wait for all of them to exit.
    ///
    /// Safe to call repeatedly; later calls find nothing left to stop.
    pub async fn stop_all(&mut self) {
        for svc in &mut self.services {
            if let Some(stop) = svc.stop.take() {
                if svc.handle.state.borrow().is_live() {
                    info!(service = %svc.handle.name(), "stopping service");
                }
                // Err means the task already finished on its own.
                let _ = stop.send(());
            }
        }

        for svc in &mut self.services {
            if let Some(task) = svc.task.take() {
                if let Err(e) = task.await {
                    error!(service = %svc.handle.name(), error = %e, "service task panicked");
                }
            }
        }
    }
}

/// Everything the per-service task owns.
struct ServiceRun {
    name: String,
    spec: CommandSpec,
    state: watch::Sender<ServiceState>,
    events: mpsc::UnboundedSender<SupervisorEvent>,
    stop_grace: Duration,
}

impl ServiceRun {
    async fn run(self, ack: oneshot::Sender<()>, mut stop_rx: oneshot::Receiver<()>) {
        let mut child = match self.spawn().await {
            Ok(child) => child,
            Err(reason) => {
                error!(service = %self.name, cmd = %self.spec, %reason, "service failed to start");
                if self.transition(ServiceState::FailedToStart {
                    reason: reason.clone(),
                }) {
                    self.emit(SupervisorEvent::FailedToStart {
                        service: self.name.clone(),
                        reason,
                    });
                }
                let _ = ack.send(());
                return;
            }
        };

        let pid = child.id();
        info!(service = %self.name, cmd = %self.spec, ?pid, "service started");
        if self.transition(ServiceState::Running { pid }) {
            self.emit(SupervisorEvent::Started {
                service: self.name.clone(),
                pid,
            });
        }
        let _ = ack.send(());

        if let Some(stdout) = child.stdout.take() {
            forward_lines(self.name.clone(), "stdout", stdout);
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(self.name.clone(), "stderr", stderr);
        }

        // Either the service exits on its own, or we are asked to stop it
        // (explicitly, or because the supervisor was dropped).
        let (code, requested) = tokio::select! {
            status = child.wait() => (exit_code(status, &self.name), false),
            _ = &mut stop_rx => (self.terminate(&mut child).await, true),
        };

        if requested {
            info!(service = %self.name, ?code, "service stopped");
        } else {
            warn!(service = %self.name, ?code, "service exited unexpectedly");
        }

        if self.transition(ServiceState::Exited { code }) {
            self.emit(SupervisorEvent::Exited {
                service: self.name.clone(),
                code,
                requested,
            });
        }
    }

    async fn spawn(&self) -> Result<Child, String> {
        check_working_dir(&self.spec).await.map_err(|e| {
            format!(
                "invalid working directory {}: {e}",
                self.spec.working_dir().display()
            )
        })?;

        let mut cmd = self.spec.to_command();
        cmd.kill_on_drop(true);
        // Own process group so termination reaches whatever the shell spawned.
        #[cfg(unix)]
        cmd.process_group(0);

        cmd.spawn().map_err(|e| e.to_string())
    }

    /// SIGTERM the service's process group, escalate to a kill after the
    /// grace period, and return the final exit code.
    async fn terminate(&self, child: &mut Child) -> Option<i32> {
        #[cfg(unix)]
        {
            if let Some(pid) = child.id() {
                signal_group(&self.name, pid, nix::sys::signal::Signal::SIGTERM);

                match tokio::time::timeout(self.stop_grace, child.wait()).await {
                    Ok(status) => return exit_code(status, &self.name),
                    Err(_) => warn!(
                        service = %self.name,
                        grace_ms = self.stop_grace.as_millis() as u64,
                        "service ignored SIGTERM; killing"
                    ),
                }

                signal_group(&self.name, pid, nix::sys::signal::Signal::SIGKILL);
            }
        }

        if let Err(e) = child.start_kill() {
            debug!(service = %self.name, error = %e, "kill failed; process may already be gone");
        }
        exit_code(child.wait().await, &self.name)
    }

    fn transition(&self, next: ServiceState) -> bool {
        self.state.send_if_modified(|current| {
            if current.can_transition_to(&next) {
                *current = next;
                true
            } else {
                debug!(service = %self.name, ?current, ?next, "ignoring non-monotonic transition");
                false
            }
        })
    }

    fn emit(&self, event: SupervisorEvent) {
        if self.events.send(event).is_err() {
            debug!(service = %self.name, "event receiver dropped");
        }
    }
}

#[cfg(unix)]
fn signal_group(name: &str, pid: u32, signal: nix::sys::signal::Signal) {
    use nix::errno::Errno;
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    match killpg(Pid::from_raw(pid as i32), signal) {
        Ok(()) => debug!(service = %name, pid, ?signal, "signalled process group"),
        Err(Errno::ESRCH) => debug!(service = %name, pid, "process group already gone"),
        Err(e) => warn!(service = %name, pid, ?signal, error = %e, "failed to signal process group"),
    }
}

fn exit_code(status: std::io::Result<ExitStatus>, name: &str) -> Option<i32> {
    match status {
        Ok(status) => status.code(),
        Err(e) => {
            warn!(service = %name, error = %e, "failed to wait for service process");
            None
        }
    }
}

/// Log captured service output line by line.
///
/// Lines are decoded lossily; the pipe is drained until EOF so the service
/// never writes into a closed pipe.
fn forward_lines<R>(name: String, stream: &'static str, reader: R)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\n', '\r']);
                    info!(service = %name, stream, "{}", line);
                }
                Err(e) => {
                    warn!(service = %name, stream, error = %e, "failed to read service output");
                    break;
                }
            }
        }
        debug!(service = %name, stream, "output stream closed");
    });
}
