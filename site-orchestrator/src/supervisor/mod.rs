//! Supervision of the bundled CRM backend.
//!
//! A [`Supervisor`] owns the one child process. Once started it runs on its
//! own task and is the only code that touches the child; everything else holds
//! a [`SupervisorHandle`], reads status snapshots from a watch channel and asks
//! for shutdown through a command queue.
//!
//! Lifecycle: after an optional start delay the child is spawned. A nonzero
//! exit (or death by signal, or a failed spawn) schedules a respawn after the
//! restart delay. A zero exit leaves the child down for good. A shutdown
//! request forwards the signal to a live child once and ends supervision
//! without waiting for the child to exit.

mod process;

pub use process::ProcessSpec;

use metrics::counter;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Child;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::sleep;

pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(5);

/// Termination signals the orchestrator reacts to and forwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Terminate,
    Interrupt,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Terminate => f.write_str("SIGTERM"),
            ShutdownSignal::Interrupt => f.write_str("SIGINT"),
        }
    }
}

#[cfg(unix)]
impl From<ShutdownSignal> for nix::sys::signal::Signal {
    fn from(signal: ShutdownSignal) -> Self {
        match signal {
            ShutdownSignal::Terminate => nix::sys::signal::Signal::SIGTERM,
            ShutdownSignal::Interrupt => nix::sys::signal::Signal::SIGINT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessState {
    NotStarted,
    Starting,
    Running { pid: u32 },
    /// Crashed; waiting out the restart delay.
    Restarting,
    /// Exited cleanly; will not be restarted.
    Stopped,
    ShuttingDown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessStatus {
    pub state: ProcessState,
    pub spawn_count: u32,
    /// `None` until the first exit, and after a death by signal.
    pub last_exit_code: Option<i32>,
}

impl Default for ProcessStatus {
    fn default() -> Self {
        Self {
            state: ProcessState::NotStarted,
            spawn_count: 0,
            last_exit_code: None,
        }
    }
}

impl ProcessStatus {
    pub fn is_live(&self) -> bool {
        matches!(self.state, ProcessState::Running { .. })
    }
}

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Failed to deliver {signal} to process {pid}: {reason}")]
    Signal {
        signal: ShutdownSignal,
        pid: u32,
        reason: String,
    },
}

enum Command {
    Shutdown {
        signal: ShutdownSignal,
        reply: oneshot::Sender<Result<bool, SupervisorError>>,
    },
}

enum Event {
    Exited(Option<i32>),
    Command(Option<Command>),
}

pub struct Supervisor {
    spec: ProcessSpec,
    restart_delay: Duration,
    start_delay: Duration,
}

impl Supervisor {
    pub fn new(spec: ProcessSpec) -> Self {
        Self {
            spec,
            restart_delay: DEFAULT_RESTART_DELAY,
            start_delay: Duration::ZERO,
        }
    }

    pub fn with_restart_delay(mut self, delay: Duration) -> Self {
        self.restart_delay = delay;
        self
    }

    /// Wait this long before the first spawn.
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    /// Hand the process over to a background task. Must be called inside a
    /// Tokio runtime.
    pub fn start(self) -> SupervisorHandle {
        let (commands_tx, commands_rx) = mpsc::channel(8);
        let (status_tx, status_rx) = watch::channel(ProcessStatus::default());

        tokio::spawn(self.run(commands_rx, status_tx));

        SupervisorHandle {
            commands: commands_tx,
            status: status_rx,
        }
    }

    async fn run(self, mut commands: mpsc::Receiver<Command>, status: watch::Sender<ProcessStatus>) {
        let name = self.spec.name.clone();

        if !self.start_delay.is_zero() {
            tokio::select! {
                _ = sleep(self.start_delay) => {}
                command = commands.recv() => {
                    stand_down(command, &status);
                    return;
                }
            }
        }

        loop {
            tracing::info!(process = %name, "Starting {} backend", name);
            status.send_modify(|s| s.state = ProcessState::Starting);

            let exit_code = match self.spec.spawn() {
                Ok(mut child) => {
                    let pid = child.id().unwrap_or_default();
                    counter!("crm_process_spawns_total").increment(1);
                    status.send_modify(|s| {
                        s.spawn_count += 1;
                        s.state = ProcessState::Running { pid };
                    });
                    tracing::info!(process = %name, pid, "{} backend started", name);

                    process::forward_output(&name, &mut child);

                    let event = tokio::select! {
                        exit = child.wait() => Event::Exited(match exit {
                            Ok(exit_status) => exit_status.code(),
                            Err(e) => {
                                tracing::error!(process = %name, error = %e, "Failed to wait for process");
                                None
                            }
                        }),
                        command = commands.recv() => Event::Command(command),
                    };

                    match event {
                        Event::Exited(code) => code,
                        Event::Command(command) => {
                            shut_down_child(command, &mut child, &status);
                            return;
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(process = %name, error = %e, "Failed to start {}", name);
                    None
                }
            };

            status.send_modify(|s| s.last_exit_code = exit_code);
            tracing::info!(process = %name, code = ?exit_code, "[{}] Process exited", name);

            if exit_code == Some(0) {
                status.send_modify(|s| s.state = ProcessState::Stopped);
                // Stay down, but keep answering shutdown requests.
                let command = commands.recv().await;
                stand_down(command, &status);
                return;
            }

            tracing::error!(
                process = %name,
                delay_secs = self.restart_delay.as_secs_f64(),
                "{} backend crashed, attempting restart",
                name
            );
            status.send_modify(|s| s.state = ProcessState::Restarting);

            tokio::select! {
                _ = sleep(self.restart_delay) => {}
                command = commands.recv() => {
                    stand_down(command, &status);
                    return;
                }
            }
        }
    }
}

/// Shutdown while no child is alive: nothing to signal.
fn stand_down(command: Option<Command>, status: &watch::Sender<ProcessStatus>) {
    status.send_modify(|s| s.state = ProcessState::ShuttingDown);
    if let Some(Command::Shutdown { reply, .. }) = command {
        let _ = reply.send(Ok(false));
    }
}

fn shut_down_child(
    command: Option<Command>,
    child: &mut Child,
    status: &watch::Sender<ProcessStatus>,
) {
    status.send_modify(|s| s.state = ProcessState::ShuttingDown);

    match command {
        Some(Command::Shutdown { signal, reply }) => {
            let result = deliver(child, signal);
            match &result {
                Ok(_) => tracing::info!(%signal, "Forwarded {} to supervised process", signal),
                Err(e) => tracing::error!(error = %e, "Failed to forward shutdown signal"),
            }
            let _ = reply.send(result);
        }
        None => {
            // Every handle is gone, so no graceful stop can be requested any more.
            let _ = child.start_kill();
        }
    }
}

#[cfg(unix)]
fn deliver(child: &mut Child, signal: ShutdownSignal) -> Result<bool, SupervisorError> {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return Ok(false);
    };

    kill(Pid::from_raw(pid as i32), nix::sys::signal::Signal::from(signal)).map_err(|errno| {
        SupervisorError::Signal {
            signal,
            pid,
            reason: errno.to_string(),
        }
    })?;

    Ok(true)
}

#[cfg(not(unix))]
fn deliver(child: &mut Child, signal: ShutdownSignal) -> Result<bool, SupervisorError> {
    let Some(pid) = child.id() else {
        return Ok(false);
    };

    child.start_kill().map_err(|e| SupervisorError::Signal {
        signal,
        pid,
        reason: e.to_string(),
    })?;

    Ok(true)
}

/// Cheap, cloneable view of a running [`Supervisor`].
#[derive(Clone)]
pub struct SupervisorHandle {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<ProcessStatus>,
}

impl SupervisorHandle {
    /// Latest status snapshot. Never blocks.
    pub fn current_status(&self) -> ProcessStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProcessStatus> {
        self.status.clone()
    }

    /// Forward `signal` to the child if one is alive and stop supervising.
    ///
    /// Returns `Ok(true)` when the signal was delivered. Only the first call
    /// can deliver; later calls return `Ok(false)`.
    pub async fn shutdown(&self, signal: ShutdownSignal) -> Result<bool, SupervisorError> {
        let (reply, response) = oneshot::channel();

        if self
            .commands
            .send(Command::Shutdown { signal, reply })
            .await
            .is_err()
        {
            return Ok(false);
        }

        response.await.unwrap_or(Ok(false))
    }
}
