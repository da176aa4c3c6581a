//! A single external process started and stopped on demand

use std::process::{Child, Command, Stdio};

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tracing::{debug, info, warn};

use super::command::CommandLine;

/// The backend program could not be launched
#[derive(Debug, thiserror::Error)]
#[error("failed to launch {program}: {source}")]
pub struct SpawnError {
    pub program: String,
    #[source]
    pub source: std::io::Error,
}

/// Owns at most one live child process for a fixed command line
#[derive(Debug)]
pub struct BackgroundTask {
    command: CommandLine,
    /// Show the child's stderr instead of discarding it
    debug: bool,
    child: Option<Child>,
    /// Children sent SIGTERM that have not been reaped yet
    exiting: Vec<Child>,
}

impl BackgroundTask {
    pub fn new(command: CommandLine, debug: bool) -> Self {
        Self {
            command,
            debug,
            child: None,
            exiting: Vec::new(),
        }
    }

    pub fn command(&self) -> &CommandLine {
        &self.command
    }

    /// Check if a process handle is currently held
    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Spawn the process in the background.
    ///
    /// A process left over from a previous `start` is stopped first, so at
    /// most one handle is ever held.
    pub fn start(&mut self) -> Result<(), SpawnError> {
        if self.child.is_some() {
            warn!(command = %self.command, "task already running, restarting");
            self.stop();
        }
        self.reap();

        let stderr = if self.debug {
            Stdio::inherit()
        } else {
            Stdio::null()
        };

        let child = Command::new(self.command.program())
            .args(self.command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(stderr)
            .spawn()
            .map_err(|source| SpawnError {
                program: self.command.program().display().to_string(),
                source,
            })?;

        info!(pid = child.id(), command = %self.command, "task started");
        self.child = Some(child);
        Ok(())
    }

    /// Ask the process to terminate and forget it.
    ///
    /// Does nothing if no process is held. Never waits for the process to
    /// exit and never fails; signal errors are only logged.
    pub fn stop(&mut self) {
        if let Some(child) = self.child.take() {
            let pid = child.id();
            match i32::try_from(pid) {
                Ok(raw) => {
                    if let Err(e) = kill(Pid::from_raw(raw), Signal::SIGTERM) {
                        debug!(pid, ?e, "failed to signal task");
                    }
                }
                Err(_) => debug!(pid, "pid out of range, not signalled"),
            }
            info!(pid, program = %self.command.program().display(), "task stopped");
            self.exiting.push(child);
        }
        self.reap();
    }

    /// Drop handles of children that have already exited
    fn reap(&mut self) {
        self.exiting
            .retain_mut(|child| matches!(child.try_wait(), Ok(None)));
    }
}

impl Drop for BackgroundTask {
    fn drop(&mut self) {
        self.stop();
    }
}
