//! Spawns entry points and reports how they ended.

use std::process::{Child, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use semver::Version;
use tracing::{debug, instrument, warn};

use trestle_core::{
    application::{
        ApplicationError,
        ports::{ChildExit, LaunchRequest, ProcessLauncher, RuntimeProbe},
    },
    domain::parse_version_loose,
    error::{TrestleError, TrestleResult},
};

use super::Runtime;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Runs each entry point in its own process with inherited stdio.
#[derive(Debug, Clone)]
pub struct ChildProcessLauncher {
    runtime: Runtime,
}

impl ChildProcessLauncher {
    pub fn new(runtime: Runtime) -> Self {
        Self { runtime }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    fn spawn_error(&self, e: std::io::Error) -> TrestleError {
        ApplicationError::Spawn {
            program: self.runtime.program().to_string(),
            reason: e.to_string(),
        }
        .into()
    }
}

impl ProcessLauncher for ChildProcessLauncher {
    #[instrument(skip_all, fields(entry = %request.entry.display()))]
    fn launch(&self, request: &LaunchRequest) -> TrestleResult<ChildExit> {
        let mut command = self.runtime.command(&request.entry, &request.context_json);
        command
            .current_dir(&request.working_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let mut child = command.spawn().map_err(|e| self.spawn_error(e))?;
        debug!(pid = child.id(), "Child started");

        let status = match request.timeout {
            None => child.wait().map_err(|e| self.spawn_error(e))?,
            Some(limit) => {
                match wait_with_timeout(&mut child, limit).map_err(|e| self.spawn_error(e))? {
                    Some(status) => status,
                    None => {
                        warn!(seconds = limit.as_secs(), "Child timed out, killed");
                        return Ok(ChildExit::TimedOut(limit));
                    }
                }
            }
        };

        let exit = exit_of(status);
        debug!(?exit, "Child finished");
        Ok(exit)
    }
}

impl RuntimeProbe for ChildProcessLauncher {
    fn version(&self) -> TrestleResult<Option<Version>> {
        if !self.runtime.is_versioned() {
            return Ok(None);
        }
        let output = self
            .runtime
            .version_command()
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.spawn_error(e))?;
        if !output.status.success() {
            return Err(ApplicationError::Environment {
                reason: format!(
                    "'{} --version' failed: {}",
                    self.runtime.program(),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            }
            .into());
        }

        let reported = String::from_utf8_lossy(&output.stdout);
        let version =
            parse_version_loose(reported.trim()).ok_or_else(|| ApplicationError::Environment {
                reason: format!("cannot parse runtime version '{}'", reported.trim()),
            })?;
        Ok(Some(version))
    }
}

/// `None` when `limit` elapsed; the child has been killed and reaped.
fn wait_with_timeout(child: &mut Child, limit: Duration) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            child.kill()?;
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn exit_of(status: ExitStatus) -> ChildExit {
    match status.code() {
        Some(code) => ChildExit::Code(code),
        None => ChildExit::Signal(signal_of(status)),
    }
}

#[cfg(unix)]
fn signal_of(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn signal_of(_status: ExitStatus) -> Option<i32> {
    None
}
