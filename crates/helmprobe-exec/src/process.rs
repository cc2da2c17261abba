//! Bounded external process execution with an exit-code policy
//!
//! Output goes to anonymous temporary files rather than pipes, so a chatty
//! process can never block on a full pipe while we poll for its exit.

use std::ffi::OsStr;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use crate::error::{ExecError, Result};
use crate::staging::Stager;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Which exit status the caller considers correct
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    Success,
    Failure,
}

/// What a finished process produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was ended by a signal
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    timeout: Duration,
    stager: Stager,
}

impl ProcessExecutor {
    /// `stager` receives the stdout of runs that succeed when failure was expected
    pub fn new(timeout: Duration, stager: Stager) -> Self {
        Self { timeout, stager }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn stager(&self) -> &Stager {
        &self.stager
    }

    /// Run `executable` with `args` and apply the exit-code policy
    ///
    /// The process (with its process group on unix) is killed and reaped if it
    /// outlives the timeout. Exit status is only read once the process has
    /// fully terminated.
    pub fn run<S: AsRef<OsStr>>(
        &self,
        executable: &Path,
        args: &[S],
        expect: Expect,
    ) -> Result<CommandOutput> {
        let command = command_line(executable, args);
        let failure = |source| ExecError::ProcessExecutionFailure {
            command: command.clone(),
            source,
        };

        let mut stdout_file = tempfile::tempfile().map_err(failure)?;
        let mut stderr_file = tempfile::tempfile().map_err(failure)?;

        tracing::debug!("running `{}` (timeout {:?})", command, self.timeout);
        let mut spawn = Command::new(executable);
        spawn
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout_file.try_clone().map_err(failure)?))
            .stderr(Stdio::from(stderr_file.try_clone().map_err(failure)?));
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Own process group, so a timeout also ends whatever the child started
            spawn.process_group(0);
        }
        let mut child = spawn.spawn().map_err(failure)?;

        let status = wait_with_deadline(&mut child, self.timeout).map_err(failure)?;
        let stderr = read_captured(&mut stderr_file).map_err(failure)?;

        let Some(status) = status else {
            tracing::warn!("`{}` timed out after {:?}", command, self.timeout);
            return Err(ExecError::Timeout {
                command,
                timeout: self.timeout,
                stderr,
            });
        };

        let stdout = read_captured(&mut stdout_file).map_err(failure)?;
        let output = CommandOutput {
            stdout,
            stderr,
            exit_code: status.code(),
        };
        tracing::debug!("`{}` exited with {:?}", command, output.exit_code);

        match (expect, output.success()) {
            (Expect::Success, false) => Err(ExecError::CommandFailed {
                command,
                exit_code: output.exit_code,
                stderr: output.stderr,
            }),
            (Expect::Failure, true) => {
                let output_path = self.stager.persist_output(&output.stdout)?;
                Err(ExecError::CommandUnexpectedlySucceeded {
                    command,
                    output_path,
                })
            }
            _ => Ok(output),
        }
    }
}

/// Wait for `child` to exit; `None` means it was killed at the deadline
fn wait_with_deadline(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            kill_process_group(child);
            child.wait()?;
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// SIGKILL the child's process group, falling back to the child alone
///
/// An exit between the deadline check and the signal is fine; the caller's
/// `wait()` reaps the child either way.
#[cfg(unix)]
fn kill_process_group(child: &mut Child) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let killed = i32::try_from(child.id())
        .ok()
        .map(|pid| killpg(Pid::from_raw(pid), Signal::SIGKILL).is_ok())
        .unwrap_or(false);
    if !killed {
        let _ = child.kill();
    }
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) {
    let _ = child.kill();
}

fn read_captured(file: &mut File) -> std::io::Result<String> {
    let mut bytes = Vec::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn command_line<S: AsRef<OsStr>>(executable: &Path, args: &[S]) -> String {
    std::iter::once(executable.as_os_str())
        .chain(args.iter().map(AsRef::as_ref))
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}
