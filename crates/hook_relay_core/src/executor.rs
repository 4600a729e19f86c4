//! Hook execution.
//!
//! Every resolved hook is started as `<hook> <payload file> <event>` with no
//! standard input. Hooks run one after the other in resolution order, and a
//! failing hook never stops the ones after it.
//!
//! The payload is written once per request to a temporary file that is removed
//! when [`PayloadFile`] is dropped, whether the batch finished, a hook failed
//! to launch, or the request future was cancelled.
//!
//! ## Exit codes
//!
//! A hook that ran reports its own exit code. Conditions where no exit code
//! exists are recorded with the usual shell conventions:
//!
//! | Code    | Meaning                                  |
//! |---------|------------------------------------------|
//! | 124     | hook exceeded its timeout and was killed |
//! | 126     | hook could not be started                |
//! | 127     | hook file no longer exists               |
//! | 128 + N | hook was terminated by signal N          |
//!
//! On unix each hook leads its own process group, so a timeout kills anything
//! the hook started along with it.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::resolver::HookCandidate;

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;

pub const EXIT_TIMED_OUT: i32 = 124;
pub const EXIT_NOT_EXECUTABLE: i32 = 126;
pub const EXIT_NOT_FOUND: i32 = 127;

/// Outcome of one hook invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub returncode: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.returncode == 0
    }

    fn from_output(output: Output) -> Self {
        Self {
            returncode: exit_code(&output.status),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    fn launch_failure(error: &io::Error) -> Self {
        let returncode = if error.kind() == io::ErrorKind::NotFound {
            EXIT_NOT_FOUND
        } else {
            EXIT_NOT_EXECUTABLE
        };
        Self {
            returncode,
            stdout: String::new(),
            stderr: format!("failed to launch hook: {error}"),
        }
    }

    fn timed_out(limit: Duration) -> Self {
        Self {
            returncode: EXIT_TIMED_OUT,
            stdout: String::new(),
            stderr: format!("hook timed out after {}s", limit.as_secs_f64()),
        }
    }
}

#[cfg(unix)]
fn exit_code(status: &std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: &std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// The serialized payload handed to hooks, deleted on drop.
#[derive(Debug)]
pub struct PayloadFile {
    file: NamedTempFile,
}

impl PayloadFile {
    /// Writes `payload` as JSON to a fresh temporary file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created or written.
    pub fn create(payload: &serde_json::Value) -> io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("hook-relay-")
            .suffix(".json")
            .tempfile()?;
        serde_json::to_writer(&mut file, payload)?;
        file.flush()?;

        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// A single hook invocation: the program and its fixed argument vector.
///
/// Arguments are passed to the program directly, never through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookInvocation {
    pub program: PathBuf,
    pub args: [OsString; 2],
}

impl HookInvocation {
    pub fn new(program: impl Into<PathBuf>, payload_file: &Path, event: &str) -> Self {
        Self {
            program: program.into(),
            args: [payload_file.as_os_str().to_owned(), OsString::from(event)],
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);
        command
    }
}

/// Runs resolved hooks sequentially.
#[derive(Debug, Clone, Default)]
pub struct HookExecutor {
    timeout: Option<Duration>,
}

impl HookExecutor {
    /// Creates an executor; `timeout` bounds each hook, `None` waits indefinitely.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// Runs every hook in order and collects the results keyed by hook name.
    ///
    /// # Errors
    ///
    /// Returns an I/O error only if the payload file cannot be prepared. Hook
    /// failures of any kind are recorded in the results instead.
    pub async fn execute(
        &self,
        hooks: &[HookCandidate],
        payload: &serde_json::Value,
        event: &str,
    ) -> io::Result<BTreeMap<String, ExecutionResult>> {
        let payload_file = PayloadFile::create(payload)?;
        debug!(payload_file = %payload_file.path().display(), "payload saved");

        let mut results = BTreeMap::new();
        for hook in hooks {
            let invocation = HookInvocation::new(&hook.path, payload_file.path(), event);
            info!(hook = %invocation.program.display(), "try to execute hook");

            let result = self.run(&invocation).await;
            if !result.success() {
                error!(
                    hook = %invocation.program.display(),
                    returncode = result.returncode,
                    stderr = %result.stderr,
                    "hook failed"
                );
            }
            results.insert(hook.name(), result);
        }

        drop(payload_file);
        Ok(results)
    }

    /// Runs a single invocation to completion, capturing its output.
    pub async fn run(&self, invocation: &HookInvocation) -> ExecutionResult {
        let child = match invocation.command().spawn() {
            Ok(child) => child,
            Err(e) => return ExecutionResult::launch_failure(&e),
        };

        let pid = child.id();

        // Dropping the future on timeout drops the child, which kills it.
        let output = child.wait_with_output();
        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, output).await {
                Ok(output) => output,
                Err(_) => {
                    kill_process_group(pid);
                    return ExecutionResult::timed_out(limit);
                }
            },
            None => output.await,
        };

        match output {
            Ok(output) => ExecutionResult::from_output(output),
            Err(e) => ExecutionResult::launch_failure(&e),
        }
    }
}

/// Sends `SIGKILL` to the process group led by `pid`.
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid.and_then(|pid| i32::try_from(pid).ok()) else {
        return;
    };
    match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::warn!(pid, error = %e, "failed to kill hook process group"),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}
