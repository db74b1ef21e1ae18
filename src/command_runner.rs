//! Generic external-command execution with timeout and guaranteed kill.
//!
//! The production implementation uses tokio; test doubles can return canned
//! results without spawning processes. A non-zero exit code is data, not an
//! error: `run` only fails for a missing executable, an inaccessible working
//! directory, or a timeout expiry.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::io::AsyncReadExt;

/// Everything needed to launch one external process. Struct-based to avoid
/// breaking test doubles on future parameter additions.
pub struct CommandRequest<'a> {
    /// Program resolved on `PATH`, e.g. `"docker"`.
    pub program: &'a str,
    /// Ordered argument list.
    pub args: &'a [String],
    /// Environment overlay merged on top of the current process environment.
    /// Overlay wins on key collision.
    pub env: &'a [(String, String)],
    /// Working directory for the child. Must exist when `Some`.
    pub working_dir: Option<&'a Path>,
    /// Wall-clock budget. The child is killed when it expires.
    pub timeout: Duration,
}

/// Captured result of one external process invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Exit code; `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// Full captured stdout, lossily decoded.
    pub stdout: String,
    /// Full captured stderr, lossily decoded.
    pub stderr: String,
    /// Wall-clock time from spawn to exit.
    pub duration: Duration,
}

impl Invocation {
    /// `true` when the process exited with status zero.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Failure to obtain an [`Invocation`] at all.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("working directory {} does not exist", .0.display())]
    WorkingDir(PathBuf),

    #[error("waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {}s", timeout.as_secs())]
    Timeout { program: String, timeout: Duration },
}

/// Generic command execution with timeout and guaranteed process kill.
///
/// This trait is NOT tied to the compose tool — it can run any external
/// command. The production implementation uses tokio; test doubles can
/// return canned results without spawning processes.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a command to completion, capturing stdout and stderr in full.
    async fn run(&self, request: &CommandRequest<'_>) -> Result<Invocation, RunnerError>;
}

/// Production `CommandRunner` — uses tokio for async process execution
/// with guaranteed timeout and kill on all platforms.
///
/// `tokio::time::timeout` around `.output().await` does NOT kill the child
/// process on every platform when the timeout fires — the future is dropped
/// but the OS process keeps running. This implementation uses
/// `tokio::select!` with explicit `child.kill()` to guarantee termination.
pub struct TokioCommandRunner;

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, request: &CommandRequest<'_>) -> Result<Invocation, RunnerError> {
        if let Some(dir) = request.working_dir
            && !dir.is_dir()
        {
            return Err(RunnerError::WorkingDir(dir.to_path_buf()));
        }

        let mut cmd = tokio::process::Command::new(request.program);
        cmd.args(request.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in request.env {
            cmd.env(key, value);
        }
        if let Some(dir) = request.working_dir {
            cmd.current_dir(dir);
        }

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|source| RunnerError::Spawn {
            program: request.program.to_string(),
            source,
        })?;

        let mut stdout_handle = child.stdout.take();
        let mut stderr_handle = child.stderr.take();

        // Read stdout/stderr CONCURRENTLY with wait() to avoid pipe deadlock.
        // If the child writes more than the OS pipe buffer (64KB Linux, 4KB
        // some Windows configs), it blocks on write. If we only call
        // child.wait() first, wait() never resolves → deadlock.
        tokio::select! {
            result = async {
                let (status, stdout, stderr) = tokio::join!(
                    child.wait(),
                    async {
                        let mut buf = Vec::new();
                        if let Some(ref mut h) = stdout_handle {
                            let _ = h.read_to_end(&mut buf).await;
                        }
                        buf
                    },
                    async {
                        let mut buf = Vec::new();
                        if let Some(ref mut h) = stderr_handle {
                            let _ = h.read_to_end(&mut buf).await;
                        }
                        buf
                    },
                );
                let status = status.map_err(|source| RunnerError::Wait {
                    program: request.program.to_string(),
                    source,
                })?;
                Ok(Invocation {
                    exit_code: status.code(),
                    stdout: String::from_utf8_lossy(&stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&stderr).into_owned(),
                    duration: started.elapsed(),
                })
            } => result,
            () = tokio::time::sleep(request.timeout) => {
                let _ = child.kill().await;
                Err(RunnerError::Timeout {
                    program: request.program.to_string(),
                    timeout: request.timeout,
                })
            }
        }
    }
}
