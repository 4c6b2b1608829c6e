//! Execution engine: run the trusted binary with an authorized argv under a wall-clock timeout.
//! The child is spawned directly (argv list, no shell) and killed if the wait is abandoned,
//! whether by the timeout or because the caller's future was dropped (client disconnect).

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;

/// Default wall-clock limit for one command.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Captured result of a process that ran to completion (any exit code).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the child was ended by a signal.
    pub exit_code: Option<i32>,
}

impl ExecOutput {
    /// Output that was not produced by a child process (e.g. canned demo text).
    pub fn text(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
        }
    }

    /// Text shown to the user: stdout, or stderr when stdout is empty.
    pub fn display_text(&self) -> &str {
        if self.stdout.is_empty() {
            &self.stderr
        } else {
            &self.stdout
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Failure of the engine itself (as opposed to a command that ran and reported an error).
#[derive(Debug, Error)]
pub enum ExecError {
    /// The binary could not be started (missing, not executable, ...).
    #[error("failed to start {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The child did not exit in time and was killed; partial output is discarded.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Waiting on the child failed after it started.
    #[error("waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Non-zero exit with nothing on stdout or stderr.
    #[error("{0}")]
    NoOutput(std::process::ExitStatus),
}

impl ExecError {
    /// True for errors that point at a broken deployment rather than at the command.
    pub fn is_launch_failure(&self) -> bool {
        matches!(self, ExecError::Launch { .. })
    }
}

/// How the trusted binary was located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramSource {
    /// Absolute path of the running executable.
    CurrentExe,
    /// Bare name resolved through `PATH`; weaker, since any binary earlier on `PATH` wins.
    PathLookup,
    /// Explicit path supplied by the caller.
    Explicit,
}

/// Spawns one program with per-request argv under a fixed timeout.
#[derive(Debug, Clone)]
pub struct ExecutionEngine {
    program: PathBuf,
    source: ProgramSource,
    timeout: Duration,
}

impl ExecutionEngine {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            source: ProgramSource::Explicit,
            timeout,
        }
    }

    /// Engine for the currently running executable. When the OS cannot report it, falls back
    /// to `fallback` looked up on `PATH` if given; with no fallback the error is returned.
    pub fn current_exe(timeout: Duration, fallback: Option<&str>) -> std::io::Result<Self> {
        Self::from_resolved(std::env::current_exe(), timeout, fallback)
    }

    fn from_resolved(
        resolved: std::io::Result<PathBuf>,
        timeout: Duration,
        fallback: Option<&str>,
    ) -> std::io::Result<Self> {
        match resolved {
            Ok(path) => Ok(Self {
                program: path,
                source: ProgramSource::CurrentExe,
                timeout,
            }),
            Err(e) => match fallback {
                Some(name) => {
                    log::warn!(
                        "cannot resolve own executable ({}); falling back to PATH lookup of {:?}",
                        e,
                        name
                    );
                    Ok(Self {
                        program: PathBuf::from(name),
                        source: ProgramSource::PathLookup,
                        timeout,
                    })
                }
                None => Err(e),
            },
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn source(&self) -> ProgramSource {
        self.source
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the program with `tokens` as its arguments and capture stdout/stderr.
    /// A non-zero exit that printed something is returned as `Ok`; callers read the text the
    /// way a terminal user would.
    pub async fn execute(&self, tokens: &[String]) -> Result<ExecOutput, ExecError> {
        let program = self.program.display().to_string();
        let child = Command::new(&self.program)
            .args(tokens)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExecError::Launch {
                program: program.clone(),
                source,
            })?;

        // On timeout the wait future (and the child it owns) is dropped, which kills the child.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => return Err(ExecError::Wait { program, source }),
            Err(_) => return Err(ExecError::Timeout(self.timeout)),
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() && stdout.is_empty() && stderr.is_empty() {
            return Err(ExecError::NoOutput(output.status));
        }
        Ok(ExecOutput {
            stdout,
            stderr,
            exit_code: output.status.code(),
        })
    }
}
