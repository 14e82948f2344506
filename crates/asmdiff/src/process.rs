//! External process execution.
//!
//! Runs a program to completion and captures its exit code, stdout and stderr
//! as separate byte streams. A non-zero exit is a normal result, not an error.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Program plus arguments, built by the toolchain layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Program name as shown in diagnostics.
    #[must_use]
    pub fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessResult {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessResult {
    pub fn new(exit_code: i32, stdout: impl Into<Vec<u8>>, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Whether the process wrote anything to either stream.
    #[must_use]
    pub fn has_output(&self) -> bool {
        !self.stdout.is_empty() || !self.stderr.is_empty()
    }

    /// Diagnostic text for failure reports: stderr, or stdout if stderr is empty.
    #[must_use]
    pub fn diagnostics(&self) -> String {
        let stderr = String::from_utf8_lossy(&self.stderr);
        let stderr = stderr.trim();
        if stderr.is_empty() {
            String::from_utf8_lossy(&self.stdout).trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Failure to obtain a [`ProcessResult`] at all.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("'{program}' not found")]
    NotFound { program: String },

    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("'{program}' timed out after {}s", timeout.as_secs_f64())]
    TimedOut { program: String, timeout: Duration },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl RunError {
    fn from_spawn(program: &Path, err: io::Error) -> Self {
        let program = program.display().to_string();
        if err.kind() == io::ErrorKind::NotFound {
            Self::NotFound { program }
        } else {
            Self::Launch {
                program,
                source: err,
            }
        }
    }
}

/// Runs external programs synchronously with an optional timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    /// Runner without a timeout.
    #[must_use]
    pub const fn new() -> Self {
        Self { timeout: None }
    }

    /// Kill children that run longer than `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run `command` with no stdin and capture both output streams.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] if the program cannot be launched, the wait fails,
    /// or the timeout elapses before the child exits and both of its output
    /// streams close. A non-zero exit code is returned as `Ok`.
    pub fn run(&self, command: &ToolCommand) -> Result<ProcessResult, RunError> {
        debug!(command = %command, "spawning");

        let mut child = command
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RunError::from_spawn(&command.program, e))?;

        // Drain both pipes concurrently so a chatty child cannot block on a full pipe.
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);
        let timed_out = || {
            let timeout = self.timeout.unwrap_or_default();
            // Readers may stay blocked on grandchildren holding the pipes; leave them.
            warn!(command = %command, timeout_secs = timeout.as_secs_f64(), "timed out");
            RunError::TimedOut {
                program: command.program_name(),
                timeout,
            }
        };

        let status = match deadline {
            Some(deadline) => match wait_until(&mut child, deadline)? {
                Some(status) => status,
                None => return Err(timed_out()),
            },
            None => child.wait()?,
        };

        // The child is gone, but a background grandchild can keep the pipes open.
        let (Some(stdout), Some(stderr)) = (
            collect_output(stdout, deadline)?,
            collect_output(stderr, deadline)?,
        ) else {
            return Err(timed_out());
        };

        let result = ProcessResult {
            exit_code: exit_code(status),
            stdout,
            stderr,
        };
        debug!(
            program = %command.program.display(),
            exit_code = result.exit_code,
            stdout_len = result.stdout.len(),
            stderr_len = result.stderr.len(),
            "finished"
        );
        Ok(result)
    }
}

type OutputReader = Receiver<io::Result<Vec<u8>>>;

fn spawn_reader<R: Read + Send + 'static>(mut reader: R) -> OutputReader {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = tx.send(reader.read_to_end(&mut buf).map(|_| buf));
    });
    rx
}

/// Wait for a reader to hit end of stream. Returns `None` if `deadline` passes first.
fn collect_output(
    reader: Option<OutputReader>,
    deadline: Option<Instant>,
) -> io::Result<Option<Vec<u8>>> {
    let Some(reader) = reader else {
        return Ok(Some(Vec::new()));
    };
    let received = match deadline {
        Some(deadline) => {
            match reader.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                Ok(output) => output,
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => Err(reader_gone()),
            }
        }
        None => reader.recv().unwrap_or_else(|_| Err(reader_gone())),
    };
    received.map(Some)
}

fn reader_gone() -> io::Error {
    io::Error::other("output reader exited without a result")
}

/// Poll the child until it exits or `deadline` passes. Returns `None` after killing it.
fn wait_until(child: &mut Child, deadline: Instant) -> io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Exit code, or the negated signal number for signal-terminated children.
#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|sig| -sig))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
