//! Command Runner
//!
//! Spawns an external program from an argument vector, drains its stdout
//! and stderr line by line while waiting for it to exit, and turns a
//! non-zero exit into a structured error.
//! Output can be echoed to the console as it arrives and is always buffered.

use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::Command;

use super::events::{EventSink, OutputStream, RunEvent};

/// Argument vector for a single invocation: program first, then its arguments
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandSpec {
    argv: Vec<OsString>,
}

impl CommandSpec {
    /// Build a spec from an argument vector. Never fails; the runner validates it.
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
        }
    }

    /// The executable, if any
    pub fn program(&self) -> Option<&OsStr> {
        self.argv.first().map(OsString::as_os_str)
    }

    /// Arguments after the executable
    pub fn args(&self) -> &[OsString] {
        self.argv.get(1..).unwrap_or(&[])
    }

    pub fn argv(&self) -> &[OsString] {
        &self.argv
    }

    pub fn is_empty(&self) -> bool {
        self.argv.is_empty()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<_> = self.argv.iter().map(|a| a.to_string_lossy()).collect();
        write!(f, "{}", parts.join(" "))
    }
}

/// Per-invocation options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Forward each output line to the matching console stream as it arrives
    pub echo: bool,
    /// Kill the child if it has not finished after this long
    pub timeout: Option<Duration>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            echo: true,
            timeout: None,
        }
    }
}

impl RunOptions {
    /// Capture only, nothing written to the console
    pub fn quiet() -> Self {
        Self {
            echo: false,
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Result of a finished process
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionResult {
    /// Exit code (signal terminations are reported as 128 + signal on Unix)
    pub exit_code: i32,
    /// Captured stdout, one entry per line
    pub stdout: Vec<String>,
    /// Captured stderr, one entry per line
    pub stderr: Vec<String>,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn stdout_text(&self) -> String {
        self.stdout.join("\n")
    }

    pub fn stderr_text(&self) -> String {
        self.stderr.join("\n")
    }
}

/// Command runner errors
#[derive(Debug, Error)]
pub enum CommandError {
    /// Empty or malformed argument vector; nothing was spawned
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// The OS refused to create the process
    #[error("Failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The process ran and exited non-zero
    #[error("'{program}' exited with code {code}")]
    Execution {
        program: String,
        code: i32,
        result: ExecutionResult,
    },

    #[error("Command timed out after {0:?}")]
    TimedOut(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CommandError {
    /// Exit code of a process that ran and failed
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            CommandError::Execution { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Captured stderr of a process that ran and failed
    pub fn stderr(&self) -> Option<&[String]> {
        match self {
            CommandError::Execution { result, .. } => Some(&result.stderr),
            _ => None,
        }
    }
}

/// Anything that can execute a [`CommandSpec`].
///
/// Callers depend on this trait only, so tests can swap in a fake.
#[async_trait]
pub trait Runner: Send + Sync {
    async fn run(
        &self,
        spec: &CommandSpec,
        options: &RunOptions,
    ) -> Result<ExecutionResult, CommandError>;
}

/// Runs commands as tokio child processes
#[derive(Clone, Default)]
pub struct CommandRunner {
    /// Environment variables to add
    env_additions: HashMap<String, String>,
    events: Option<EventSink>,
}

impl fmt::Debug for CommandRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRunner")
            .field("env_additions", &self.env_additions)
            .field("events", &self.events.is_some())
            .finish()
    }
}

impl CommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_additions.insert(key.into(), value.into());
        self
    }

    /// Install a structured event callback
    pub fn with_events(mut self, sink: EventSink) -> Self {
        self.events = Some(sink);
        self
    }

    fn emit(&self, event: RunEvent<'_>) {
        if let Some(sink) = &self.events {
            sink(&event);
        }
    }

    /// Run a command, echoing into the given writers instead of the real console
    pub async fn run_with_console<O, E>(
        &self,
        spec: &CommandSpec,
        options: &RunOptions,
        console_out: &mut O,
        console_err: &mut E,
    ) -> Result<ExecutionResult, CommandError>
    where
        O: AsyncWrite + Unpin + Send,
        E: AsyncWrite + Unpin + Send,
    {
        let program = match spec.program() {
            Some(p) if !p.is_empty() => p,
            Some(_) => {
                return Err(CommandError::InvalidCommand(
                    "executable path is empty".to_string(),
                ))
            }
            None => {
                return Err(CommandError::InvalidCommand(
                    "argument vector is empty".to_string(),
                ))
            }
        };
        let program_name = program.to_string_lossy().into_owned();

        let mut child = Command::new(program)
            .args(spec.args())
            .envs(&self.env_additions)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CommandError::Spawn {
                program: program_name.clone(),
                source,
            })?;

        self.emit(RunEvent::Spawned {
            program: &program_name,
            pid: child.id(),
        });

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CommandError::Io(pipe_missing("stdout")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| CommandError::Io(pipe_missing("stderr")))?;

        let echo_out = options.echo.then_some(&mut *console_out);
        let echo_err = options.echo.then_some(&mut *console_err);

        // Both pipes and the exit wait are polled together; none may wait on another
        let outcome = {
            let work = async {
                tokio::join!(
                    self.drain(stdout, echo_out, OutputStream::Stdout),
                    self.drain(stderr, echo_err, OutputStream::Stderr),
                    child.wait(),
                )
            };
            match options.timeout {
                Some(limit) => tokio::time::timeout(limit, work).await.ok(),
                None => Some(work.await),
            }
        };

        let Some((stdout, stderr, status)) = outcome else {
            // kill() also reaps, so no zombie is left behind
            if let Err(e) = child.kill().await {
                let error = e.to_string();
                self.emit(RunEvent::KillFailed { error: &error });
            }
            let after = options.timeout.unwrap_or_default();
            self.emit(RunEvent::TimedOut { after });
            return Err(CommandError::TimedOut(after));
        };

        let exit_code = exit_code(status?);
        self.emit(RunEvent::Exited { code: exit_code });

        let result = ExecutionResult {
            exit_code,
            stdout: stdout?,
            stderr: stderr?,
        };

        if result.success() {
            Ok(result)
        } else {
            Err(CommandError::Execution {
                program: program_name,
                code: exit_code,
                result,
            })
        }
    }

    /// Read a pipe to end-of-stream, echoing and collecting lines
    async fn drain<R, W>(
        &self,
        pipe: R,
        mut echo: Option<&mut W>,
        stream: OutputStream,
    ) -> std::io::Result<Vec<String>>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        let mut lines = Vec::new();

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            let line = decode_line(&buf);

            if let Some(writer) = echo.as_mut() {
                if echo_line(&mut **writer, &line).await.is_err() {
                    // Console is gone; keep draining so the child cannot stall
                    echo = None;
                }
            }

            self.emit(RunEvent::Line {
                stream,
                line: &line,
            });
            lines.push(line);
        }

        Ok(lines)
    }
}

#[async_trait]
impl Runner for CommandRunner {
    async fn run(
        &self,
        spec: &CommandSpec,
        options: &RunOptions,
    ) -> Result<ExecutionResult, CommandError> {
        let mut out = tokio::io::stdout();
        let mut err = tokio::io::stderr();
        self.run_with_console(spec, options, &mut out, &mut err).await
    }
}

async fn echo_line<W: AsyncWrite + Unpin + ?Sized>(writer: &mut W, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

/// Decode one raw line, replacing invalid UTF-8 and stripping the terminator
fn decode_line(raw: &[u8]) -> String {
    let mut end = raw.len();
    if raw[..end].ends_with(b"\n") {
        end -= 1;
    }
    if raw[..end].ends_with(b"\r") {
        end -= 1;
    }
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

fn pipe_missing(name: &str) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        format!("Failed to capture {}", name),
    )
}
