//! Structured run events
//!
//! The runner reports what happens to a child process through an optional
//! callback instead of logging directly. [`tracing_sink`] adapts those
//! events to `tracing` for callers that want them in the log.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Which output pipe a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputStream::Stdout => write!(f, "stdout"),
            OutputStream::Stderr => write!(f, "stderr"),
        }
    }
}

/// Something that happened during a single invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent<'a> {
    Spawned { program: &'a str, pid: Option<u32> },
    Line { stream: OutputStream, line: &'a str },
    Exited { code: i32 },
    TimedOut { after: Duration },
    /// The child could not be killed after a timeout
    KillFailed { error: &'a str },
}

/// Callback receiving [`RunEvent`]s
pub type EventSink = Arc<dyn Fn(&RunEvent<'_>) + Send + Sync>;

/// Forward run events to `tracing`
pub fn tracing_sink() -> EventSink {
    Arc::new(|event: &RunEvent<'_>| match event {
        RunEvent::Spawned { program, pid } => {
            tracing::debug!(program = %program, pid = ?pid, "Process spawned");
        }
        RunEvent::Line { stream, line } => {
            tracing::trace!(stream = %stream, "{}", line);
        }
        RunEvent::Exited { code } => {
            tracing::debug!(code = *code, "Process exited");
        }
        RunEvent::TimedOut { after } => {
            tracing::warn!(after = ?after, "Process timed out and was killed");
        }
        RunEvent::KillFailed { error } => {
            tracing::warn!(error = %error, "Failed to kill timed out process");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    /// Collects formatted log output in memory
    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLog {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[test]
    fn test_output_stream_display() {
        assert_eq!(OutputStream::Stdout.to_string(), "stdout");
        assert_eq!(OutputStream::Stderr.to_string(), "stderr");
    }

    #[test]
    fn test_tracing_sink_logs_every_event() {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let sink = tracing_sink();
            sink(&RunEvent::Spawned {
                program: "snapraid",
                pid: Some(42),
            });
            sink(&RunEvent::Line {
                stream: OutputStream::Stderr,
                line: "100% completed",
            });
            sink(&RunEvent::Exited { code: 0 });
            sink(&RunEvent::TimedOut {
                after: Duration::from_secs(1),
            });
            sink(&RunEvent::KillFailed {
                error: "No such process",
            });
        });

        let text = log.text();
        assert!(text.contains("Process spawned"));
        assert!(text.contains("program=snapraid"));
        assert!(text.contains("pid=Some(42)"));
        assert!(text.contains("stream=stderr"));
        assert!(text.contains("100% completed"));
        assert!(text.contains("Process exited"));
        assert!(text.contains("code=0"));
        assert!(text.contains("Process timed out and was killed"));
        assert!(text.contains("Failed to kill timed out process"));
        assert!(text.contains("No such process"));
    }
}
