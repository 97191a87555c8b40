//! Error types for clitest.
//!
//! Two families live here. [`HarnessError`] is returned when the harness
//! itself is misused or the environment fails underneath it. [`ExitError`]
//! is not an API fault at all: it is the recorded cause of a process that
//! could not be launched or that exited unsuccessfully, and it is queried
//! through [`Command::error`](crate::Command::error) like any other result.

use std::sync::Arc;

use thiserror::Error;

use crate::types::{ProcessExitStatus, ProcessState, StreamKind};

/// Maximum length of buffer content to display in error messages.
const MAX_BUFFER_DISPLAY: usize = 500;

/// Context lines to show before/after truncation point.
const CONTEXT_LINES: usize = 3;

/// Format buffer content for display, truncating if necessary.
pub(crate) fn format_buffer_snippet(buffer: &str) -> String {
    if buffer.is_empty() {
        return "(empty buffer)".to_string();
    }

    let buffer_len = buffer.len();

    if buffer_len <= MAX_BUFFER_DISPLAY {
        return format!(
            "┌─ buffer ({} bytes) ──────────────────────\n│ {}\n└────────────────────────────────────────",
            buffer_len,
            buffer.lines().collect::<Vec<_>>().join("\n│ ")
        );
    }

    let lines: Vec<&str> = buffer.lines().collect();
    let total_lines = lines.len();

    if total_lines <= CONTEXT_LINES * 2 {
        return format!(
            "┌─ buffer ({} bytes, {} lines) ─────────────\n│ {}\n└────────────────────────────────────────",
            buffer_len,
            total_lines,
            lines.join("\n│ ")
        );
    }

    // Show last N lines with truncation indicator
    let tail_lines = &lines[lines.len().saturating_sub(CONTEXT_LINES * 2)..];
    let hidden = total_lines - tail_lines.len();

    format!(
        "┌─ buffer ({} bytes, {} lines) ─────────────\n│ ... ({} lines hidden)\n│ {}\n└────────────────────────────────────────",
        buffer_len,
        total_lines,
        hidden,
        tail_lines.join("\n│ ")
    )
}

/// The main error type for clitest operations.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// An operation was called at the wrong point of the command lifecycle.
    ///
    /// This always indicates a bug in the calling test.
    #[error("cannot call {operation}() while the command is {state}: {requirement}")]
    Usage {
        /// The operation that was attempted.
        operation: &'static str,
        /// The state the command was in.
        state: ProcessState,
        /// What the caller has to do first.
        requirement: &'static str,
    },

    /// A harness query was made before any command was run through it.
    #[error("no command has been run through this harness yet")]
    NoCommand,

    /// A stream pump failed to read from the child's pipe.
    #[error("failed to read {stream} of the child process: {source}")]
    StreamRead {
        /// The stream that failed.
        stream: StreamKind,
        /// The underlying read error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// An I/O error occurred with additional context.
    #[error("{context}: {source}")]
    IoWithContext {
        /// What operation was being performed.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Invalid regex pattern.
    #[error("invalid regex pattern: {0}")]
    Regex(#[from] regex::Error),

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },
}

/// Result type alias for clitest operations.
pub type Result<T> = std::result::Result<T, HarnessError>;

impl HarnessError {
    /// Create a usage error.
    #[must_use]
    pub const fn usage(
        operation: &'static str,
        state: ProcessState,
        requirement: &'static str,
    ) -> Self {
        Self::Usage {
            operation,
            state,
            requirement,
        }
    }

    /// Create a stream read error.
    #[must_use]
    pub const fn stream_read(stream: StreamKind, source: Arc<std::io::Error>) -> Self {
        Self::StreamRead { stream, source }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an I/O error with context.
    pub fn io_context(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::IoWithContext {
            context: context.into(),
            source,
        }
    }

    /// Wrap an I/O result with context.
    pub fn with_io_context<T>(result: std::io::Result<T>, context: impl Into<String>) -> Result<T> {
        result.map_err(|e| Self::io_context(context, e))
    }

    /// Check if this is a lifecycle usage error.
    #[must_use]
    pub const fn is_usage(&self) -> bool {
        matches!(self, Self::Usage { .. } | Self::NoCommand)
    }

    /// Check if this is a stream read error.
    #[must_use]
    pub const fn is_stream_read(&self) -> bool {
        matches!(self, Self::StreamRead { .. })
    }
}

/// Why a finished process did not succeed.
///
/// Stored as the command's exit outcome; never returned as an `Err`.
#[derive(Debug, Error)]
pub enum ExitError {
    /// The process could not be created at all.
    #[error("failed to launch {program}: {source}")]
    Launch {
        /// The program that was being launched.
        program: String,
        /// The spawn error reported by the OS.
        #[source]
        source: std::io::Error,
    },

    /// The process ran and exited unsuccessfully.
    #[error("{0}")]
    Exited(ProcessExitStatus),
}

impl ExitError {
    /// Create a launch error.
    pub fn launch(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Launch {
            program: program.into(),
            source,
        }
    }

    /// Check if the process failed to launch.
    #[must_use]
    pub const fn is_launch(&self) -> bool {
        matches!(self, Self::Launch { .. })
    }

    /// Get the exit status if the process actually ran.
    #[must_use]
    pub const fn exit_status(&self) -> Option<ProcessExitStatus> {
        match self {
            Self::Exited(status) => Some(*status),
            Self::Launch { .. } => None,
        }
    }

    /// Get the exit code if the process exited normally.
    #[must_use]
    pub const fn code(&self) -> Option<i32> {
        match self {
            Self::Exited(status) => status.code(),
            Self::Launch { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_error_display() {
        let err = HarnessError::usage("stdout", ProcessState::Initialized, "run or start it first");
        let msg = err.to_string();
        assert!(msg.contains("stdout()"));
        assert!(msg.contains("initialized"));
        assert!(msg.contains("run or start it first"));
        assert!(err.is_usage());
    }

    #[test]
    fn no_command_is_usage() {
        assert!(HarnessError::NoCommand.is_usage());
        assert!(!HarnessError::config("bad").is_usage());
    }

    #[test]
    fn stream_read_display() {
        let source = Arc::new(std::io::Error::other("pipe broke"));
        let err = HarnessError::stream_read(StreamKind::Stderr, source);
        assert!(err.is_stream_read());
        let msg = err.to_string();
        assert!(msg.contains("stderr"));
        assert!(msg.contains("pipe broke"));
    }

    #[test]
    fn launch_error_display() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory");
        let err = ExitError::launch("myunknowncommand", source);
        assert!(err.is_launch());
        assert!(err.exit_status().is_none());
        assert!(err.to_string().contains("myunknowncommand"));
    }

    #[test]
    fn exited_error_display() {
        let err = ExitError::Exited(ProcessExitStatus::Exited(2));
        assert!(!err.is_launch());
        assert_eq!(err.code(), Some(2));
        assert_eq!(err.to_string(), "exited with code 2");
    }

    #[test]
    fn format_buffer_snippet_empty() {
        assert_eq!(format_buffer_snippet(""), "(empty buffer)");
    }

    #[test]
    fn format_buffer_snippet_small() {
        let result = format_buffer_snippet("hello\nworld");
        assert!(result.contains("hello"));
        assert!(result.contains("world"));
        assert!(result.contains("bytes"));
    }

    #[test]
    fn format_buffer_snippet_large_truncates() {
        let large_buffer: String = (0..50).fold(String::new(), |mut acc, i| {
            use std::fmt::Write;
            let _ = writeln!(acc, "Line {i}: Some content here");
            acc
        });

        let msg = format_buffer_snippet(&large_buffer);
        assert!(msg.contains("lines hidden"));
        assert!(msg.contains("Line 49"));
        assert!(!msg.contains("Line 0:"));
    }

    #[test]
    fn with_io_context_helper() {
        let result: std::io::Result<()> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "access denied",
        ));
        let err = HarnessError::with_io_context(result, "building runtime").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("building runtime"));
        assert!(msg.contains("access denied"));
    }
}
