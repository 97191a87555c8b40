//! Common types for clitest.
//!
//! This module defines the lifecycle state of a command, the stream
//! identifiers and the recorded exit outcome.

use std::fmt;

use crate::error::ExitError;

/// The lifecycle state of a command.
///
/// Transitions are monotonic: `Initialized` moves to `Running` (via
/// `start`) or directly to `Finished` (via `run`), and `Running` moves
/// to `Finished` (via `wait` or `kill`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ProcessState {
    /// Configured but not yet executed.
    #[default]
    Initialized,

    /// Started asynchronously and possibly still executing.
    Running,

    /// Exited, failed to launch, or was killed.
    Finished,
}

impl ProcessState {
    /// Check if the process has at least been started.
    #[must_use]
    pub const fn has_started(self) -> bool {
        matches!(self, Self::Running | Self::Finished)
    }

    /// Check if the process has finished.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Initialized => "initialized",
            Self::Running => "running",
            Self::Finished => "finished",
        };
        f.write_str(s)
    }
}

/// Identifies one of the two captured output streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

impl StreamKind {
    /// Get the stream name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exit status of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessExitStatus {
    /// Process exited with a code.
    Exited(i32),

    /// Process was terminated by a signal (Unix).
    Signaled(i32),

    /// Exit status is unknown.
    Unknown,
}

impl ProcessExitStatus {
    /// Check if the process exited successfully (code 0).
    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self, Self::Exited(0))
    }

    /// Get the exit code if the process exited normally.
    #[must_use]
    pub const fn code(self) -> Option<i32> {
        match self {
            Self::Exited(code) => Some(code),
            _ => None,
        }
    }

    /// Get the signal number if the process was signaled.
    #[must_use]
    pub const fn signal(self) -> Option<i32> {
        match self {
            Self::Signaled(sig) => Some(sig),
            _ => None,
        }
    }
}

impl fmt::Display for ProcessExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exited with code {code}"),
            Self::Signaled(sig) => write!(f, "terminated by signal {sig}"),
            Self::Unknown => write!(f, "unknown exit status"),
        }
    }
}

impl From<std::process::ExitStatus> for ProcessExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(code) = status.code() {
                Self::Exited(code)
            } else if let Some(sig) = status.signal() {
                Self::Signaled(sig)
            } else {
                Self::Unknown
            }
        }

        #[cfg(not(unix))]
        {
            if let Some(code) = status.code() {
                Self::Exited(code)
            } else {
                Self::Unknown
            }
        }
    }
}

/// The recorded result of a finished command.
#[derive(Debug)]
pub enum ExitOutcome {
    /// The process ran and exited with code 0.
    Success,

    /// The process failed to launch or exited unsuccessfully.
    Failure(ExitError),
}

impl ExitOutcome {
    /// Build an outcome from an exit status.
    #[must_use]
    pub const fn from_status(status: ProcessExitStatus) -> Self {
        if status.success() {
            Self::Success
        } else {
            Self::Failure(ExitError::Exited(status))
        }
    }

    /// Check if the outcome is a success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Get the failure cause, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&ExitError> {
        match self {
            Self::Success => None,
            Self::Failure(err) => Some(err),
        }
    }

    /// Get the exit status, or `None` if the process never launched.
    #[must_use]
    pub const fn exit_status(&self) -> Option<ProcessExitStatus> {
        match self {
            Self::Success => Some(ProcessExitStatus::Exited(0)),
            Self::Failure(err) => err.exit_status(),
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Failure(err) => write!(f, "failure ({err})"),
        }
    }
}
