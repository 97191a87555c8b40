//! Panicking assertion helpers for tests.
//!
//! Every query on [`Command`] returns a `Result` so misuse can be handled.
//! In a test that is usually noise: these helpers unwrap the query, assert on
//! the answer and, on failure, panic with the command's state, outcome and
//! the tail of the relevant output.
//!
//! ```no_run
//! use clitest::Command;
//! use clitest::assert::CommandAssertions;
//!
//! let mut cmd = Command::new("sh", &["-c", "echo hello"]);
//! cmd.run().unwrap();
//! cmd.assert_success();
//! cmd.assert_stdout_eq("hello\n");
//! ```

use std::fmt::Write;

use crate::command::Command;
use crate::error::{HarnessError, format_buffer_snippet};
use crate::harness::Harness;
use crate::types::StreamKind;

/// Assertion helpers over a finished or running command.
pub trait CommandAssertions {
    /// The command being asserted on.
    fn subject(&self) -> &Command;

    /// Assert that the command exited with code 0.
    #[track_caller]
    fn assert_success(&self) {
        let cmd = self.subject();
        if !check(cmd.succeeded()) {
            panic!(
                "expected {} to succeed\n{}",
                cmd.program(),
                describe(cmd, StreamKind::Stderr),
            );
        }
    }

    /// Assert that the command failed to launch or exited unsuccessfully.
    #[track_caller]
    fn assert_failure(&self) {
        let cmd = self.subject();
        if !check(cmd.failed()) {
            panic!(
                "expected {} to fail\n{}",
                cmd.program(),
                describe(cmd, StreamKind::Stdout),
            );
        }
    }

    /// Assert that stdout contains `text`, ignoring case, within the
    /// command's match deadline.
    #[track_caller]
    fn assert_stdout_contains(&self, text: &str) {
        let cmd = self.subject();
        if !check(cmd.stdout_contains(text)) {
            panic!(
                "expected stdout to contain {text:?}\n{}",
                describe(cmd, StreamKind::Stdout),
            );
        }
    }

    /// Assert that stderr contains `text`, ignoring case, within the
    /// command's match deadline.
    #[track_caller]
    fn assert_stderr_contains(&self, text: &str) {
        let cmd = self.subject();
        if !check(cmd.stderr_contains(text)) {
            panic!(
                "expected stderr to contain {text:?}\n{}",
                describe(cmd, StreamKind::Stderr),
            );
        }
    }

    /// Assert that stdout matches `pattern`, ignoring case, within the
    /// command's match deadline.
    #[track_caller]
    fn assert_stdout_matches(&self, pattern: &str) {
        let cmd = self.subject();
        if !check(cmd.stdout_matches(pattern)) {
            panic!(
                "expected stdout to match {pattern:?}\n{}",
                describe(cmd, StreamKind::Stdout),
            );
        }
    }

    /// Assert that stderr matches `pattern`, ignoring case, within the
    /// command's match deadline.
    #[track_caller]
    fn assert_stderr_matches(&self, pattern: &str) {
        let cmd = self.subject();
        if !check(cmd.stderr_matches(pattern)) {
            panic!(
                "expected stderr to match {pattern:?}\n{}",
                describe(cmd, StreamKind::Stderr),
            );
        }
    }

    /// Assert that the captured stdout equals `expected` exactly.
    #[track_caller]
    fn assert_stdout_eq(&self, expected: &str) {
        let cmd = self.subject();
        let actual = check(cmd.stdout());
        assert_eq!(actual, expected, "unexpected stdout of {}", cmd.program());
    }
}

impl CommandAssertions for Command {
    fn subject(&self) -> &Command {
        self
    }
}

impl CommandAssertions for Harness {
    #[track_caller]
    fn subject(&self) -> &Command {
        match self.last() {
            Some(cmd) => cmd,
            None => panic!("{}", HarnessError::NoCommand),
        }
    }
}

#[track_caller]
fn check<T>(result: crate::Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => panic!("{e}"),
    }
}

/// Summarize a command for a failure message.
fn describe(cmd: &Command, stream: StreamKind) -> String {
    let mut out = format!(
        "  command: {} {}\n  state:   {}\n",
        cmd.program(),
        cmd.args().join(" "),
        cmd.state()
    );
    match cmd.error() {
        Ok(None) => out.push_str("  outcome: success\n"),
        Ok(Some(err)) => {
            let _ = writeln!(out, "  outcome: {err}");
        }
        Err(_) => {}
    }
    let output = match stream {
        StreamKind::Stdout => cmd.stdout(),
        StreamKind::Stderr => cmd.stderr(),
    };
    match output {
        Ok(text) => {
            let _ = write!(out, "{stream}:\n{}", format_buffer_snippet(&text));
        }
        Err(e) => {
            let _ = write!(out, "{stream}: {e}");
        }
    }
    out
}
