//! A test-owned context that remembers the last command it ran.
//!
//! [`Harness`] is the convenience layer for tests that run one command after
//! another and only care about the most recent one:
//!
//! ```no_run
//! use clitest::Harness;
//!
//! # fn main() -> clitest::Result<()> {
//! let mut h = Harness::new();
//! h.run("cp", &[])?;
//! assert!(h.failed()?);
//! assert!(h.stderr_contains("missing")?);
//! # Ok(())
//! # }
//! ```

use crate::command::Command;
use crate::config::HarnessConfig;
use crate::error::{ExitError, HarnessError, Result};

/// Runs commands synchronously and keeps the most recent one.
#[derive(Debug, Default)]
pub struct Harness {
    config: HarnessConfig,
    last: Option<Command>,
}

impl Harness {
    /// Create a harness with default matcher timings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a harness whose commands use `config`.
    #[must_use]
    pub const fn with_config(config: HarnessConfig) -> Self {
        Self { config, last: None }
    }

    /// Create a harness configured from `CLITEST_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a variable holds an invalid value.
    pub fn from_env() -> Result<Self> {
        Ok(Self::with_config(HarnessConfig::load()?))
    }

    /// The configuration applied to every command.
    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run `program` to completion and remember it as the last command.
    ///
    /// The previous last command, if any, is replaced.
    ///
    /// # Errors
    ///
    /// Returns the error of [`Command::run`]. The command is remembered
    /// either way.
    pub fn run(&mut self, program: &str, args: &[&str]) -> Result<&Command> {
        let mut cmd = Command::new(program, args);
        cmd.match_config(self.config.matching);
        let result = cmd.run();
        let cmd = self.last.insert(cmd);
        result.map(|()| &*cmd)
    }

    /// The most recently run command, if any.
    #[must_use]
    pub const fn last(&self) -> Option<&Command> {
        self.last.as_ref()
    }

    fn require_last(&self) -> Result<&Command> {
        self.last.as_ref().ok_or(HarnessError::NoCommand)
    }

    /// See [`Command::error`].
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::NoCommand`] before the first run.
    pub fn error(&self) -> Result<Option<&ExitError>> {
        self.require_last()?.error()
    }

    /// See [`Command::succeeded`].
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::NoCommand`] before the first run.
    pub fn succeeded(&self) -> Result<bool> {
        self.require_last()?.succeeded()
    }

    /// See [`Command::failed`].
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::NoCommand`] before the first run.
    pub fn failed(&self) -> Result<bool> {
        self.require_last()?.failed()
    }

    /// See [`Command::stdout`].
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::NoCommand`] before the first run.
    pub fn stdout(&self) -> Result<String> {
        self.require_last()?.stdout()
    }

    /// See [`Command::stderr`].
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::NoCommand`] before the first run.
    pub fn stderr(&self) -> Result<String> {
        self.require_last()?.stderr()
    }

    /// See [`Command::stdout_contains`].
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::NoCommand`] before the first run.
    pub fn stdout_contains(&self, text: &str) -> Result<bool> {
        self.require_last()?.stdout_contains(text)
    }

    /// See [`Command::stderr_contains`].
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::NoCommand`] before the first run.
    pub fn stderr_contains(&self, text: &str) -> Result<bool> {
        self.require_last()?.stderr_contains(text)
    }

    /// See [`Command::stdout_matches`].
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::NoCommand`] before the first run, or a regex
    /// error for an invalid pattern.
    pub fn stdout_matches(&self, pattern: &str) -> Result<bool> {
        self.require_last()?.stdout_matches(pattern)
    }

    /// See [`Command::stderr_matches`].
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::NoCommand`] before the first run, or a regex
    /// error for an invalid pattern.
    pub fn stderr_matches(&self, pattern: &str) -> Result<bool> {
        self.require_last()?.stderr_matches(pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;
    use std::time::Duration;

    #[test]
    fn queries_before_run_are_no_command() {
        let h = Harness::new();
        assert!(h.last().is_none());
        assert!(matches!(h.error(), Err(HarnessError::NoCommand)));
        assert!(matches!(h.succeeded(), Err(HarnessError::NoCommand)));
        assert!(matches!(h.failed(), Err(HarnessError::NoCommand)));
        assert!(matches!(h.stdout(), Err(HarnessError::NoCommand)));
        assert!(matches!(h.stderr(), Err(HarnessError::NoCommand)));
        assert!(matches!(h.stdout_contains("x"), Err(HarnessError::NoCommand)));
        assert!(matches!(h.stderr_contains("x"), Err(HarnessError::NoCommand)));
        assert!(matches!(h.stdout_matches("x"), Err(HarnessError::NoCommand)));
        assert!(matches!(h.stderr_matches("x"), Err(HarnessError::NoCommand)));
    }

    #[test]
    fn launch_failure_is_remembered() {
        let mut h = Harness::new();
        let cmd = h.run("clitest-definitely-not-a-program", &["--flag"]).unwrap();
        assert_eq!(cmd.args(), ["--flag"]);

        assert!(h.failed().unwrap());
        assert!(h.error().unwrap().is_some_and(ExitError::is_launch));
        assert_eq!(h.stdout().unwrap(), "");
    }

    #[test]
    fn commands_inherit_harness_timings() {
        let matching = MatchConfig::new(Duration::from_millis(250))
            .poll_interval(Duration::from_millis(5));
        let mut h = Harness::with_config(HarnessConfig::new().matching(matching));
        h.run("clitest-definitely-not-a-program", &[]).unwrap();

        let last = h.last().unwrap();
        assert_eq!(last.matching().timeout, Duration::from_millis(250));
        assert_eq!(last.matching().poll_interval, Duration::from_millis(5));
    }
}
