//! Configuration types for clitest.
//!
//! The only tunables are the timings of the eventual matcher and of the
//! drain step in [`Command::wait`](crate::Command::wait). They can come from
//! defaults, a TOML file ([`file`]) or `CLITEST_*` environment variables
//! ([`env`]), in increasing order of precedence.

pub mod env;
pub mod file;

use std::path::Path;
use std::time::Duration;

use crate::error::{HarnessError, Result};

/// Default interval between two evaluations of a predicate (100 ms).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default overall deadline of an eventual match (1 second).
pub const DEFAULT_MATCH_TIMEOUT: Duration = Duration::from_secs(1);

/// Default time `wait()` lets the stream pumps drain after exit (1 second).
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Timing configuration for eventual matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchConfig {
    /// Maximum time between two evaluations of the predicate.
    pub poll_interval: Duration,

    /// Overall deadline after which a match attempt reports `false`.
    pub timeout: Duration,

    /// How long `wait()` lets the pumps flush remaining output.
    pub drain_timeout: Duration,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_MATCH_TIMEOUT,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }
}

impl MatchConfig {
    /// Create a match configuration with the given overall deadline.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Default::default()
        }
    }

    /// Set the poll interval.
    #[must_use]
    pub const fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the overall deadline.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the drain timeout.
    #[must_use]
    pub const fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Check the configuration for values the matcher cannot work with.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a zero poll interval or timeout.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(HarnessError::config("poll interval must be greater than zero"));
        }
        if self.timeout.is_zero() {
            return Err(HarnessError::config("match timeout must be greater than zero"));
        }
        Ok(())
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HarnessConfig {
    /// Eventual matcher timings.
    pub matching: MatchConfig,
}

impl HarnessConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the match configuration.
    #[must_use]
    pub const fn matching(mut self, matching: MatchConfig) -> Self {
        self.matching = matching;
        self
    }

    /// Defaults overridden by `CLITEST_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the result fails validation.
    pub fn load() -> Result<Self> {
        let config = Self::default().merge_env(&env::EnvConfig::default());
        config.matching.validate()?;
        Ok(config)
    }

    /// Parse a TOML document, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for malformed TOML, unknown keys or
    /// invalid values.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config = file::parse_toml(content)?.merge_env(&env::EnvConfig::default());
        config.matching.validate()?;
        Ok(config)
    }

    /// Load a TOML file, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, otherwise the same
    /// errors as [`from_toml_str`](Self::from_toml_str).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = HarnessError::with_io_context(
            std::fs::read_to_string(path),
            format!("reading config file {}", path.display()),
        )?;
        Self::from_toml_str(&content)
    }

    /// Apply overrides found in the given environment reader.
    #[must_use]
    pub fn merge_env(mut self, env: &env::EnvConfig) -> Self {
        if let Some(interval) = env.duration_millis(env::vars::POLL_INTERVAL_MS) {
            self.matching.poll_interval = interval;
        }
        if let Some(timeout) = env.duration_millis(env::vars::TIMEOUT_MS) {
            self.matching.timeout = timeout;
        }
        if let Some(drain) = env.duration_millis(env::vars::DRAIN_TIMEOUT_MS) {
            self.matching.drain_timeout = drain;
        }
        self
    }
}
