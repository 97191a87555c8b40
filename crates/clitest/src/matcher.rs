//! Eventual matching against output that may still be arriving.
//!
//! An [`EventualMatcher`] re-evaluates a [`Predicate`] against an
//! [`OutputBuffer`] until it holds or a deadline passes. The first
//! evaluation happens immediately. Between evaluations the matcher sleeps
//! on the buffer's condition variable for at most one poll interval, so a
//! new append wakes it early. Once the buffer is sealed its content can no
//! longer change and a single evaluation decides the answer.

use std::fmt;
use std::time::{Duration, Instant};

use regex::{Regex, RegexBuilder};

use crate::config::MatchConfig;
use crate::error::Result;
use crate::output::OutputBuffer;

/// Floor for the poll interval so a zero interval cannot busy-spin.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// A test applied to the text of an output buffer.
///
/// Both kinds are case-insensitive.
#[derive(Clone)]
pub enum Predicate {
    /// Substring containment. Holds the lowercased needle.
    Contains(String),

    /// Regular expression search, compiled case-insensitively.
    Regex(Regex),
}

impl Predicate {
    /// Create a case-insensitive substring predicate.
    #[must_use]
    pub fn contains(text: &str) -> Self {
        Self::Contains(text.to_lowercase())
    }

    /// Create a case-insensitive regex predicate.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is not a valid regex.
    pub fn regex(pattern: &str) -> Result<Self> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self::Regex(regex))
    }

    /// Evaluate the predicate once against `text`.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Contains(needle) => text.to_lowercase().contains(needle.as_str()),
            Self::Regex(regex) => regex.is_match(text),
        }
    }

    /// Get the needle or pattern for display purposes.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Contains(needle) => needle,
            Self::Regex(regex) => regex.as_str(),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contains(s) => write!(f, "Contains({s:?})"),
            Self::Regex(r) => write!(f, "Regex({:?})", r.as_str()),
        }
    }
}

/// Bounded polling evaluation of a predicate.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventualMatcher {
    config: MatchConfig,
}

impl EventualMatcher {
    /// Create a matcher with the given timings.
    #[must_use]
    pub const fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    /// Get the matcher configuration.
    #[must_use]
    pub const fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Check whether the predicate holds now or before the configured
    /// deadline.
    #[must_use]
    pub fn matches(&self, buffer: &OutputBuffer, predicate: &Predicate) -> bool {
        self.matches_within(buffer, predicate, self.config.timeout)
    }

    /// Check whether the predicate holds now or before `timeout` elapses.
    ///
    /// Never errors and never blocks much longer than `timeout`.
    #[must_use]
    pub fn matches_within(
        &self,
        buffer: &OutputBuffer,
        predicate: &Predicate,
        timeout: Duration,
    ) -> bool {
        let start = Instant::now();
        // `None` when the deadline is past what `Instant` can represent.
        let deadline = start.checked_add(timeout);
        let interval = self.config.poll_interval.max(MIN_POLL_INTERVAL);
        let mut polls: u32 = 0;

        loop {
            polls = polls.saturating_add(1);
            let observation = buffer.observe(|text| predicate.is_match(text));

            if observation.matched {
                tracing::trace!(?predicate, polls, elapsed = ?start.elapsed(), "predicate matched");
                return true;
            }
            if observation.sealed {
                tracing::trace!(?predicate, "buffer sealed without a match");
                return false;
            }

            let wait = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        tracing::trace!(?predicate, polls, "match deadline elapsed");
                        return false;
                    }
                    interval.min(deadline - now)
                }
                None => interval,
            };
            buffer.wait_for_append(observation.generation, wait);
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn contains_ignores_case(prefix in "[a-z ]{0,16}", needle in "[a-zA-Z]{1,12}", suffix in "[a-z ]{0,16}") {
            let text = format!("{prefix}{}{suffix}", needle.to_lowercase());
            prop_assert!(Predicate::contains(&needle.to_uppercase()).is_match(&text));
            prop_assert!(Predicate::contains(&needle).is_match(&text.to_uppercase()));
        }

        #[test]
        fn literal_regex_agrees_with_contains(text in "[a-zA-Z0-9 ]{0,40}", needle in "[a-zA-Z0-9]{1,6}") {
            let by_regex = Predicate::regex(&regex::escape(&needle)).unwrap().is_match(&text);
            let by_contains = Predicate::contains(&needle).is_match(&text);
            prop_assert_eq!(by_regex, by_contains);
        }
    }
}
