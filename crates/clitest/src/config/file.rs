//! File-based configuration loading.
//!
//! ```toml
//! [matching]
//! poll_interval_ms = 50
//! timeout_ms = 2000
//! drain_timeout_ms = 500
//! ```

use std::time::Duration;

use serde::Deserialize;

use super::{HarnessConfig, MatchConfig};
use crate::error::{HarnessError, Result};

/// On-disk shape of the configuration file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    matching: MatchingSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct MatchingSection {
    poll_interval_ms: Option<u64>,
    timeout_ms: Option<u64>,
    drain_timeout_ms: Option<u64>,
}

impl MatchingSection {
    fn apply(&self, mut config: MatchConfig) -> MatchConfig {
        if let Some(ms) = self.poll_interval_ms {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.timeout_ms {
            config.timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.drain_timeout_ms {
            config.drain_timeout = Duration::from_millis(ms);
        }
        config
    }
}

/// Parse a TOML document on top of the default configuration.
///
/// # Errors
///
/// Returns a configuration error for malformed TOML or unknown keys.
pub fn parse_toml(content: &str) -> Result<HarnessConfig> {
    let file: ConfigFile =
        toml::from_str(content).map_err(|e| HarnessError::config(e.to_string()))?;

    Ok(HarnessConfig {
        matching: file.matching.apply(MatchConfig::default()),
    })
}
