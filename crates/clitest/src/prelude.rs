//! Convenient re-exports for common clitest usage.
//!
//! ```no_run
//! use clitest::prelude::*;
//!
//! let mut h = Harness::new();
//! h.run("whoami", &[]).unwrap();
//! h.assert_success();
//! ```

pub use crate::assert::CommandAssertions;
pub use crate::command::{Command, command};
pub use crate::config::{HarnessConfig, MatchConfig};
pub use crate::error::{ExitError, HarnessError, Result};
pub use crate::harness::Harness;
pub use crate::types::{ProcessExitStatus, ProcessState, StreamKind};
