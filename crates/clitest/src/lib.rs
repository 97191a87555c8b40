//! clitest: drive and inspect external processes from tests
//!
//! This crate starts command-line programs from automated tests, captures
//! their stdout and stderr while they run, and answers questions about that
//! output with a bounded wait.
//!
//! # Features
//!
//! - **Blocking API** with a private tokio runtime per command
//! - **Background capture**: stream pumps fill output buffers while the
//!   test keeps going
//! - **Eventual matching**: case-insensitive substring and regex checks that
//!   poll until the output shows up or a deadline passes
//! - **Harness** context remembering the last command it ran
//! - **Assertion helpers** with output snippets in failure messages
//!
//! # Example
//!
//! ```no_run
//! use clitest::prelude::*;
//!
//! # fn main() -> clitest::Result<()> {
//! let mut cmd = Command::new("sh", &["-c", "echo -n $FOO"]);
//! cmd.env([("FOO", "bar")]);
//! cmd.run()?;
//! assert!(cmd.succeeded()?);
//! assert_eq!(cmd.stdout()?, "bar");
//!
//! let mut server = command("sh", &["-c", "echo Started; sleep 30"]);
//! server.start()?;
//! server.assert_stdout_contains("started");
//! server.kill()?;
//! # Ok(())
//! # }
//! ```

pub mod assert;
pub mod command;
pub mod config;
pub mod error;
pub mod harness;
pub mod matcher;
pub mod output;
pub mod prelude;
pub mod types;

mod pump;

pub use command::{Command, InputSource, command};
pub use config::{HarnessConfig, MatchConfig};
pub use error::{ExitError, HarnessError, Result};
pub use harness::Harness;
pub use matcher::{EventualMatcher, Predicate};
pub use output::OutputBuffer;
pub use types::{ExitOutcome, ProcessExitStatus, ProcessState, StreamKind};
