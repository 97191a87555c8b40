//! The command handle: one external process and everything it produced.
//!
//! A [`Command`] is configured, then either [`run`](Command::run) to
//! completion or [`start`](Command::start)ed in the background. In the
//! background case two stream pumps copy stdout and stderr into their
//! [`OutputBuffer`]s while the caller keeps going, and the `*_contains` /
//! `*_matches` queries wait a bounded time for output that has not arrived
//! yet.
//!
//! # Example
//!
//! ```no_run
//! use clitest::Command;
//!
//! # fn main() -> clitest::Result<()> {
//! let mut cmd = Command::new("sh", &["-c", "echo Started; sleep 10"]);
//! cmd.start()?;
//! assert!(cmd.stdout_contains("started")?);
//! cmd.kill()?;
//! assert!(cmd.failed()?);
//! # Ok(())
//! # }
//! ```
//!
//! The API blocks the calling thread. Each command owns a small tokio
//! runtime for its pumps, so it must not be driven from inside another
//! async runtime.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin};
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::MatchConfig;
use crate::error::{ExitError, HarnessError, Result};
use crate::matcher::{EventualMatcher, Predicate};
use crate::output::OutputBuffer;
use crate::pump::StreamPump;
use crate::types::{ExitOutcome, ProcessExitStatus, ProcessState, StreamKind};

/// Worker threads of each command's runtime: one per stream pump.
const RUNTIME_WORKERS: usize = 2;

/// Chunk size used when streaming a reader into the child's stdin.
const STDIN_CHUNK: usize = 8 * 1024;

/// Data supplied to the child's standard input.
pub enum InputSource {
    /// A fixed byte string.
    Bytes(Vec<u8>),
    /// A reader streamed into the child until it reports end of data.
    Reader(Box<dyn Read + Send>),
}

impl fmt::Debug for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            Self::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

impl From<Vec<u8>> for InputSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&str> for InputSource {
    fn from(s: &str) -> Self {
        Self::Bytes(s.as_bytes().to_vec())
    }
}

impl From<String> for InputSource {
    fn from(s: String) -> Self {
        Self::Bytes(s.into_bytes())
    }
}

/// What a started process owns until it finishes.
struct Running {
    child: Child,
    pumps: Vec<StreamPump>,
    feeder: Option<JoinHandle<()>>,
}

impl Running {
    fn abort_feeder(&self) {
        if let Some(feeder) = &self.feeder {
            feeder.abort();
        }
    }
}

/// Lifecycle of the process, carrying what each stage owns.
enum Lifecycle {
    Initialized,
    Running(Running),
    Finished(ExitOutcome),
}

impl Lifecycle {
    const fn state(&self) -> ProcessState {
        match self {
            Self::Initialized => ProcessState::Initialized,
            Self::Running(_) => ProcessState::Running,
            Self::Finished(_) => ProcessState::Finished,
        }
    }
}

/// A handle to one external process.
pub struct Command {
    program: String,
    args: Vec<String>,
    env: Option<HashMap<String, String>>,
    working_dir: Option<PathBuf>,
    stdin: Option<InputSource>,
    match_config: MatchConfig,
    lifecycle: Lifecycle,
    pid: Option<u32>,
    stdout: OutputBuffer,
    stderr: OutputBuffer,
    runtime: Option<Runtime>,
}

/// Create a command for `program` with `args`.
#[must_use]
pub fn command(program: &str, args: &[&str]) -> Command {
    Command::new(program, args)
}

impl Command {
    /// Create a command for `program` with `args`.
    #[must_use]
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|&a| a.to_string()).collect(),
            env: None,
            working_dir: None,
            stdin: None,
            match_config: MatchConfig::default(),
            lifecycle: Lifecycle::Initialized,
            pid: None,
            stdout: OutputBuffer::new(),
            stderr: OutputBuffer::new(),
            runtime: None,
        }
    }

    // ----- configuration -------------------------------------------------

    /// Returns `true` if configuration may still change.
    fn configurable(&self, what: &str) -> bool {
        if matches!(self.lifecycle, Lifecycle::Initialized) {
            true
        } else {
            tracing::warn!(
                program = %self.program,
                state = %self.state(),
                "ignoring {what} change after the command was executed"
            );
            false
        }
    }

    /// Replace the child's whole environment with `vars`.
    ///
    /// Without this call the child inherits the caller's environment.
    pub fn env<I, K, V>(&mut self, vars: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        if self.configurable("environment") {
            self.env = Some(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            );
        }
        self
    }

    /// Add one variable to the replacement environment.
    ///
    /// The first call switches the command from inheriting the caller's
    /// environment to an explicit one.
    pub fn env_var(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        if self.configurable("environment") {
            self.env
                .get_or_insert_with(HashMap::new)
                .insert(key.into(), value.into());
        }
        self
    }

    /// Stream `reader` into the child's standard input.
    pub fn stdin<R>(&mut self, reader: R) -> &mut Self
    where
        R: Read + Send + 'static,
    {
        if self.configurable("stdin") {
            self.stdin = Some(InputSource::Reader(Box::new(reader)));
        }
        self
    }

    /// Feed fixed bytes to the child's standard input.
    pub fn stdin_bytes(&mut self, input: impl Into<InputSource>) -> &mut Self {
        if self.configurable("stdin") {
            self.stdin = Some(input.into());
        }
        self
    }

    /// Set the working directory of the child.
    pub fn current_dir(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        if self.configurable("working directory") {
            self.working_dir = Some(path.into());
        }
        self
    }

    /// Set the eventual matcher timings used by the `*_contains` and
    /// `*_matches` queries and the drain step of [`wait`](Self::wait).
    ///
    /// Unlike the process configuration this may change at any time. A
    /// configuration that fails [`MatchConfig::validate`] is ignored with a
    /// warning.
    pub fn match_config(&mut self, config: MatchConfig) -> &mut Self {
        match config.validate() {
            Ok(()) => self.match_config = config,
            Err(e) => tracing::warn!(program = %self.program, error = %e, "ignoring match config"),
        }
        self
    }

    // ----- accessors -----------------------------------------------------

    /// The program being executed.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The arguments passed to the program.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ProcessState {
        self.lifecycle.state()
    }

    /// The child's process ID, once it has been launched.
    #[must_use]
    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// The matcher timings in effect.
    #[must_use]
    pub const fn matching(&self) -> &MatchConfig {
        &self.match_config
    }

    // ----- execution -----------------------------------------------------

    /// Run the process to completion, capturing all of its output.
    ///
    /// A nonzero exit or a failure to launch is recorded as the command's
    /// outcome, not returned as an error.
    ///
    /// # Errors
    ///
    /// Returns a usage error if the command was already executed, or an
    /// I/O error if the runtime could not be built or the output could
    /// not be collected.
    pub fn run(&mut self) -> Result<()> {
        self.require_initialized("run")?;
        let handle = self.runtime_handle()?;

        let mut child = match self.spawn_child(&handle) {
            Ok(child) => child,
            Err(e) => {
                self.record_launch_failure(e);
                return Ok(());
            }
        };
        let feeder = self.start_feeder(&handle, &mut child);

        let collected = handle.block_on(child.wait_with_output());
        if let Some(feeder) = feeder {
            feeder.abort();
        }

        let status = collected.map(|output| {
            self.stdout.append_bytes(&output.stdout);
            self.stderr.append_bytes(&output.stderr);
            output.status
        });
        self.settle(status, "collecting output of")
    }

    /// Launch the process and return immediately.
    ///
    /// Output is captured in the background. A failure to launch moves the
    /// command straight to `Finished` with a launch error as its outcome.
    ///
    /// # Errors
    ///
    /// Returns a usage error if the command was already executed, or an
    /// I/O error if the runtime could not be built.
    pub fn start(&mut self) -> Result<()> {
        self.require_initialized("start")?;
        let handle = self.runtime_handle()?;

        let mut child = match self.spawn_child(&handle) {
            Ok(child) => child,
            Err(e) => {
                self.record_launch_failure(e);
                return Ok(());
            }
        };

        let mut pumps = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            pumps.push(StreamPump::spawn(
                &handle,
                StreamKind::Stdout,
                stdout,
                self.stdout.clone(),
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            pumps.push(StreamPump::spawn(
                &handle,
                StreamKind::Stderr,
                stderr,
                self.stderr.clone(),
            ));
        }
        let feeder = self.start_feeder(&handle, &mut child);

        self.lifecycle = Lifecycle::Running(Running {
            child,
            pumps,
            feeder,
        });
        Ok(())
    }

    /// Block until a started process exits.
    ///
    /// After the exit the pumps get up to the configured drain timeout to
    /// flush what the child wrote last. Calling this on a finished command
    /// does nothing.
    ///
    /// # Errors
    ///
    /// Returns a usage error before [`start`](Self::start), a stream read
    /// error if a pump failed, or an I/O error if waiting failed.
    pub fn wait(&mut self) -> Result<()> {
        let Some(running) = self.take_running("wait")? else {
            return Ok(());
        };
        let handle = self.runtime_handle()?;
        let Running {
            mut child,
            pumps,
            feeder,
        } = running;

        let drain_timeout = self.match_config.drain_timeout;
        let waited = handle.block_on(async move {
            let status = child.wait().await;
            let started = Instant::now();
            for pump in pumps {
                let stream = pump.stream();
                let remaining = drain_timeout.saturating_sub(started.elapsed());
                if !pump.drain(remaining).await {
                    tracing::debug!(%stream, "output may be incomplete");
                }
            }
            status
        });
        if let Some(feeder) = feeder {
            feeder.abort();
        }

        self.settle(waited, "waiting for")?;
        self.check_stream(StreamKind::Stdout)?;
        self.check_stream(StreamKind::Stderr)?;
        Ok(())
    }

    /// Forcibly terminate a started process.
    ///
    /// The pumps are not drained: output the child wrote just before dying
    /// may be missing, so captured output is a prefix of what the process
    /// produced. Calling this on a finished command does nothing.
    ///
    /// # Errors
    ///
    /// Returns a usage error before [`start`](Self::start), or an I/O error
    /// if the killed process could not be reaped.
    pub fn kill(&mut self) -> Result<()> {
        let Some(mut running) = self.take_running("kill")? else {
            return Ok(());
        };
        let handle = self.runtime_handle()?;

        tracing::debug!(program = %self.program, pid = ?self.pid, "killing process");
        if let Err(e) = running.child.start_kill() {
            // Already exited on its own; reaping below still works.
            tracing::debug!(program = %self.program, error = %e, "kill request failed");
        }
        let waited = handle.block_on(running.child.wait());

        for pump in &running.pumps {
            pump.abort();
        }
        running.abort_feeder();
        self.settle(waited, "reaping killed process")
    }

    // ----- outcome queries -----------------------------------------------

    /// The reason the process did not succeed, if it did not.
    ///
    /// # Errors
    ///
    /// Returns a usage error unless the command has finished.
    pub fn error(&self) -> Result<Option<&ExitError>> {
        Ok(self.outcome("error")?.error())
    }

    /// Whether the process exited with code 0.
    ///
    /// # Errors
    ///
    /// Returns a usage error unless the command has finished.
    pub fn succeeded(&self) -> Result<bool> {
        Ok(self.outcome("succeeded")?.is_success())
    }

    /// Whether the process failed to launch or exited unsuccessfully.
    ///
    /// # Errors
    ///
    /// Returns a usage error unless the command has finished.
    pub fn failed(&self) -> Result<bool> {
        Ok(!self.outcome("failed")?.is_success())
    }

    /// The exit status, or `None` if the process never launched.
    ///
    /// # Errors
    ///
    /// Returns a usage error unless the command has finished.
    pub fn exit_status(&self) -> Result<Option<ProcessExitStatus>> {
        Ok(self.outcome("exit_status")?.exit_status())
    }

    // ----- output queries ------------------------------------------------

    /// Snapshot of everything captured from stdout so far.
    ///
    /// # Errors
    ///
    /// Returns a usage error before the command was run or started, or a
    /// stream read error if the stdout pump failed.
    pub fn stdout(&self) -> Result<String> {
        self.require_started("stdout")?;
        Ok(self.check_stream(StreamKind::Stdout)?.snapshot())
    }

    /// Snapshot of everything captured from stderr so far.
    ///
    /// # Errors
    ///
    /// Returns a usage error before the command was run or started, or a
    /// stream read error if the stderr pump failed.
    pub fn stderr(&self) -> Result<String> {
        self.require_started("stderr")?;
        Ok(self.check_stream(StreamKind::Stderr)?.snapshot())
    }

    /// Whether stdout contains `text`, ignoring case, now or before the
    /// configured deadline.
    ///
    /// # Errors
    ///
    /// Returns a usage error before the command was run or started, or a
    /// stream read error if the stdout pump failed.
    pub fn stdout_contains(&self, text: &str) -> Result<bool> {
        self.stdout_contains_within(text, self.match_config.timeout)
    }

    /// Whether stderr contains `text`, ignoring case, now or before the
    /// configured deadline.
    ///
    /// # Errors
    ///
    /// Returns a usage error before the command was run or started, or a
    /// stream read error if the stderr pump failed.
    pub fn stderr_contains(&self, text: &str) -> Result<bool> {
        self.stderr_contains_within(text, self.match_config.timeout)
    }

    /// Whether the regex `pattern` finds a match in stdout, ignoring case,
    /// now or before the configured deadline.
    ///
    /// # Errors
    ///
    /// Returns a usage error before the command was run or started, a regex
    /// error for an invalid pattern, or a stream read error.
    pub fn stdout_matches(&self, pattern: &str) -> Result<bool> {
        self.stdout_matches_within(pattern, self.match_config.timeout)
    }

    /// Whether the regex `pattern` finds a match in stderr, ignoring case,
    /// now or before the configured deadline.
    ///
    /// # Errors
    ///
    /// Same as [`stdout_matches`](Self::stdout_matches).
    pub fn stderr_matches(&self, pattern: &str) -> Result<bool> {
        self.stderr_matches_within(pattern, self.match_config.timeout)
    }

    /// [`stdout_contains`](Self::stdout_contains) with an explicit deadline.
    ///
    /// # Errors
    ///
    /// Same as [`stdout_contains`](Self::stdout_contains).
    pub fn stdout_contains_within(&self, text: &str, timeout: Duration) -> Result<bool> {
        self.eventually(
            "stdout_contains",
            StreamKind::Stdout,
            &Predicate::contains(text),
            timeout,
        )
    }

    /// [`stderr_contains`](Self::stderr_contains) with an explicit deadline.
    ///
    /// # Errors
    ///
    /// Same as [`stderr_contains`](Self::stderr_contains).
    pub fn stderr_contains_within(&self, text: &str, timeout: Duration) -> Result<bool> {
        self.eventually(
            "stderr_contains",
            StreamKind::Stderr,
            &Predicate::contains(text),
            timeout,
        )
    }

    /// [`stdout_matches`](Self::stdout_matches) with an explicit deadline.
    ///
    /// # Errors
    ///
    /// Same as [`stdout_matches`](Self::stdout_matches).
    pub fn stdout_matches_within(&self, pattern: &str, timeout: Duration) -> Result<bool> {
        self.require_started("stdout_matches")?;
        let predicate = Predicate::regex(pattern)?;
        self.eventually("stdout_matches", StreamKind::Stdout, &predicate, timeout)
    }

    /// [`stderr_matches`](Self::stderr_matches) with an explicit deadline.
    ///
    /// # Errors
    ///
    /// Same as [`stderr_matches`](Self::stderr_matches).
    pub fn stderr_matches_within(&self, pattern: &str, timeout: Duration) -> Result<bool> {
        self.require_started("stderr_matches")?;
        let predicate = Predicate::regex(pattern)?;
        self.eventually("stderr_matches", StreamKind::Stderr, &predicate, timeout)
    }

    // ----- internals -----------------------------------------------------

    fn eventually(
        &self,
        operation: &'static str,
        stream: StreamKind,
        predicate: &Predicate,
        timeout: Duration,
    ) -> Result<bool> {
        self.require_started(operation)?;
        let buffer = self.check_stream(stream)?;
        let matcher = EventualMatcher::new(self.match_config);
        let found = matcher.matches_within(buffer, predicate, timeout);
        if found {
            return Ok(true);
        }
        // A pump that failed while we were polling is still fatal.
        self.check_stream(stream)?;
        Ok(false)
    }

    /// Move out of `Running`. `None` means the command already finished.
    fn take_running(&mut self, operation: &'static str) -> Result<Option<Running>> {
        match std::mem::replace(&mut self.lifecycle, Lifecycle::Initialized) {
            Lifecycle::Running(running) => Ok(Some(running)),
            Lifecycle::Initialized => Err(HarnessError::usage(
                operation,
                ProcessState::Initialized,
                "start it first",
            )),
            finished @ Lifecycle::Finished(_) => {
                self.lifecycle = finished;
                Ok(None)
            }
        }
    }

    /// Record the outcome of reaping the child.
    fn settle(
        &mut self,
        waited: io::Result<std::process::ExitStatus>,
        context: &str,
    ) -> Result<()> {
        match waited {
            Ok(status) => {
                self.finish(ExitOutcome::from_status(status.into()));
                Ok(())
            }
            Err(e) => {
                self.finish(ExitOutcome::Failure(ExitError::Exited(
                    ProcessExitStatus::Unknown,
                )));
                Err(HarnessError::io_context(
                    format!("{context} {}", self.program),
                    e,
                ))
            }
        }
    }

    const fn buffer(&self, stream: StreamKind) -> &OutputBuffer {
        match stream {
            StreamKind::Stdout => &self.stdout,
            StreamKind::Stderr => &self.stderr,
        }
    }

    fn check_stream(&self, stream: StreamKind) -> Result<&OutputBuffer> {
        let buffer = self.buffer(stream);
        match buffer.fault() {
            Some(source) => Err(HarnessError::stream_read(stream, source)),
            None => Ok(buffer),
        }
    }

    fn require_initialized(&self, operation: &'static str) -> Result<()> {
        match self.state() {
            ProcessState::Initialized => Ok(()),
            state => Err(HarnessError::usage(
                operation,
                state,
                "construct a new command to execute it again",
            )),
        }
    }

    fn require_started(&self, operation: &'static str) -> Result<()> {
        match self.state() {
            ProcessState::Initialized => Err(HarnessError::usage(
                operation,
                ProcessState::Initialized,
                "run or start it first",
            )),
            ProcessState::Running | ProcessState::Finished => Ok(()),
        }
    }

    fn outcome(&self, operation: &'static str) -> Result<&ExitOutcome> {
        match &self.lifecycle {
            Lifecycle::Finished(outcome) => Ok(outcome),
            Lifecycle::Initialized => Err(HarnessError::usage(
                operation,
                ProcessState::Initialized,
                "run it first",
            )),
            Lifecycle::Running(_) => Err(HarnessError::usage(
                operation,
                ProcessState::Running,
                "wait for or kill it first",
            )),
        }
    }

    fn runtime_handle(&mut self) -> Result<Handle> {
        let runtime = match self.runtime.take() {
            Some(runtime) => runtime,
            None => HarnessError::with_io_context(
                Builder::new_multi_thread()
                    .worker_threads(RUNTIME_WORKERS)
                    .thread_name("clitest-pump")
                    .enable_all()
                    .build(),
                "creating tokio runtime",
            )?,
        };
        Ok(self.runtime.insert(runtime).handle().clone())
    }

    fn spawn_child(&mut self, handle: &Handle) -> io::Result<Child> {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd.stdin(if self.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        if let Some(env) = &self.env {
            cmd.env_clear().envs(env);
        }
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        // Pipes and the child watcher register with the runtime's reactor.
        let _guard = handle.enter();
        let child = cmd.spawn()?;
        self.pid = child.id();
        tracing::debug!(
            program = %self.program,
            args = ?self.args,
            pid = ?self.pid,
            "spawned process"
        );
        Ok(child)
    }

    fn start_feeder(&mut self, handle: &Handle, child: &mut Child) -> Option<JoinHandle<()>> {
        let source = self.stdin.take()?;
        let stdin = child.stdin.take()?;
        Some(handle.spawn(feed_stdin(stdin, source)))
    }

    fn record_launch_failure(&mut self, error: io::Error) {
        tracing::debug!(program = %self.program, error = %error, "failed to launch process");
        self.finish(ExitOutcome::Failure(ExitError::launch(
            self.program.clone(),
            error,
        )));
    }

    fn finish(&mut self, outcome: ExitOutcome) {
        tracing::debug!(program = %self.program, pid = ?self.pid, %outcome, "process finished");
        self.stdout.seal();
        self.stderr.seal();
        self.lifecycle = Lifecycle::Finished(outcome);
    }
}

impl Drop for Command {
    fn drop(&mut self) {
        if let Lifecycle::Running(Running { child, .. }) = &mut self.lifecycle {
            tracing::debug!(program = %self.program, pid = ?self.pid, "killing process on drop");
            let _ = child.start_kill();
        }
        // A stdin reader may still be blocked in the blocking pool.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Command");
        s.field("program", &self.program)
            .field("args", &self.args)
            .field("state", &self.state())
            .field("pid", &self.pid);
        if let Lifecycle::Finished(outcome) = &self.lifecycle {
            s.field("outcome", outcome);
        }
        s.field("stdout", &self.stdout)
            .field("stderr", &self.stderr)
            .finish()
    }
}

/// Write `source` into the child's stdin, then close it.
async fn feed_stdin(mut stdin: ChildStdin, source: InputSource) {
    let result = match source {
        InputSource::Bytes(bytes) => stdin.write_all(&bytes).await,
        InputSource::Reader(reader) => stream_reader(&mut stdin, reader).await,
    };

    match result {
        Ok(()) => tracing::trace!("stdin closed"),
        // The child exited or closed stdin without reading everything.
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            tracing::trace!("child closed stdin early");
        }
        Err(e) => tracing::warn!(error = %e, "failed to feed stdin"),
    }
}

async fn stream_reader(stdin: &mut ChildStdin, mut reader: Box<dyn Read + Send>) -> io::Result<()> {
    let (tx, mut rx) = mpsc::channel::<io::Result<Vec<u8>>>(4);

    tokio::task::spawn_blocking(move || {
        let mut chunk = vec![0u8; STDIN_CHUNK];
        loop {
            let next = match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => Ok(chunk[..n].to_vec()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => Err(e),
            };
            let failed = next.is_err();
            if tx.blocking_send(next).is_err() || failed {
                break;
            }
        }
    });

    while let Some(chunk) = rx.recv().await {
        stdin.write_all(&chunk?).await?;
    }
    stdin.flush().await
}
