//! Integration tests for running real processes through `Command`.

#![cfg(unix)] // Spawns sh, cat, tail and friends

use std::io::{Cursor, Write};
use std::time::{Duration, Instant};

use clitest::assert::CommandAssertions;
use clitest::{Command, MatchConfig, ProcessExitStatus, ProcessState, command};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Explicit environment replaces the inherited one.
#[test]
fn env_is_passed_to_child() {
    init_tracing();
    let mut cmd = command("sh", &["-c", "echo -n $FOO"]);
    cmd.env([("FOO", "bar")]);
    cmd.run().unwrap();

    assert!(cmd.succeeded().unwrap());
    assert_eq!(cmd.stdout().unwrap(), "bar");
}

#[test]
fn env_var_builds_environment_incrementally() {
    let mut cmd = command("sh", &["-c", "echo \"$A-$B\""]);
    cmd.env_var("A", "one").env_var("B", "two");
    cmd.run().unwrap();

    cmd.assert_stdout_eq("one-two\n");
}

#[test]
fn unknown_executable_fails_with_error() {
    let mut cmd = command("myunknowncommand", &[]);
    cmd.run().unwrap();

    assert!(cmd.failed().unwrap());
    assert!(!cmd.succeeded().unwrap());
    let err = cmd.error().unwrap().expect("launch error expected");
    assert!(err.is_launch());
    assert!(!err.to_string().is_empty());
}

#[test]
fn unknown_executable_start_finishes_immediately() {
    let mut cmd = command("myunknowncommand", &[]);
    cmd.start().unwrap();

    assert_eq!(cmd.state(), ProcessState::Finished);
    assert!(cmd.failed().unwrap());
    assert!(cmd.pid().is_none());
    // Already finished, so both are no-ops.
    cmd.wait().unwrap();
    cmd.kill().unwrap();
}

#[test]
fn stdin_bytes_reach_child() {
    let mut cmd = command("cat", &[]);
    cmd.stdin_bytes("foo\n");
    cmd.run().unwrap();

    assert!(cmd.succeeded().unwrap());
    assert_eq!(cmd.stdout().unwrap(), "foo\n");
}

#[test]
fn stdin_reader_is_streamed_to_started_child() {
    let mut cmd = command("cat", &[]);
    cmd.stdin(Cursor::new(b"line1\nline2\n".to_vec()));
    cmd.start().unwrap();
    cmd.wait().unwrap();

    assert!(cmd.succeeded().unwrap());
    assert_eq!(cmd.stdout().unwrap(), "line1\nline2\n");
}

#[test]
fn stderr_is_captured_case_insensitively() {
    let mut cmd = command("cp", &[]);
    cmd.run().unwrap();

    assert!(cmd.failed().unwrap());
    assert!(cmd.stderr_contains("MISSING").unwrap());
    assert!(cmd.stderr_matches(r"missing\s+file").unwrap());
    assert!(!cmd.stdout_contains("missing").unwrap());
}

#[test]
fn nonzero_exit_is_recorded() {
    let mut cmd = command("sh", &["-c", "echo oops >&2; exit 3"]);
    cmd.run().unwrap();

    assert!(cmd.failed().unwrap());
    assert_eq!(cmd.exit_status().unwrap(), Some(ProcessExitStatus::Exited(3)));
    assert_eq!(cmd.error().unwrap().and_then(|e| e.code()), Some(3));
    assert_eq!(cmd.stderr().unwrap(), "oops\n");
}

#[test]
fn working_directory_is_applied() {
    let dir = tempfile::tempdir().unwrap();
    let expected = dir.path().canonicalize().unwrap();

    let mut cmd = command("pwd", &[]);
    cmd.current_dir(dir.path());
    cmd.run().unwrap();

    assert_eq!(cmd.stdout().unwrap().trim_end(), expected.to_str().unwrap());
}

#[test]
fn queries_before_execution_are_usage_errors() {
    let mut cmd = Command::new("echo", &["hi"]);

    assert!(cmd.error().unwrap_err().is_usage());
    assert!(cmd.succeeded().unwrap_err().is_usage());
    assert!(cmd.failed().unwrap_err().is_usage());
    assert!(cmd.stdout().unwrap_err().is_usage());
    assert!(cmd.stderr().unwrap_err().is_usage());
    assert!(cmd.stdout_contains("hi").unwrap_err().is_usage());
    assert!(cmd.stdout_matches("hi").unwrap_err().is_usage());
    assert!(cmd.wait().unwrap_err().is_usage());
    assert!(cmd.kill().unwrap_err().is_usage());

    cmd.run().unwrap();
    assert!(cmd.succeeded().unwrap());
    assert!(cmd.run().unwrap_err().is_usage());
    assert!(cmd.start().unwrap_err().is_usage());
}

#[test]
fn outcome_queries_are_usage_errors_while_running() {
    let mut cmd = command("sleep", &["10"]);
    cmd.start().unwrap();

    assert_eq!(cmd.state(), ProcessState::Running);
    assert!(cmd.pid().is_some());
    assert!(cmd.succeeded().unwrap_err().is_usage());
    assert!(cmd.error().unwrap_err().is_usage());
    assert_eq!(cmd.stdout().unwrap(), "");

    cmd.kill().unwrap();
}

#[test]
fn invalid_regex_is_an_error() {
    let mut cmd = command("echo", &["x"]);
    cmd.run().unwrap();

    let err = cmd.stdout_matches("(unclosed").unwrap_err();
    assert!(!err.is_usage());
    assert!(err.to_string().contains("regex"));
}

/// A background process is observable while running and keeps its output
/// after being killed.
#[test]
fn started_process_can_be_observed_and_killed() {
    init_tracing();
    let mut cmd = command("sh", &["-c", "echo Started; sleep 10"]);
    cmd.start().unwrap();

    assert_eq!(cmd.state(), ProcessState::Running);
    assert!(cmd.stdout_contains("Started").unwrap());
    assert!(cmd.stdout_contains("started").unwrap());

    cmd.kill().unwrap();
    assert_eq!(cmd.state(), ProcessState::Finished);
    assert!(cmd.failed().unwrap());
    assert!(cmd.stdout().unwrap().contains("Started"));

    // sh may or may not forward the signal to sleep; only sh is killed here.
    let status = cmd.exit_status().unwrap().unwrap();
    assert!(!status.success());
}

#[test]
fn wait_collects_both_streams() {
    let mut cmd = command("sh", &["-c", "echo one; echo two >&2"]);
    cmd.start().unwrap();
    cmd.wait().unwrap();

    assert!(cmd.succeeded().unwrap());
    assert_eq!(cmd.stdout().unwrap(), "one\n");
    assert_eq!(cmd.stderr().unwrap(), "two\n");

    // Sealed buffers answer without waiting out the deadline.
    let start = Instant::now();
    assert!(!cmd.stdout_contains("absent").unwrap());
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[test]
fn wait_keeps_partial_last_line() {
    let mut cmd = command("sh", &["-c", "printf 'a\\nb'"]);
    cmd.start().unwrap();
    cmd.wait().unwrap();

    assert_eq!(cmd.stdout().unwrap(), "a\nb");
}

#[test]
fn appended_output_becomes_visible() {
    init_tracing();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let mut cmd = command("tail", &["-f", &path]);
    cmd.start().unwrap();
    assert!(!cmd.stdout().unwrap().contains("appended line"));

    writeln!(file, "appended line").unwrap();
    file.flush().unwrap();

    assert!(
        cmd.stdout_contains_within("appended line", Duration::from_secs(5))
            .unwrap()
    );
    cmd.kill().unwrap();
}

#[test]
fn matcher_gives_up_after_deadline() {
    let mut cmd = command("sleep", &["10"]);
    cmd.match_config(
        MatchConfig::new(Duration::from_millis(300)).poll_interval(Duration::from_millis(20)),
    );
    cmd.start().unwrap();

    let start = Instant::now();
    assert!(!cmd.stdout_contains("never").unwrap());
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(300));
    assert!(elapsed < Duration::from_secs(3));

    cmd.kill().unwrap();
}

#[test]
fn dropping_a_running_command_does_not_block() {
    let start = Instant::now();
    {
        let mut cmd = command("sleep", &["30"]);
        cmd.start().unwrap();
    }
    assert!(start.elapsed() < Duration::from_secs(5));
}
