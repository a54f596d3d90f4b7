//! CLI Integration Tests for sigdefer
//!
//! Runs the `sigdefer` binary and signals it from outside.

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::io::{BufRead, BufReader, Lines};
use std::process::{Child, ChildStdout, Command, Stdio};

/// Path to the sigdefer binary built for this test run
fn sigdefer_binary() -> &'static str {
    env!("CARGO_BIN_EXE_sigdefer")
}

fn spawn_watch(args: &[&str]) -> (Child, Lines<BufReader<ChildStdout>>) {
    let mut child = Command::new(sigdefer_binary())
        .arg("watch")
        .args(args)
        .current_dir(std::env::temp_dir())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to run sigdefer");
    let stdout = child.stdout.take().expect("stdout not piped");
    (child, BufReader::new(stdout).lines())
}

fn next_line(lines: &mut Lines<BufReader<ChildStdout>>) -> String {
    lines
        .next()
        .expect("sigdefer closed stdout early")
        .expect("Failed to read sigdefer output")
}

fn read_pid(lines: &mut Lines<BufReader<ChildStdout>>) -> Pid {
    let line = next_line(lines);
    let pid = line
        .strip_prefix("pid ")
        .and_then(|pid| pid.parse().ok())
        .unwrap_or_else(|| panic!("expected pid line, got {:?}", line));
    Pid::from_raw(pid)
}

// ============================================================================
// Watch
// ============================================================================

#[test]
fn test_watch_reports_each_signal() {
    let (mut child, mut lines) = spawn_watch(&["--count", "2", "--timeout-ms", "20000"]);
    let pid = read_pid(&mut lines);

    kill(pid, Signal::SIGUSR1).unwrap();
    assert_eq!(next_line(&mut lines), "received SIGUSR1");
    kill(pid, Signal::SIGUSR1).unwrap();
    assert_eq!(next_line(&mut lines), "received SIGUSR1");
    assert_eq!(next_line(&mut lines), "done");

    let status = child.wait().unwrap();
    assert!(status.success(), "sigdefer failed: {:?}", status);
}

#[test]
fn test_watch_multiple_signals() {
    let (mut child, mut lines) = spawn_watch(&[
        "--signal",
        "USR1",
        "--signal",
        "SIGHUP",
        "--count",
        "2",
        "--timeout-ms",
        "20000",
    ]);
    let pid = read_pid(&mut lines);

    kill(pid, Signal::SIGHUP).unwrap();
    assert_eq!(next_line(&mut lines), "received SIGHUP");
    kill(pid, Signal::SIGUSR1).unwrap();
    assert_eq!(next_line(&mut lines), "received SIGUSR1");

    assert!(child.wait().unwrap().success());
}

#[test]
fn test_sigint_interrupts_watch() {
    let (mut child, mut lines) = spawn_watch(&["--timeout-ms", "20000"]);
    let pid = read_pid(&mut lines);

    kill(pid, Signal::SIGINT).unwrap();
    assert_eq!(next_line(&mut lines), "interrupted by SIGINT");

    let status = child.wait().unwrap();
    assert_eq!(status.code(), Some(130));
}

#[test]
fn test_watch_times_out() {
    let (mut child, mut lines) = spawn_watch(&["--timeout-ms", "100"]);
    read_pid(&mut lines);

    let status = child.wait().unwrap();
    assert!(!status.success());
}

#[test]
fn test_watch_rejects_unknown_signal() {
    let output = Command::new(sigdefer_binary())
        .args(["watch", "--signal", "SIGNOPE"])
        .current_dir(std::env::temp_dir())
        .output()
        .expect("Failed to run sigdefer");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("SIGNOPE"), "stderr: {}", stderr);
}

#[test]
fn test_watch_rejects_reserved_signal() {
    let output = Command::new(sigdefer_binary())
        .args(["watch", "--signal", "SIGKILL"])
        .current_dir(std::env::temp_dir())
        .output()
        .expect("Failed to run sigdefer");

    assert!(!output.status.success());
}

#[test]
fn test_watch_refuses_config_without_handlers() {
    let mut dir = std::env::temp_dir();
    dir.push(format!("sigdefer_cli_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let config = dir.join("sigdefer.toml");
    std::fs::write(&config, "[signals]\ninstall_handlers = false\n").unwrap();

    let output = Command::new(sigdefer_binary())
        .args(["watch", "--timeout-ms", "100", "--config"])
        .arg(&config)
        .output()
        .expect("Failed to run sigdefer");
    std::fs::remove_dir_all(&dir).ok();

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stdout.contains("pid "), "stdout: {}", stdout);
    assert!(stderr.contains("install_handlers"), "stderr: {}", stderr);
}

// ============================================================================
// List
// ============================================================================

#[test]
fn test_list_shows_portable_numbers() {
    let output = Command::new(sigdefer_binary())
        .arg("list")
        .output()
        .expect("Failed to run sigdefer");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let int_line = stdout
        .lines()
        .find(|line| line.ends_with(" SIGINT"))
        .expect("SIGINT not listed");
    assert!(int_line.trim_start().starts_with("-6"), "line: {}", int_line);
    assert!(stdout.contains("SIGUSR1"));
}
