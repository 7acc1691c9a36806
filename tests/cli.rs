//! Command-line behavior of the heaptop binary

use std::process::{Command, Output};

fn heaptop(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_heaptop"))
        .args(args)
        .env_remove("HEAPTOP__LOG__LEVEL")
        .output()
        .expect("failed to run heaptop")
}

#[test]
fn test_help_prints_usage_and_fails() {
    let output = heaptop(&["-h"]);
    assert!(!output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--profile_url"), "usage was: {}", stdout);
    assert!(stdout.contains("--output_file_prefix"), "usage was: {}", stdout);
}

#[test]
fn test_missing_required_flags() {
    for args in [
        vec![],
        vec!["--profile_url", "http://127.0.0.1:1/pprof"],
        vec!["--output_file_prefix", "/tmp/heaptop-cli"],
        vec!["--profile_url", "", "--output_file_prefix", "/tmp/heaptop-cli"],
    ] {
        let output = heaptop(&args);
        assert!(!output.status.success(), "args {:?} should fail", args);
        assert!(String::from_utf8_lossy(&output.stdout).contains("--profile_url"));
    }
}

#[test]
fn test_unknown_flag() {
    let output = heaptop(&["--profile_url", "http://127.0.0.1:1", "--bogus"]);
    assert!(!output.status.success());
}

#[test]
fn test_unsupported_url_scheme() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("run");
    let output = heaptop(&[
        "--profile_url",
        "ftp://127.0.0.1:1/pprof",
        "--output_file_prefix",
        &prefix.to_string_lossy(),
    ]);

    assert!(!output.status.success());
    assert!(!dir.path().join("run.raw.txt").exists());
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stderr.contains("https://") || stdout.contains("https://"),
        "stderr was: {}",
        stderr
    );
}

#[test]
fn test_unreachable_https_profiler() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("run");
    let output = heaptop(&[
        "--profile_url",
        "https://127.0.0.1:1/pprof",
        "--output_file_prefix",
        &prefix.to_string_lossy(),
        "--seconds",
        "1",
    ]);

    // Accepted as a URL, then fails to connect
    assert!(!output.status.success());
    assert!(dir.path().join("run.raw.txt").exists());
    assert!(!dir.path().join("run.in_use_bytes.html").exists());
}

#[test]
fn test_unreachable_profiler() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("run");
    let output = heaptop(&[
        "--profile_url",
        "http://127.0.0.1:1/pprof",
        "--output_file_prefix",
        &prefix.to_string_lossy(),
        "--seconds",
        "1",
        "-l",
        "error",
    ]);

    assert!(!output.status.success());
    assert!(!dir.path().join("run.in_use_bytes.html").exists());
}

#[test]
fn test_invalid_option_values() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("run");
    let output = heaptop(&[
        "--profile_url",
        "http://127.0.0.1:1/pprof",
        "--output_file_prefix",
        &prefix.to_string_lossy(),
        "--batch_size",
        "0",
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("batch_size"), "stderr was: {}", stderr);
}
