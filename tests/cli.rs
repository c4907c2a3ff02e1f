//! Command-line scenarios: exit codes and the single CSV line on stdout.

use std::process::{Command, Output};

fn parmatmul(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_parmatmul"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to launch parmatmul")
}

fn stdout_lines(out: &Output) -> Vec<String> {
    String::from_utf8_lossy(&out.stdout)
        .lines()
        .map(str::to_owned)
        .collect()
}

#[test]
fn test_blocked_run_prints_one_csv_line() {
    let out = parmatmul(&["blocked", "128", "32", "3"]);
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stderr));

    let lines = stdout_lines(&out);
    assert_eq!(lines.len(), 1, "{lines:?}");
    let fields: Vec<&str> = lines[0].split(',').collect();
    assert_eq!(fields.len(), 7);
    assert_eq!(fields[0], "blocked");
    assert!(fields[1].parse::<usize>().unwrap() >= 1);
    assert_eq!(fields[2], "128");
    assert_eq!(fields[3], "32");

    // Six decimals for time and throughput.
    assert_eq!(fields[4].split('.').nth(1).map(str::len), Some(6));
    assert_eq!(fields[5].split('.').nth(1).map(str::len), Some(6));

    let err: f64 = fields[6].parse().unwrap();
    assert!(err < 1e-9);
    assert!(fields[6].contains("e-") || fields[6].contains("e+"));
}

#[test]
fn test_single_small_matrix() {
    let out = parmatmul(&["single", "4", "64", "1"]);
    assert_eq!(out.status.code(), Some(0));
    let lines = stdout_lines(&out);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("single,"));
    assert!(lines[0].ends_with("0.000e+00"), "{}", lines[0]);
}

#[test]
fn test_threads_flag() {
    let out = parmatmul(&["collapse", "16", "8", "2", "--threads", "3"]);
    assert_eq!(out.status.code(), Some(0));
    let lines = stdout_lines(&out);
    assert!(lines[0].starts_with("collapse,3,16,8,"), "{}", lines[0]);
}

#[test]
fn test_non_positive_block_size_defaults() {
    let out = parmatmul(&["blocked", "10", "-1", "1", "--threads", "1"]);
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(stdout_lines(&out)[0].starts_with("blocked,1,10,64,"));
}

#[test]
fn test_unknown_variant_fails() {
    let out = parmatmul(&["badvariant", "10", "10", "1"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    assert!(String::from_utf8_lossy(&out.stderr).contains("badvariant"));
}

#[test]
fn test_zero_n_fails() {
    let out = parmatmul(&["single", "0", "64", "1"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
}

#[test]
fn test_non_positive_repeats_fails() {
    for repeats in ["0", "-2"] {
        let out = parmatmul(&["single", "8", "64", repeats]);
        assert_eq!(out.status.code(), Some(1), "repeats={repeats}");
        assert!(out.stdout.is_empty());
    }
}

#[test]
fn test_missing_arguments_prints_usage() {
    for args in [&[][..], &["single"][..], &["single", "4", "64"][..]] {
        let out = parmatmul(args);
        assert_eq!(out.status.code(), Some(1), "{args:?}");
        assert!(out.stdout.is_empty());
        assert!(String::from_utf8_lossy(&out.stderr).contains("Usage"));
    }
}

#[test]
fn test_extra_positional_argument_rejected() {
    let out = parmatmul(&["single", "4", "64", "1", "extra"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    assert!(String::from_utf8_lossy(&out.stderr).contains("extra"));
}

#[test]
fn test_help_exits_zero() {
    let out = parmatmul(&["--help"]);
    assert_eq!(out.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&out.stdout).contains("blocked"));
}
