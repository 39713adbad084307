// crates/chalk-cli/src/main_tests.rs
// ============================================================================
// Module: Chalk CLI Unit Tests
// Description: Argument parsing, override splitting, and config loading.
// ============================================================================
//! ## Overview
//! Colocated unit tests for the CLI surface: subcommand and flag parsing,
//! `KEY=VALUE` override handling, and TOML config defaults.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::fs;

use clap::Parser;

use crate::ChalkConfig;
use crate::Cli;
use crate::CliError;
use crate::Command;
use crate::load_config;
use crate::parse_env_overrides;

#[test]
fn insert_parses_virtual_and_env_flags() {
    let cli = Cli::parse_from([
        "chalk",
        "insert",
        "/tmp/target",
        "--virtual",
        "--env",
        "CI=true",
        "--env",
        "GITHUB_RUN_ID=7",
    ]);
    let Command::Insert(args) = cli.command else {
        panic!("expected insert");
    };
    assert!(args.virtual_mode);
    assert_eq!(args.env_overrides.len(), 2);
}

#[test]
fn extract_parses_plain_path() {
    let cli = Cli::parse_from(["chalk", "extract", "/tmp/target"]);
    let Command::Extract(args) = cli.command else {
        panic!("expected extract");
    };
    assert!(!args.virtual_mode);
    assert!(args.env_overrides.is_empty());
}

#[test]
fn env_overrides_split_on_first_equals() {
    let overrides =
        parse_env_overrides(&["A=1".to_string(), "B=left=right".to_string()]).unwrap();
    assert_eq!(overrides["A"], "1");
    assert_eq!(overrides["B"], "left=right");
}

#[test]
fn malformed_override_is_rejected() {
    let err = parse_env_overrides(&["NOEQUALS".to_string()]).unwrap_err();
    assert!(matches!(err, CliError::Args(_)));

    let err = parse_env_overrides(&["=value".to_string()]).unwrap_err();
    assert!(matches!(err, CliError::Args(_)));
}

#[test]
fn missing_config_falls_back_to_defaults() {
    let config = load_config(None).unwrap();
    assert_eq!(config.cloud.timeout_ms, 1_000);
}

#[test]
fn config_file_overrides_cloud_endpoints() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chalk.toml");
    fs::write(
        &path,
        "[cloud]\naws_base = \"http://127.0.0.1:9999\"\ntimeout_ms = 250\n",
    )
    .unwrap();

    let config: ChalkConfig = load_config(Some(&path)).unwrap();
    assert_eq!(config.cloud.aws_base, "http://127.0.0.1:9999");
    assert_eq!(config.cloud.timeout_ms, 250);
    // Unset keys keep their defaults.
    assert_eq!(config.cloud.gcp_base, "http://metadata.google.internal");
}

#[test]
fn unreadable_config_is_a_config_error() {
    let err = load_config(Some(std::path::Path::new("/nonexistent/chalk.toml"))).unwrap_err();
    assert!(matches!(err, CliError::Config(_)));
}
