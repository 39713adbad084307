// crates/chalk-providers/tests/ci_provider.rs
// ============================================================================
// Module: CI Plugin Tests
// Description: Vendor detection and BUILD_* field derivation.
// ============================================================================
//! ## Overview
//! Build-provenance fields must derive deterministically from the recognized
//! vendor's environment variables; the first matching vendor wins and missing
//! variables omit their fields.

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

mod common;

use chalk_core::CollectContext;
use chalk_core::EnrichmentPlugin;
use chalk_providers::CiPlugin;
use serde_json::json;

use crate::common::env_snapshot;

#[test]
fn github_actions_fields_derive_from_env() {
    let dir = tempfile::tempdir().unwrap();
    let env = env_snapshot(&[
        ("CI", "true"),
        ("GITHUB_SHA", "ffac537e6cbbf934b08745a378932722df287a53"),
        ("GITHUB_SERVER_URL", "https://github.com"),
        ("GITHUB_REPOSITORY", "octocat/Hello-World"),
        ("GITHUB_RUN_ID", "1658821493"),
        ("GITHUB_API_URL", "https://api.github.com"),
        ("GITHUB_ACTOR", "octocat"),
        ("GITHUB_EVENT_NAME", "push"),
        ("GITHUB_REF_TYPE", "tag"),
    ]);
    let facts = CiPlugin.collect(&CollectContext::new(env, dir.path())).unwrap();

    assert_eq!(facts.report["BUILD_ID"], json!("1658821493"));
    assert_eq!(facts.report["BUILD_TRIGGER"], json!("tag"));
    assert_eq!(facts.report["BUILD_CONTACT"], json!(["octocat"]));
    assert_eq!(
        facts.report["BUILD_URI"],
        json!("https://github.com/octocat/Hello-World/actions/runs/1658821493")
    );
    assert_eq!(facts.report["BUILD_API_URI"], json!("https://api.github.com"));
    assert!(facts.mark.is_empty());
}

#[test]
fn gitlab_fields_derive_from_env() {
    let dir = tempfile::tempdir().unwrap();
    let env = env_snapshot(&[
        ("CI", "true"),
        ("GITLAB_CI", "true"),
        ("CI_JOB_URL", "https://gitlab.com/gitlab-org/gitlab/-/jobs/4999820578"),
        ("CI_JOB_ID", "4999820578"),
        ("CI_API_V4_URL", "https://gitlab.com/api/v4"),
        ("GITLAB_USER_LOGIN", "user"),
        ("CI_PIPELINE_SOURCE", "push"),
    ]);
    let facts = CiPlugin.collect(&CollectContext::new(env, dir.path())).unwrap();

    assert_eq!(facts.report["BUILD_ID"], json!("4999820578"));
    assert_eq!(facts.report["BUILD_TRIGGER"], json!("push"));
    assert_eq!(facts.report["BUILD_CONTACT"], json!(["user"]));
    assert_eq!(
        facts.report["BUILD_URI"],
        json!("https://gitlab.com/gitlab-org/gitlab/-/jobs/4999820578")
    );
    assert_eq!(facts.report["BUILD_API_URI"], json!("https://gitlab.com/api/v4"));
}

#[test]
fn first_matching_vendor_wins() {
    let dir = tempfile::tempdir().unwrap();
    let env = env_snapshot(&[
        ("GITHUB_RUN_ID", "1"),
        ("GITHUB_ACTOR", "octocat"),
        ("GITLAB_CI", "true"),
        ("CI_JOB_ID", "2"),
    ]);
    let facts = CiPlugin.collect(&CollectContext::new(env, dir.path())).unwrap();

    // GitHub gates first; no GitLab field may leak in.
    assert_eq!(facts.report["BUILD_ID"], json!("1"));
    assert_eq!(facts.report["BUILD_CONTACT"], json!(["octocat"]));
}

#[test]
fn missing_variables_omit_fields() {
    let dir = tempfile::tempdir().unwrap();
    let env = env_snapshot(&[("GITHUB_RUN_ID", "77")]);
    let facts = CiPlugin.collect(&CollectContext::new(env, dir.path())).unwrap();

    assert_eq!(facts.report["BUILD_ID"], json!("77"));
    assert!(!facts.report.contains_key("BUILD_TRIGGER"));
    assert!(!facts.report.contains_key("BUILD_CONTACT"));
    assert!(!facts.report.contains_key("BUILD_URI"));
}

#[test]
fn no_recognized_vendor_yields_no_fields() {
    let dir = tempfile::tempdir().unwrap();
    let env = env_snapshot(&[("CI", "true")]);
    let facts = CiPlugin.collect(&CollectContext::new(env, dir.path())).unwrap();
    assert!(facts.is_empty());
}
