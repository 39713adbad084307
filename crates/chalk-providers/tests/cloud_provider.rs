// crates/chalk-providers/tests/cloud_provider.rs
// ============================================================================
// Module: Cloud Metadata Plugin Tests
// Description: Vendor gating, AWS service types, and per-provider summaries.
// ============================================================================
//! ## Overview
//! The vendor file gates all probing: `Amazon` attempts AWS (EC2/ECS/EKS by
//! execution context), `Microsoft Corporation` attempts Azure, `Google`
//! attempts GCP, anything else probes nothing. Partial metadata is reported
//! as whatever was retrieved.

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

use std::fs;
use std::path::Path;

use chalk_core::CollectContext;
use chalk_core::EnrichmentPlugin;
use chalk_providers::CloudMetadataPlugin;
use chalk_providers::CloudProviderConfig;
use serde_json::json;

use crate::common::env_snapshot;
use crate::common::spawn_imds;

/// Builds a plugin wired against the mock server and a vendor file.
fn plugin_for(vendor: &str, base: &str, dir: &Path) -> CloudMetadataPlugin {
    let vendor_file = dir.join("sys_vendor");
    fs::write(&vendor_file, vendor).unwrap();
    CloudMetadataPlugin::new(CloudProviderConfig {
        vendor_file,
        aws_base: base.to_string(),
        azure_base: base.to_string(),
        gcp_base: base.to_string(),
        ..CloudProviderConfig::default()
    })
    .unwrap()
}

#[test]
fn amazon_vendor_without_signals_is_ec2() {
    let server = spawn_imds();
    let dir = tempfile::tempdir().unwrap();
    let plugin = plugin_for("Amazon", &server.base, dir.path());

    let ctx = CollectContext::new(env_snapshot(&[]), dir.path());
    let facts = plugin.collect(&ctx).unwrap();

    assert_eq!(facts.report["_OP_CLOUD_PROVIDER"], json!("aws"));
    assert_eq!(facts.report["_OP_CLOUD_PROVIDER_SERVICE_TYPE"], json!("aws_ec2"));
    assert_eq!(facts.report["_AWS_AMI_ID"], json!("ami-0abcdef1234567890"));
    assert_eq!(facts.report["_AWS_INSTANCE_ID"], json!("i-abc123xyz789"));
    assert_eq!(facts.report["_AWS_AZ"], json!("us-east-1e"));
    assert_eq!(facts.report["_AWS_SECURITY_GROUPS"], json!(["default", "test"]));
    assert_eq!(facts.report["_OP_CLOUD_PROVIDER_ACCOUNT_INFO"], json!("123456789012"));
    assert_eq!(facts.report["_OP_CLOUD_PROVIDER_IP"], json!("203.0.113.25"));
    assert_eq!(facts.report["_OP_CLOUD_PROVIDER_REGION"], json!("us-east-1"));
    assert_eq!(facts.report["_OP_CLOUD_PROVIDER_INSTANCE_TYPE"], json!("t2.medium"));
    assert_eq!(
        facts.report["_OP_CLOUD_PROVIDER_TAGS"],
        json!({"Name": "foobar", "Environment": "staging"})
    );
    // All cloud facts are invocation-level, none mark-level.
    assert!(facts.mark.is_empty());
}

#[test]
fn failing_subfetch_omits_only_that_field() {
    let server = spawn_imds();
    let dir = tempfile::tempdir().unwrap();
    let plugin = plugin_for("Amazon", &server.base, dir.path());

    let ctx = CollectContext::new(env_snapshot(&[]), dir.path());
    let facts = plugin.collect(&ctx).unwrap();

    // The mock serves no public-hostname; everything else still lands.
    assert!(!facts.report.contains_key("_AWS_PUBLIC_HOSTNAME"));
    assert!(facts.report.contains_key("_AWS_PUBLIC_IPV4_ADDR"));
    assert_eq!(facts.report["_OP_CLOUD_PROVIDER"], json!("aws"));
}

#[test]
fn ecs_metadata_uri_flips_service_type() {
    let server = spawn_imds();
    let dir = tempfile::tempdir().unwrap();
    let plugin = plugin_for("Amazon", &server.base, dir.path());

    let ecs_uri = format!("{}/ecs/task", server.base);
    let ctx =
        CollectContext::new(env_snapshot(&[("ECS_CONTAINER_METADATA_URI", &ecs_uri)]), dir.path());
    let facts = plugin.collect(&ctx).unwrap();

    assert_eq!(facts.report["_OP_CLOUD_PROVIDER"], json!("aws"));
    assert_eq!(facts.report["_OP_CLOUD_PROVIDER_SERVICE_TYPE"], json!("aws_ecs"));
    assert_eq!(facts.report["_OP_CLOUD_PROVIDER_ACCOUNT_INFO"], json!("123456789012"));
    assert_eq!(facts.report["_OP_CLOUD_PROVIDER_IP"], json!("203.0.113.25"));
    assert_eq!(facts.report["_OP_CLOUD_PROVIDER_REGION"], json!("us-east-1"));
    assert_eq!(facts.report["_OP_CLOUD_PROVIDER_INSTANCE_TYPE"], json!("t2.medium"));
    assert!(facts.report.contains_key("_AWS_ECS_TASK_METADATA"));
}

#[test]
fn kubernetes_signal_flips_service_type_to_eks() {
    let server = spawn_imds();
    let dir = tempfile::tempdir().unwrap();
    let plugin = plugin_for("Amazon", &server.base, dir.path());

    let ctx = CollectContext::new(env_snapshot(&[("KUBERNETES_PORT", "tests")]), dir.path());
    let facts = plugin.collect(&ctx).unwrap();

    assert_eq!(facts.report["_OP_CLOUD_PROVIDER"], json!("aws"));
    assert_eq!(facts.report["_OP_CLOUD_PROVIDER_SERVICE_TYPE"], json!("aws_eks"));
}

#[test]
fn ecs_takes_precedence_over_kubernetes() {
    let server = spawn_imds();
    let dir = tempfile::tempdir().unwrap();
    let plugin = plugin_for("Amazon", &server.base, dir.path());

    let ecs_uri = format!("{}/ecs/task", server.base);
    let ctx = CollectContext::new(
        env_snapshot(&[("ECS_CONTAINER_METADATA_URI", &ecs_uri), ("KUBERNETES_PORT", "tests")]),
        dir.path(),
    );
    let facts = plugin.collect(&ctx).unwrap();

    assert_eq!(facts.report["_OP_CLOUD_PROVIDER_SERVICE_TYPE"], json!("aws_ecs"));
}

#[test]
fn microsoft_vendor_probes_azure() {
    let server = spawn_imds();
    let dir = tempfile::tempdir().unwrap();
    let plugin = plugin_for("Microsoft Corporation", &server.base, dir.path());

    let ctx = CollectContext::new(env_snapshot(&[]), dir.path());
    let facts = plugin.collect(&ctx).unwrap();

    assert_eq!(facts.report["_OP_CLOUD_PROVIDER"], json!("azure"));
    assert_eq!(
        facts.report["_OP_CLOUD_PROVIDER_ACCOUNT_INFO"],
        json!("11111111-1111-1111-1111-111111111111")
    );
    assert_eq!(facts.report["_OP_CLOUD_PROVIDER_IP"], json!("20.242.32.12"));
    assert_eq!(facts.report["_OP_CLOUD_PROVIDER_REGION"], json!("westeurope"));
    assert_eq!(facts.report["_OP_CLOUD_PROVIDER_INSTANCE_TYPE"], json!("Standard_B1ls"));
    assert_eq!(
        facts.report["_OP_CLOUD_PROVIDER_TAGS"],
        json!([
            {"name": "testtag", "value": "testvalue"},
            {"name": "testtag2", "value": "testvalue2"}
        ])
    );
    assert!(facts.report.contains_key("_AZURE_INSTANCE_METADATA"));
}

#[test]
fn google_vendor_probes_gcp() {
    let server = spawn_imds();
    let dir = tempfile::tempdir().unwrap();
    let plugin = plugin_for("Google", &server.base, dir.path());

    let ctx = CollectContext::new(env_snapshot(&[]), dir.path());
    let facts = plugin.collect(&ctx).unwrap();

    assert_eq!(facts.report["_OP_CLOUD_PROVIDER"], json!("gcp"));
    assert_eq!(facts.report["_OP_CLOUD_PROVIDER_IP"], json!("35.205.62.123"));
    assert_eq!(facts.report["_OP_CLOUD_PROVIDER_REGION"], json!("europe-west1-b"));
    assert_eq!(facts.report["_OP_CLOUD_PROVIDER_INSTANCE_TYPE"], json!("e2-micro"));
    assert!(facts.report.contains_key("_GCP_INSTANCE_METADATA"));
    assert!(facts.report.contains_key("_OP_CLOUD_PROVIDER_ACCOUNT_INFO"));
}

#[test]
fn unknown_vendor_probes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    // Unreachable base: if gating leaked a request, the probe would stall and
    // fail; an unknown vendor must return instantly with no facts.
    let plugin = plugin_for("Dell Inc.", "http://127.0.0.1:1", dir.path());

    let ctx = CollectContext::new(env_snapshot(&[]), dir.path());
    let facts = plugin.collect(&ctx).unwrap();
    assert!(facts.is_empty());
}

#[test]
fn missing_vendor_file_probes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let plugin = CloudMetadataPlugin::new(CloudProviderConfig {
        vendor_file: dir.path().join("absent"),
        aws_base: "http://127.0.0.1:1".to_string(),
        ..CloudProviderConfig::default()
    })
    .unwrap();

    let ctx = CollectContext::new(env_snapshot(&[]), dir.path());
    let facts = plugin.collect(&ctx).unwrap();
    assert!(facts.is_empty());
}
