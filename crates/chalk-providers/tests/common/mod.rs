// crates/chalk-providers/tests/common/mod.rs
// ============================================================================
// Module: Provider Test Helpers
// Description: Mock metadata server and environment snapshot builders.
// ============================================================================
//! ## Overview
//! Spins up a local `tiny_http` server that mimics the AWS/Azure/GCP
//! metadata endpoints plus an ECS task-metadata document, and provides
//! snapshot builders so tests never mutate the process environment.

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
    dead_code,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::collections::BTreeMap;
use std::thread;

use chalk_core::EnvSnapshot;
use serde_json::json;
use tiny_http::Method;
use tiny_http::Response;
use tiny_http::Server;

/// A running mock metadata server.
pub struct MockImds {
    /// Base URL (`http://127.0.0.1:<port>`) for plugin configuration.
    pub base: String,
}

/// Spawns the mock server; it lives until the test process exits.
pub fn spawn_imds() -> MockImds {
    let server = Server::http("127.0.0.1:0").unwrap();
    let port = server.server_addr().to_ip().unwrap().port();
    let base = format!("http://127.0.0.1:{port}");
    thread::spawn(move || {
        for request in server.incoming_requests() {
            respond(request);
        }
    });
    MockImds {
        base,
    }
}

/// Routes one request against the canned metadata fixtures.
fn respond(request: tiny_http::Request) {
    let url = request.url().to_string();
    let is_put = *request.method() == Method::Put;
    let body = route(&url, is_put);
    let _ = match body {
        Some(body) => request.respond(Response::from_string(body)),
        None => request.respond(Response::from_string("not found").with_status_code(404)),
    };
}

/// Returns the canned body for a path, or `None` for a 404.
///
/// `public-hostname` is deliberately unserved so tests can assert that one
/// failing sub-fetch degrades to a missing field, never an aborted probe.
fn route(url: &str, is_put: bool) -> Option<String> {
    if is_put {
        return (url == "/latest/api/token").then(|| "imds-test-token".to_string());
    }
    match url {
        "/latest/meta-data/ami-id" => Some("ami-0abcdef1234567890".to_string()),
        "/latest/meta-data/hostname" | "/latest/meta-data/local-hostname" => {
            Some("ip-10-251-50-12.ec2.internal".to_string())
        }
        "/latest/meta-data/instance-id" => Some("i-abc123xyz789".to_string()),
        "/latest/meta-data/instance-type" => Some("t2.medium".to_string()),
        "/latest/meta-data/local-ipv4" => Some("10.251.50.12".to_string()),
        "/latest/meta-data/mac" => Some("00:25:96:FF:FE:12:34:56".to_string()),
        "/latest/meta-data/placement/availability-zone" => Some("us-east-1e".to_string()),
        "/latest/meta-data/placement/region" => Some("us-east-1".to_string()),
        "/latest/meta-data/public-ipv4" => Some("203.0.113.25".to_string()),
        "/latest/meta-data/security-groups" => Some("default\ntest".to_string()),
        "/latest/meta-data/tags/instance" => Some("Name\nEnvironment".to_string()),
        "/latest/meta-data/tags/instance/Name" => Some("foobar".to_string()),
        "/latest/meta-data/tags/instance/Environment" => Some("staging".to_string()),
        "/latest/dynamic/instance-identity/document" => Some(
            json!({
                "accountId": "123456789012",
                "architecture": "x86_64",
                "availabilityZone": "us-east-1e",
                "imageId": "ami-0abcdef1234567890",
                "instanceId": "i-abc123xyz789",
                "instanceType": "t2.medium",
                "privateIp": "10.251.50.12",
                "region": "us-east-1",
                "version": "2017-09-30"
            })
            .to_string(),
        ),
        "/ecs/task" => Some(
            json!({
                "Cluster": "arn:aws:ecs:us-east-1:123456789012:cluster/test",
                "TaskARN": "arn:aws:ecs:us-east-1:123456789012:task/test/abc",
                "Family": "test-task",
                "Revision": "1"
            })
            .to_string(),
        ),
        "/metadata/instance?api-version=2021-02-01" => Some(
            json!({
                "compute": {
                    "location": "westeurope",
                    "subscriptionId": "11111111-1111-1111-1111-111111111111",
                    "tagsList": [
                        {"name": "testtag", "value": "testvalue"},
                        {"name": "testtag2", "value": "testvalue2"}
                    ],
                    "vmId": "e94f3f7f-6b23-4395-be46-ea363c549f71",
                    "vmSize": "Standard_B1ls"
                },
                "network": {
                    "interface": [{
                        "ipv4": {
                            "ipAddress": [{
                                "privateIpAddress": "10.0.0.4",
                                "publicIpAddress": "20.242.32.12"
                            }],
                            "subnet": [{"address": "10.0.0.0", "prefix": "24"}]
                        },
                        "ipv6": {"ipAddress": []},
                        "macAddress": "AAAAAAAAAAAA"
                    }]
                }
            })
            .to_string(),
        ),
        "/computeMetadata/v1/instance/?recursive=true" => Some(
            json!({
                "hostname": "instance-1.europe-west1-b.c.test-project.internal",
                "id": 133_380_848_178_631_130_u64,
                "machineType": "projects/11111111111/machineTypes/e2-micro",
                "name": "instance-1",
                "networkInterfaces": [{
                    "accessConfigs": [
                        {"externalIp": "35.205.62.123", "type": "ONE_TO_ONE_NAT"}
                    ],
                    "ip": "10.132.0.2"
                }],
                "serviceAccounts": {
                    "default": {
                        "aliases": ["default"],
                        "email": "11111111111-compute@developer.gserviceaccount.com"
                    }
                },
                "zone": "projects/11111111111/zones/europe-west1-b"
            })
            .to_string(),
        ),
        _ => None,
    }
}

/// Builds an environment snapshot from string pairs.
pub fn env_snapshot(pairs: &[(&str, &str)]) -> EnvSnapshot {
    let vars: BTreeMap<String, String> =
        pairs.iter().map(|(key, value)| ((*key).to_string(), (*value).to_string())).collect();
    EnvSnapshot::from_map(vars)
}
