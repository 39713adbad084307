// crates/chalk-providers/src/cloud.rs
// ============================================================================
// Module: Cloud Instance-Metadata Plugin
// Description: Vendor-gated IMDS probing for AWS, Azure, and GCP.
// Purpose: Attach cloud host facts to the invocation report.
// Dependencies: chalk-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! The vendor-identification file gates everything: its content decides which
//! provider's metadata service is even attempted, and no match means no
//! network calls at all. Within AWS, the service type comes from the
//! execution context (ECS task-metadata variable, then the Kubernetes
//! service-discovery variable, then plain EC2). Every metadata fetch is a
//! bounded GET against a well-known link-local address with a per-call
//! timeout, one retry with backoff, and an overall deadline; a single failing
//! sub-fetch skips that field only. Raw fields are namespaced per provider
//! and a small provider-agnostic summary is derived per provider.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use chalk_core::CollectContext;
use chalk_core::CollectError;
use chalk_core::EnrichmentFacts;
use chalk_core::EnrichmentPlugin;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use tracing::warn;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the cloud metadata plugin.
///
/// # Invariants
/// - Base URLs carry no trailing slash; probe paths start with `/`.
/// - `timeout_ms` bounds each call; `deadline_ms` bounds the whole probe.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CloudProviderConfig {
    /// Vendor-identification file gating provider detection.
    pub vendor_file: PathBuf,
    /// Base URL of the AWS instance-metadata service.
    pub aws_base: String,
    /// Base URL of the Azure instance-metadata service.
    pub azure_base: String,
    /// Base URL of the GCP metadata service.
    pub gcp_base: String,
    /// Per-call timeout in milliseconds.
    pub timeout_ms: u64,
    /// Overall probe deadline in milliseconds.
    pub deadline_ms: u64,
    /// Maximum response size allowed, in bytes.
    pub max_response_bytes: usize,
    /// User agent string for outbound requests.
    pub user_agent: String,
}

impl Default for CloudProviderConfig {
    fn default() -> Self {
        Self {
            vendor_file: PathBuf::from("/sys/class/dmi/id/sys_vendor"),
            aws_base: "http://169.254.169.254".to_string(),
            azure_base: "http://169.254.169.254".to_string(),
            gcp_base: "http://metadata.google.internal".to_string(),
            timeout_ms: 1_000,
            deadline_ms: 10_000,
            max_response_bytes: 1024 * 1024,
            user_agent: "chalk/0.1".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Provider Gate
// ============================================================================

/// Cloud providers the vendor file can gate in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloudVendor {
    /// Amazon Web Services.
    Aws,
    /// Microsoft Azure.
    Azure,
    /// Google Cloud Platform.
    Gcp,
}

/// Matches the vendor file content against known vendors, case-insensitive.
fn gate_vendor(content: &str) -> Option<CloudVendor> {
    let lowered = content.to_lowercase();
    if lowered.contains("amazon") {
        Some(CloudVendor::Aws)
    } else if lowered.contains("microsoft corporation") {
        Some(CloudVendor::Azure)
    } else if lowered.contains("google") {
        Some(CloudVendor::Gcp)
    } else {
        None
    }
}

// ============================================================================
// SECTION: Plugin
// ============================================================================

/// IMDS token header for AWS IMDSv2 sessions.
const AWS_TOKEN_TTL_HEADER: &str = "X-aws-ec2-metadata-token-ttl-seconds";

/// IMDS token header carrying an established session token.
const AWS_TOKEN_HEADER: &str = "X-aws-ec2-metadata-token";

/// AWS metadata paths fetched for the `_AWS_*` namespace.
const AWS_PATHS: [(&str, &str); 12] = [
    ("/latest/meta-data/ami-id", "_AWS_AMI_ID"),
    ("/latest/meta-data/hostname", "_AWS_HOSTNAME"),
    ("/latest/meta-data/instance-id", "_AWS_INSTANCE_ID"),
    ("/latest/meta-data/instance-type", "_AWS_INSTANCE_TYPE"),
    ("/latest/meta-data/local-hostname", "_AWS_LOCAL_HOSTNAME"),
    ("/latest/meta-data/local-ipv4", "_AWS_LOCAL_IPV4_ADDR"),
    ("/latest/meta-data/mac", "_AWS_MAC"),
    ("/latest/meta-data/placement/availability-zone", "_AWS_AZ"),
    ("/latest/meta-data/placement/region", "_AWS_REGION"),
    ("/latest/meta-data/public-hostname", "_AWS_PUBLIC_HOSTNAME"),
    ("/latest/meta-data/public-ipv4", "_AWS_PUBLIC_IPV4_ADDR"),
    ("/latest/meta-data/security-groups", "_AWS_SECURITY_GROUPS"),
];

/// Cloud instance-metadata detector.
pub struct CloudMetadataPlugin {
    /// Plugin configuration, including endpoints and limits.
    config: CloudProviderConfig,
    /// HTTP client used for metadata requests.
    client: Client,
}

impl CloudMetadataPlugin {
    /// Creates the plugin with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::Io`] when the HTTP client cannot be built.
    pub fn new(config: CloudProviderConfig) -> Result<Self, CollectError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|err| CollectError::Io(format!("http client build failed: {err}")))?;
        Ok(Self {
            config,
            client,
        })
    }
}

impl EnrichmentPlugin for CloudMetadataPlugin {
    fn name(&self) -> &'static str {
        "cloud"
    }

    fn collect(&self, ctx: &CollectContext) -> Result<EnrichmentFacts, CollectError> {
        let Ok(vendor_content) = fs::read_to_string(&self.config.vendor_file) else {
            debug!(file = %self.config.vendor_file.display(), "no vendor file, cloud probing skipped");
            return Ok(EnrichmentFacts::default());
        };
        let Some(vendor) = gate_vendor(&vendor_content) else {
            debug!("vendor not recognized, cloud probing skipped");
            return Ok(EnrichmentFacts::default());
        };

        let deadline = Instant::now() + Duration::from_millis(self.config.deadline_ms);
        let mut facts = EnrichmentFacts::default();
        match vendor {
            CloudVendor::Aws => self.collect_aws(ctx, deadline, &mut facts.report),
            CloudVendor::Azure => self.collect_azure(deadline, &mut facts.report),
            CloudVendor::Gcp => self.collect_gcp(deadline, &mut facts.report),
        }
        Ok(facts)
    }
}

// ============================================================================
// SECTION: AWS
// ============================================================================

impl CloudMetadataPlugin {
    /// Probes AWS metadata, distinguishing EC2/ECS/EKS from execution context.
    fn collect_aws(
        &self,
        ctx: &CollectContext,
        deadline: Instant,
        report: &mut BTreeMap<String, Value>,
    ) {
        let ecs_uri = ctx
            .env
            .get("ECS_CONTAINER_METADATA_URI_V4")
            .or_else(|| ctx.env.get("ECS_CONTAINER_METADATA_URI"))
            .map(str::to_string);
        let service_type = if ecs_uri.is_some() {
            "aws_ecs"
        } else if ctx.env.is_set("KUBERNETES_PORT") {
            "aws_eks"
        } else {
            "aws_ec2"
        };
        report.insert("_OP_CLOUD_PROVIDER".to_string(), Value::String("aws".to_string()));
        report.insert(
            "_OP_CLOUD_PROVIDER_SERVICE_TYPE".to_string(),
            Value::String(service_type.to_string()),
        );

        let Some(token) = self.fetch_aws_token(deadline) else {
            warn!("aws metadata token unavailable, partial metadata only");
            self.collect_aws_ecs(ecs_uri.as_deref(), deadline, report);
            return;
        };

        for (path, key) in AWS_PATHS {
            let url = format!("{}{path}", self.config.aws_base);
            if let Some(body) = self.fetch(&url, &[(AWS_TOKEN_HEADER, &token)], deadline) {
                let value = if key == "_AWS_SECURITY_GROUPS" {
                    Value::Array(body.lines().map(|line| Value::String(line.to_string())).collect())
                } else {
                    Value::String(body)
                };
                report.insert(key.to_string(), value);
            }
        }

        let identity_url =
            format!("{}/latest/dynamic/instance-identity/document", self.config.aws_base);
        let identity = self
            .fetch(&identity_url, &[(AWS_TOKEN_HEADER, &token)], deadline)
            .and_then(|body| serde_json::from_str::<Value>(&body).ok());
        if let Some(identity) = &identity {
            report.insert("_AWS_INSTANCE_IDENTITY_DOCUMENT".to_string(), identity.clone());
        }

        let tags = self.fetch_aws_tags(&token, deadline);
        if let Some(tags) = &tags {
            report.insert("_AWS_TAGS".to_string(), tags.clone());
        }

        self.collect_aws_ecs(ecs_uri.as_deref(), deadline, report);

        // Provider-agnostic summary from the identity document shape.
        if let Some(identity) = identity {
            summarize_string(report, "_OP_CLOUD_PROVIDER_ACCOUNT_INFO", &identity, "accountId");
            summarize_string(report, "_OP_CLOUD_PROVIDER_REGION", &identity, "region");
            summarize_string(report, "_OP_CLOUD_PROVIDER_INSTANCE_TYPE", &identity, "instanceType");
        }
        if let Some(Value::String(ip)) = report.get("_AWS_PUBLIC_IPV4_ADDR").cloned() {
            report.insert("_OP_CLOUD_PROVIDER_IP".to_string(), Value::String(ip));
        }
        if let Some(tags) = tags {
            report.insert("_OP_CLOUD_PROVIDER_TAGS".to_string(), tags);
        }
    }

    /// Fetches the ECS task metadata document when the task URI is present.
    fn collect_aws_ecs(
        &self,
        ecs_uri: Option<&str>,
        deadline: Instant,
        report: &mut BTreeMap<String, Value>,
    ) {
        let Some(uri) = ecs_uri else {
            return;
        };
        if let Some(body) = self.fetch(uri, &[], deadline)
            && let Ok(task) = serde_json::from_str::<Value>(&body)
        {
            report.insert("_AWS_ECS_TASK_METADATA".to_string(), task);
        }
    }

    /// Establishes an IMDSv2 token session.
    fn fetch_aws_token(&self, deadline: Instant) -> Option<String> {
        let url = format!("{}/latest/api/token", self.config.aws_base);
        self.request_with_retry(deadline, || {
            self.client.put(&url).header(AWS_TOKEN_TTL_HEADER, "21600").send()
        })
    }

    /// Enumerates instance tag keys and fetches each tag value.
    fn fetch_aws_tags(&self, token: &str, deadline: Instant) -> Option<Value> {
        let list_url = format!("{}/latest/meta-data/tags/instance", self.config.aws_base);
        let keys = self.fetch(&list_url, &[(AWS_TOKEN_HEADER, token)], deadline)?;
        let mut tags = serde_json::Map::new();
        for key in keys.lines().filter(|key| !key.is_empty()) {
            let value_url = format!("{list_url}/{key}");
            if let Some(value) = self.fetch(&value_url, &[(AWS_TOKEN_HEADER, token)], deadline) {
                tags.insert(key.to_string(), Value::String(value));
            }
        }
        (!tags.is_empty()).then_some(Value::Object(tags))
    }
}

// ============================================================================
// SECTION: Azure
// ============================================================================

impl CloudMetadataPlugin {
    /// Probes the Azure instance-metadata endpoint.
    fn collect_azure(&self, deadline: Instant, report: &mut BTreeMap<String, Value>) {
        report.insert("_OP_CLOUD_PROVIDER".to_string(), Value::String("azure".to_string()));
        let url = format!("{}/metadata/instance?api-version=2021-02-01", self.config.azure_base);
        let Some(metadata) = self
            .fetch(&url, &[("Metadata", "true")], deadline)
            .and_then(|body| serde_json::from_str::<Value>(&body).ok())
        else {
            warn!("azure metadata unavailable");
            return;
        };
        report.insert("_AZURE_INSTANCE_METADATA".to_string(), metadata.clone());

        let compute = &metadata["compute"];
        summarize_string(report, "_OP_CLOUD_PROVIDER_ACCOUNT_INFO", compute, "subscriptionId");
        summarize_string(report, "_OP_CLOUD_PROVIDER_REGION", compute, "location");
        summarize_string(report, "_OP_CLOUD_PROVIDER_INSTANCE_TYPE", compute, "vmSize");
        if let Some(tags) = compute.get("tagsList") {
            report.insert("_OP_CLOUD_PROVIDER_TAGS".to_string(), tags.clone());
        }
        let public_ip = metadata["network"]["interface"]
            .get(0)
            .and_then(|interface| interface["ipv4"]["ipAddress"].get(0))
            .and_then(|address| address.get("publicIpAddress"))
            .and_then(Value::as_str);
        if let Some(ip) = public_ip {
            report.insert("_OP_CLOUD_PROVIDER_IP".to_string(), Value::String(ip.to_string()));
        }
    }
}

// ============================================================================
// SECTION: GCP
// ============================================================================

impl CloudMetadataPlugin {
    /// Probes the GCP metadata endpoint.
    fn collect_gcp(&self, deadline: Instant, report: &mut BTreeMap<String, Value>) {
        report.insert("_OP_CLOUD_PROVIDER".to_string(), Value::String("gcp".to_string()));
        let url = format!("{}/computeMetadata/v1/instance/?recursive=true", self.config.gcp_base);
        let Some(metadata) = self
            .fetch(&url, &[("Metadata-Flavor", "Google")], deadline)
            .and_then(|body| serde_json::from_str::<Value>(&body).ok())
        else {
            warn!("gcp metadata unavailable");
            return;
        };
        report.insert("_GCP_INSTANCE_METADATA".to_string(), metadata.clone());

        if let Some(accounts) = metadata.get("serviceAccounts") {
            report.insert("_OP_CLOUD_PROVIDER_ACCOUNT_INFO".to_string(), accounts.clone());
        }
        if let Some(zone) = metadata.get("zone").and_then(Value::as_str) {
            let region = zone.rsplit('/').next().unwrap_or(zone);
            report
                .insert("_OP_CLOUD_PROVIDER_REGION".to_string(), Value::String(region.to_string()));
        }
        if let Some(machine_type) = metadata.get("machineType").and_then(Value::as_str) {
            let name = machine_type.rsplit('/').next().unwrap_or(machine_type);
            report.insert(
                "_OP_CLOUD_PROVIDER_INSTANCE_TYPE".to_string(),
                Value::String(name.to_string()),
            );
        }
        let external_ip = metadata["networkInterfaces"]
            .get(0)
            .and_then(|interface| interface["accessConfigs"].get(0))
            .and_then(|access| access.get("externalIp"))
            .and_then(Value::as_str);
        if let Some(ip) = external_ip {
            report.insert("_OP_CLOUD_PROVIDER_IP".to_string(), Value::String(ip.to_string()));
        }
    }
}

// ============================================================================
// SECTION: Bounded Fetching
// ============================================================================

impl CloudMetadataPlugin {
    /// Issues one bounded GET, retrying once with backoff within the deadline.
    fn fetch(&self, url: &str, headers: &[(&str, &str)], deadline: Instant) -> Option<String> {
        self.request_with_retry(deadline, || {
            let mut request = self.client.get(url);
            for (name, value) in headers {
                request = request.header(*name, *value);
            }
            request.send()
        })
    }

    /// Runs a request closure with one retry and a short backoff.
    fn request_with_retry(
        &self,
        deadline: Instant,
        send: impl Fn() -> reqwest::Result<reqwest::blocking::Response>,
    ) -> Option<String> {
        for attempt in 0..2 {
            if Instant::now() >= deadline {
                debug!("metadata deadline exceeded, giving up");
                return None;
            }
            match send() {
                Ok(response) if response.status().is_success() => {
                    return self.read_limited(response);
                }
                Ok(response) => {
                    debug!(status = response.status().as_u16(), "metadata fetch unsuccessful");
                    return None;
                }
                Err(err) => {
                    debug!(error = %err, attempt, "metadata fetch failed");
                }
            }
            if attempt == 0 {
                thread::sleep(Duration::from_millis(100));
            }
        }
        None
    }

    /// Reads a response body while enforcing the byte limit.
    fn read_limited(&self, response: reqwest::blocking::Response) -> Option<String> {
        let limit = u64::try_from(self.config.max_response_bytes).ok()?.saturating_add(1);
        let mut buf = Vec::new();
        let mut handle = response.take(limit);
        handle.read_to_end(&mut buf).ok()?;
        if buf.len() > self.config.max_response_bytes {
            warn!("metadata response exceeds size limit, dropped");
            return None;
        }
        String::from_utf8(buf).ok()
    }
}

// ============================================================================
// SECTION: Summary Helpers
// ============================================================================

/// Copies a string field out of a metadata document into the summary.
fn summarize_string(
    report: &mut BTreeMap<String, Value>,
    summary_key: &str,
    document: &Value,
    field: &str,
) {
    if let Some(value) = document.get(field).and_then(Value::as_str) {
        report.insert(summary_key.to_string(), Value::String(value.to_string()));
    }
}
