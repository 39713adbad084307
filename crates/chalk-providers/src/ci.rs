// crates/chalk-providers/src/ci.rs
// ============================================================================
// Module: CI Build-Provenance Plugin
// Description: Detects the hosting CI system and derives BUILD_* facts.
// Purpose: Attach build provenance to the invocation report.
// Dependencies: chalk-core, serde_json
// ============================================================================

//! ## Overview
//! CI vendors are keyed off their well-known environment variables; the first
//! matching vendor wins and no merging happens across vendors. All fields are
//! report-scoped: build provenance describes the invocation, not a single
//! artifact. Missing individual variables simply omit that field.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use chalk_core::CollectContext;
use chalk_core::CollectError;
use chalk_core::EnrichmentFacts;
use chalk_core::EnrichmentPlugin;
use chalk_core::EnvSnapshot;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Plugin
// ============================================================================

/// CI system detector contributing `BUILD_*` report fields.
#[derive(Debug, Default)]
pub struct CiPlugin;

impl EnrichmentPlugin for CiPlugin {
    fn name(&self) -> &'static str {
        "ci"
    }

    fn collect(&self, ctx: &CollectContext) -> Result<EnrichmentFacts, CollectError> {
        let mut facts = EnrichmentFacts::default();
        if ctx.env.is_set("GITHUB_SHA") || ctx.env.is_set("GITHUB_RUN_ID") {
            facts.report = github_fields(&ctx.env);
        } else if ctx.env.is_set("GITLAB_CI") {
            facts.report = gitlab_fields(&ctx.env);
        }
        Ok(facts)
    }
}

// ============================================================================
// SECTION: Vendor Mappings
// ============================================================================

/// Derives `BUILD_*` fields from GitHub Actions variables.
fn github_fields(env: &EnvSnapshot) -> BTreeMap<String, Value> {
    let mut fields = BTreeMap::new();
    put_string(&mut fields, "BUILD_ID", env.get("GITHUB_RUN_ID"));
    put_string(&mut fields, "BUILD_TRIGGER", env.get("GITHUB_REF_TYPE"));
    if let Some(actor) = env.get("GITHUB_ACTOR") {
        fields.insert("BUILD_CONTACT".to_string(), json!([actor]));
    }
    if let (Some(server), Some(repository), Some(run_id)) =
        (env.get("GITHUB_SERVER_URL"), env.get("GITHUB_REPOSITORY"), env.get("GITHUB_RUN_ID"))
    {
        fields.insert(
            "BUILD_URI".to_string(),
            Value::String(format!("{server}/{repository}/actions/runs/{run_id}")),
        );
    }
    put_string(&mut fields, "BUILD_API_URI", env.get("GITHUB_API_URL"));
    fields
}

/// Derives `BUILD_*` fields from GitLab CI variables.
fn gitlab_fields(env: &EnvSnapshot) -> BTreeMap<String, Value> {
    let mut fields = BTreeMap::new();
    put_string(&mut fields, "BUILD_ID", env.get("CI_JOB_ID"));
    put_string(&mut fields, "BUILD_TRIGGER", env.get("CI_PIPELINE_SOURCE"));
    if let Some(login) = env.get("GITLAB_USER_LOGIN") {
        fields.insert("BUILD_CONTACT".to_string(), json!([login]));
    }
    put_string(&mut fields, "BUILD_URI", env.get("CI_JOB_URL"));
    put_string(&mut fields, "BUILD_API_URI", env.get("CI_API_V4_URL"));
    fields
}

/// Inserts a string field when the source variable is present.
fn put_string(fields: &mut BTreeMap<String, Value>, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        fields.insert(key.to_string(), Value::String(value.to_string()));
    }
}
