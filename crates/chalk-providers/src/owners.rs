// crates/chalk-providers/src/owners.rs
// ============================================================================
// Module: Code Ownership Plugin
// Description: Resolves the ownership declaration for a scanned root.
// Purpose: Attach the verbatim CODEOWNERS text to every mark in the run.
// Dependencies: chalk-core, serde_json
// ============================================================================

//! ## Overview
//! One ownership declaration per scanned root, not per artifact: the first
//! `CODEOWNERS` file found in the conventional locations is attached
//! byte-for-byte as the mark-scoped `CODE_OWNERS` field. An absent file is an
//! absent signal; an unreadable existing file is a genuine I/O fault.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;

use chalk_core::CollectContext;
use chalk_core::CollectError;
use chalk_core::EnrichmentFacts;
use chalk_core::EnrichmentPlugin;
use serde_json::Value;

// ============================================================================
// SECTION: Plugin
// ============================================================================

/// Conventional locations searched under the scan root, in order.
const CANDIDATES: [&str; 3] = ["CODEOWNERS", ".github/CODEOWNERS", "docs/CODEOWNERS"];

/// Code-ownership resolver contributing the `CODE_OWNERS` mark field.
#[derive(Debug, Default)]
pub struct CodeOwnersPlugin;

impl EnrichmentPlugin for CodeOwnersPlugin {
    fn name(&self) -> &'static str {
        "codeowners"
    }

    fn collect(&self, ctx: &CollectContext) -> Result<EnrichmentFacts, CollectError> {
        let mut facts = EnrichmentFacts::default();
        for candidate in CANDIDATES {
            let path = ctx.scan_root.join(candidate);
            if !path.is_file() {
                continue;
            }
            let text = fs::read_to_string(&path).map_err(|err| {
                CollectError::Io(format!("cannot read {}: {err}", path.display()))
            })?;
            facts.mark.insert("CODE_OWNERS".to_string(), Value::String(text));
            break;
        }
        Ok(facts)
    }
}
