// crates/chalk-core/src/runtime/builder.rs
// ============================================================================
// Module: Chalk Mark Builder
// Description: Assembles chalk marks from identity, clock, entropy, and facts.
// Purpose: Own mark construction so nothing else decides what a mark contains.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! The builder is deterministic except for the wall clock and the nonce, both
//! injected through seams. `CHALK_ID` depends only on the artifact's content
//! hash; `METADATA_ID` folds in the timestamp and nonce so repeated insertions
//! of identical content stay distinguishable. Enrichment fields merge with
//! last-plugin-wins upstream; here any attempt to shadow a required core key
//! is dropped with a warning.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::warn;

use crate::core::artifact::ArtifactInfo;
use crate::core::hashing::hex_encode;
use crate::core::identifiers::CHALK_VERSION;
use crate::core::identifiers::ChalkId;
use crate::core::identifiers::MARK_MAGIC;
use crate::core::identifiers::MetadataId;
use crate::core::mark::ChalkMark;
use crate::interfaces::Clock;
use crate::interfaces::Entropy;

// ============================================================================
// SECTION: Mark Builder
// ============================================================================

/// Builds chalk marks; the only component allowed to construct [`ChalkMark`].
#[derive(Debug, Default)]
pub struct MarkBuilder;

impl MarkBuilder {
    /// Builds the mark for one artifact.
    #[must_use]
    pub fn build(
        info: &ArtifactInfo,
        mark_facts: &BTreeMap<String, Value>,
        clock: &dyn Clock,
        entropy: &mut dyn Entropy,
    ) -> ChalkMark {
        let now = clock.now();
        let nonce = entropy.nonce();
        let chalk_id = ChalkId::from_content_hash(&info.content_hash);
        let metadata_id =
            MetadataId::from_insertion(&info.content_hash, now.unix_millis(), nonce);

        let mut extra = BTreeMap::new();
        for (key, value) in mark_facts {
            if ChalkMark::RESERVED_KEYS.contains(&key.as_str()) {
                warn!(key = key.as_str(), "enrichment field shadows core key, dropped");
                continue;
            }
            extra.insert(key.clone(), value.clone());
        }

        ChalkMark {
            magic: MARK_MAGIC.to_string(),
            chalk_id,
            chalk_version: CHALK_VERSION.to_string(),
            hash: info.content_hash.as_str().to_string(),
            timestamp_when_chalked: now.unix_millis(),
            datetime_when_chalked: now.to_rfc3339(),
            artifact_type: info.kind.as_str().to_string(),
            chalk_rand: hex_encode(&nonce),
            metadata_id,
            extra,
        }
    }
}
