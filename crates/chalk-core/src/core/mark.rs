// crates/chalk-core/src/core/mark.rs
// ============================================================================
// Module: Chalk Mark
// Description: The persisted unit of provenance for one artifact.
// Purpose: Model the flat JSON object embedded into or recorded for artifacts.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`ChalkMark`] is one flat JSON object. The required core keys carry the
//! format magic, both identifiers, version, hash, and wall-clock fields;
//! enrichment plugins contribute additional namespaced keys through the
//! flattened extra map. Construction is owned exclusively by
//! [`crate::runtime::builder::MarkBuilder`]; nothing mutates a mark after it
//! has been handed to persistence or reporting.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::ChalkId;
use crate::core::identifiers::MARK_MAGIC;
use crate::core::identifiers::MetadataId;

// ============================================================================
// SECTION: Chalk Mark
// ============================================================================

/// The persisted provenance mark for one artifact.
///
/// # Invariants
/// - `magic` is always [`MARK_MAGIC`].
/// - `chalk_id` is a pure function of artifact content; `metadata_id` is
///   unique to one insertion event.
/// - `extra` never shadows a required core key; the builder enforces this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChalkMark {
    /// Fixed constant identifying the mark format.
    #[serde(rename = "MAGIC")]
    pub magic: String,
    /// Stable identifier derived from artifact content.
    #[serde(rename = "CHALK_ID")]
    pub chalk_id: ChalkId,
    /// Tool version that produced the mark.
    #[serde(rename = "CHALK_VERSION")]
    pub chalk_version: String,
    /// Canonical content hash recorded at insertion time.
    #[serde(rename = "HASH")]
    pub hash: String,
    /// Insertion wall-clock time as unix epoch milliseconds.
    #[serde(rename = "TIMESTAMP_WHEN_CHALKED")]
    pub timestamp_when_chalked: i64,
    /// Insertion wall-clock time as RFC 3339 with offset.
    #[serde(rename = "DATETIME_WHEN_CHALKED")]
    pub datetime_when_chalked: String,
    /// Lower-cased classifier kind.
    #[serde(rename = "ARTIFACT_TYPE")]
    pub artifact_type: String,
    /// Random per-insertion nonce as 16 lowercase hex characters.
    #[serde(rename = "CHALK_RAND")]
    pub chalk_rand: String,
    /// Identifier for this specific insertion event.
    #[serde(rename = "METADATA_ID")]
    pub metadata_id: MetadataId,
    /// Enrichment-contributed namespaced fields.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ChalkMark {
    /// Required core keys that enrichment fields may never shadow.
    pub const RESERVED_KEYS: [&'static str; 9] = [
        "MAGIC",
        "CHALK_ID",
        "CHALK_VERSION",
        "HASH",
        "TIMESTAMP_WHEN_CHALKED",
        "DATETIME_WHEN_CHALKED",
        "ARTIFACT_TYPE",
        "CHALK_RAND",
        "METADATA_ID",
    ];

    /// Returns true when the parsed object carries the chalk magic.
    #[must_use]
    pub fn has_magic(&self) -> bool {
        self.magic == MARK_MAGIC
    }
}
