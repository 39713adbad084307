// crates/chalk-core/src/core/report.rs
// ============================================================================
// Module: Chalk Report
// Description: Per-invocation report aggregating marks and enrichment data.
// Purpose: Model the single JSON document emitted by insert and extract runs.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every invocation emits exactly one [`ChalkReport`]. `_CHALK` preserves
//! discovery order and contains one entry per top-level artifact that was
//! actually marked (insert) or whose mark was found (extract); container
//! member marks are persisted for traceability but never appear at the top
//! level. Invocation-level enrichment fields attach once to the report
//! envelope, never per mark.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::mark::ChalkMark;

// ============================================================================
// SECTION: Operation
// ============================================================================

/// The two logical operations a report can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChalkOperation {
    /// Marks were inserted (physically or virtually).
    Insert,
    /// Previously inserted marks were read back.
    Extract,
}

impl ChalkOperation {
    /// Returns the wire name for `_OPERATION`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Extract => "extract",
        }
    }
}

// ============================================================================
// SECTION: Report Entries
// ============================================================================

/// One `_CHALK` entry: a produced mark or a per-artifact failure record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportEntry {
    /// A mark produced or recovered this run, with its artifact path.
    Mark {
        /// Filesystem path the mark applies to.
        #[serde(rename = "_OP_ARTIFACT_PATH")]
        path: String,
        /// The mark itself, flattened into the entry.
        #[serde(flatten)]
        mark: ChalkMark,
    },
    /// A per-artifact hard failure that did not abort the invocation.
    Failure {
        /// Filesystem path of the failed artifact.
        #[serde(rename = "_OP_ARTIFACT_PATH")]
        path: String,
        /// Human-readable failure description.
        #[serde(rename = "_OP_ERROR")]
        error: String,
    },
}

impl ReportEntry {
    /// Creates a mark entry for the given artifact path.
    #[must_use]
    pub fn mark(path: &Path, mark: ChalkMark) -> Self {
        Self::Mark {
            path: path.display().to_string(),
            mark,
        }
    }

    /// Creates a failure entry for the given artifact path.
    #[must_use]
    pub fn failure(path: &Path, error: impl Into<String>) -> Self {
        Self::Failure {
            path: path.display().to_string(),
            error: error.into(),
        }
    }

    /// Returns the mark when the entry carries one.
    #[must_use]
    pub const fn as_mark(&self) -> Option<&ChalkMark> {
        match self {
            Self::Mark {
                mark, ..
            } => Some(mark),
            Self::Failure {
                ..
            } => None,
        }
    }
}

// ============================================================================
// SECTION: Chalk Report
// ============================================================================

/// The per-invocation output document.
///
/// # Invariants
/// - `_CHALK` preserves discovery order (root-first, container members
///   excluded from the top level).
/// - Invocation-level enrichment fields appear exactly once regardless of
///   artifact count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChalkReport {
    /// Operation that produced this report.
    #[serde(rename = "_OPERATION")]
    pub operation: ChalkOperation,
    /// Ordered mark and failure entries for top-level artifacts.
    #[serde(rename = "_CHALK")]
    pub chalks: Vec<ReportEntry>,
    /// Invocation-level enrichment fields.
    #[serde(flatten)]
    pub host: BTreeMap<String, Value>,
}

impl ChalkReport {
    /// Creates an empty report for the given operation.
    #[must_use]
    pub const fn new(operation: ChalkOperation) -> Self {
        Self {
            operation,
            chalks: Vec::new(),
            host: BTreeMap::new(),
        }
    }

    /// Returns the number of entries that are hard failures.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.chalks
            .iter()
            .filter(|entry| {
                matches!(
                    entry,
                    ReportEntry::Failure {
                        ..
                    }
                )
            })
            .count()
    }
}
