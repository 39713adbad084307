// crates/chalk-core/src/interfaces/mod.rs
// ============================================================================
// Module: Chalk Interfaces
// Description: Seams for time, entropy, and enrichment plugins, plus errors.
// Purpose: Define the contract surfaces between the runtime and its hosts.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The marking runtime is deterministic except where these seams inject the
//! outside world: [`Clock`] for wall-clock time, [`Entropy`] for nonces, and
//! [`EnrichmentPlugin`] for environment/cloud facts. Plugins receive a
//! read-only environment snapshot and local filesystem probes; a merely
//! absent signal is empty facts, never an error. Error enums here are the
//! whole per-artifact failure taxonomy — nothing in the marking pipeline is
//! fatal to an invocation except writing the final report.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

use crate::core::time::MarkTime;

// ============================================================================
// SECTION: Clock and Entropy
// ============================================================================

/// Wall-clock source for insertion timestamps.
///
/// The core never reads the system clock directly; hosts supply one of these.
pub trait Clock {
    /// Returns the current wall-clock time.
    fn now(&self) -> MarkTime;
}

/// Entropy source for per-insertion nonces.
pub trait Entropy {
    /// Returns eight fresh nonce bytes.
    ///
    /// Uniqueness across runs is unenforced by design; the nonce only has to
    /// make repeated insertions of identical content distinguishable.
    fn nonce(&mut self) -> [u8; 8];
}

// ============================================================================
// SECTION: Environment Snapshot
// ============================================================================

/// Read-only snapshot of the process environment.
///
/// # Invariants
/// - Overrides take precedence over process environment reads.
/// - The snapshot is captured once per invocation; plugins never observe
///   concurrent mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    /// Captured variables, overrides already applied.
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    /// Captures the process environment with the override map applied on top.
    #[must_use]
    pub fn from_process(overrides: &BTreeMap<String, String>) -> Self {
        let mut vars: BTreeMap<String, String> = std::env::vars().collect();
        for (key, value) in overrides {
            vars.insert(key.clone(), value.clone());
        }
        Self {
            vars,
        }
    }

    /// Builds a snapshot purely from the given map.
    #[must_use]
    pub const fn from_map(vars: BTreeMap<String, String>) -> Self {
        Self {
            vars,
        }
    }

    /// Looks up a variable.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Returns true when the variable is present and non-empty.
    #[must_use]
    pub fn is_set(&self, key: &str) -> bool {
        self.vars.get(key).is_some_and(|value| !value.is_empty())
    }
}

// ============================================================================
// SECTION: Enrichment Plugin
// ============================================================================

/// Context handed to every enrichment plugin.
#[derive(Debug, Clone)]
pub struct CollectContext {
    /// Environment snapshot with invocation overrides applied.
    pub env: EnvSnapshot,
    /// Root path being scanned this invocation.
    pub scan_root: PathBuf,
}

impl CollectContext {
    /// Creates a collection context for one invocation.
    #[must_use]
    pub fn new(env: EnvSnapshot, scan_root: &Path) -> Self {
        Self {
            env,
            scan_root: scan_root.to_path_buf(),
        }
    }
}

/// Fields contributed by one plugin, split by attachment scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichmentFacts {
    /// Fields attached to every mark produced this invocation.
    pub mark: BTreeMap<String, Value>,
    /// Fields attached once to the report envelope.
    pub report: BTreeMap<String, Value>,
}

impl EnrichmentFacts {
    /// Returns true when the plugin contributed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mark.is_empty() && self.report.is_empty()
    }

    /// Merges another fact set on top of this one, last writer wins.
    pub fn merge(&mut self, other: Self) {
        self.mark.extend(other.mark);
        self.report.extend(other.report);
    }
}

/// Errors raised by enrichment plugins.
///
/// # Invariants
/// - Absent signals are not errors; plugins return empty facts instead.
#[derive(Debug, Error)]
pub enum CollectError {
    /// Genuine I/O fault while probing a data source.
    #[error("enrichment io fault: {0}")]
    Io(String),
}

/// Ordered, namespaced enrichment data provider.
pub trait EnrichmentPlugin {
    /// Returns the stable plugin name used in logs.
    fn name(&self) -> &'static str;

    /// Collects namespaced fields for this invocation.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::Io`] only for genuine I/O faults; the registry
    /// logs and ignores those. A missing signal yields empty facts.
    fn collect(&self, ctx: &CollectContext) -> Result<EnrichmentFacts, CollectError>;
}

// ============================================================================
// SECTION: Error Taxonomy
// ============================================================================

/// Classification failures; recoverable, the artifact is skipped.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The path could not be read.
    #[error("unreadable artifact {path}: {cause}")]
    Unreadable {
        /// Path that failed to classify.
        path: String,
        /// Underlying I/O cause.
        cause: String,
    },
    /// ZIP magic was found but the archive structure is invalid.
    #[error("malformed container {path}: {cause}")]
    MalformedContainer {
        /// Path of the malformed archive.
        path: String,
        /// Underlying structural cause.
        cause: String,
    },
}

/// Structural archive failures; recoverable, the subtree is skipped.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The archive is corrupt or not actually ZIP-family.
    #[error("invalid archive {path}: {cause}")]
    InvalidArchive {
        /// Path of the offending archive.
        path: String,
        /// Underlying parse cause.
        cause: String,
    },
}

/// Physical embedding failures; hard for one artifact, siblings continue.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// Writing the marked artifact failed.
    #[error("cannot embed mark into {path}: {cause}")]
    Io {
        /// Path of the artifact that rejected the mark.
        path: String,
        /// Underlying I/O cause.
        cause: String,
    },
    /// The artifact kind has no physical embedding strategy.
    #[error("no embedding strategy for {path}")]
    Unsupported {
        /// Path of the unsupported artifact.
        path: String,
    },
}

/// Mark read-back failures.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Reading the artifact or manifest failed.
    #[error("cannot extract mark from {path}: {cause}")]
    Io {
        /// Path being extracted from.
        path: String,
        /// Underlying I/O cause.
        cause: String,
    },
}

/// Report persistence failures; the only fatal error of an invocation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serializing or writing the final report failed.
    #[error("cannot write chalk report: {0}")]
    Write(String),
}
