// crates/chalk-core/src/core/artifact.rs
// ============================================================================
// Module: Chalk Artifact Model
// Description: Artifact kinds and classification results.
// Purpose: Describe what the classifier found at a filesystem path.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! An [`ArtifactInfo`] is the immutable result of classification: where the
//! artifact lives, what kind it is, and its canonical content hash. Unknown
//! artifacts are never chalked; container artifacts get aggregate hashes
//! computed by the walker rather than whole-file digests.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::core::hashing::HashDigest;

// ============================================================================
// SECTION: Artifact Kind
// ============================================================================

/// Artifact kinds the classifier can recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// ELF binary, detected by the `\x7fELF` header.
    Elf,
    /// Script with a leading `#!` shebang line.
    Script,
    /// ZIP-family archive, including language package archives.
    Zip,
    /// Unrecognized content; never chalked.
    Unknown,
}

impl ArtifactKind {
    /// Returns the lower-cased wire name used in `ARTIFACT_TYPE`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Elf => "elf",
            Self::Script => "script",
            Self::Zip => "zip",
            Self::Unknown => "unknown",
        }
    }

    /// Returns true when artifacts of this kind may receive a mark.
    #[must_use]
    pub const fn is_chalkable(self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Returns true when artifacts of this kind contain member artifacts.
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(self, Self::Zip)
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Artifact Info
// ============================================================================

/// Classification result for one filesystem path.
///
/// # Invariants
/// - Immutable after classification.
/// - `content_hash` is computed over canonical bytes: raw bytes with any
///   embedded mark stripped for plain artifacts, the member aggregate for
///   containers.
/// - `is_container` is implied by `kind` and carried for report consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactInfo {
    /// Filesystem location of the artifact.
    pub path: PathBuf,
    /// Detected artifact kind.
    pub kind: ArtifactKind,
    /// Canonical content hash.
    pub content_hash: HashDigest,
    /// True when the artifact is an archive with member entries.
    pub is_container: bool,
}
