// crates/chalk-core/src/runtime/classifier.rs
// ============================================================================
// Module: Chalk Artifact Classifier
// Description: Magic-number artifact detection and canonical content hashing.
// Purpose: Decide what kind of artifact a path holds without trusting extensions.
// Dependencies: sha2 (via core hashing)
// ============================================================================

//! ## Overview
//! Detection precedence: ELF header first, then a leading shebang, then
//! ZIP-family magic bytes, otherwise [`ArtifactKind::Unknown`]. Extensions are
//! never consulted. Content hashes are computed over canonical bytes — raw
//! bytes with any previously embedded mark stripped — so re-chalking an
//! unmodified artifact keeps its `CHALK_ID`. Container hashes are delegated to
//! the walker's member aggregate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use crate::core::artifact::ArtifactInfo;
use crate::core::artifact::ArtifactKind;
use crate::core::hashing::hash_bytes;
use crate::interfaces::ClassifyError;
use crate::runtime::embed::strip_mark;
use crate::runtime::walker;

// ============================================================================
// SECTION: Magic Bytes
// ============================================================================

/// ELF header magic.
const ELF_MAGIC: &[u8] = b"\x7fELF";

/// Shebang prefix for script detection.
const SHEBANG: &[u8] = b"#!";

/// ZIP local-file-header magic.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// ZIP end-of-central-directory magic (empty archives start with this).
const ZIP_EMPTY_MAGIC: &[u8] = b"PK\x05\x06";

// ============================================================================
// SECTION: Classification
// ============================================================================

/// Sniffs the artifact kind from leading bytes.
#[must_use]
pub fn sniff(bytes: &[u8]) -> ArtifactKind {
    if bytes.starts_with(ELF_MAGIC) {
        ArtifactKind::Elf
    } else if bytes.starts_with(SHEBANG) {
        ArtifactKind::Script
    } else if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(ZIP_EMPTY_MAGIC) {
        ArtifactKind::Zip
    } else {
        ArtifactKind::Unknown
    }
}

/// Classifies a filesystem path into an [`ArtifactInfo`].
///
/// # Errors
///
/// Returns [`ClassifyError::Unreadable`] when the path cannot be read and
/// [`ClassifyError::MalformedContainer`] when ZIP magic was found but the
/// archive structure is invalid. Both are recoverable; callers skip the
/// artifact (or subtree) and continue with siblings.
pub fn classify(path: &Path) -> Result<ArtifactInfo, ClassifyError> {
    let bytes = fs::read(path).map_err(|err| ClassifyError::Unreadable {
        path: path.display().to_string(),
        cause: err.to_string(),
    })?;
    classify_bytes(path, &bytes)
}

/// Classifies already-read artifact bytes.
///
/// # Errors
///
/// Returns [`ClassifyError::MalformedContainer`] when ZIP magic was found but
/// the archive structure is invalid.
pub fn classify_bytes(path: &Path, bytes: &[u8]) -> Result<ArtifactInfo, ClassifyError> {
    let kind = sniff(bytes);
    let content_hash = match kind {
        ArtifactKind::Zip => walker::container_digest(path, bytes)
            .map_err(|err| ClassifyError::MalformedContainer {
                path: path.display().to_string(),
                cause: err.to_string(),
            })?
            .digest,
        ArtifactKind::Elf | ArtifactKind::Script | ArtifactKind::Unknown => {
            hash_bytes(strip_mark(bytes))
        }
    };
    Ok(ArtifactInfo {
        path: path.to_path_buf(),
        kind,
        content_hash,
        is_container: kind.is_container(),
    })
}
