// crates/chalk-core/src/runtime/walker.rs
// ============================================================================
// Module: Chalk Container Walker
// Description: Lazy member enumeration and aggregate hashing for ZIP artifacts.
// Purpose: Expand archives into classifiable members without unbounded recursion.
// Dependencies: zip
// ============================================================================

//! ## Overview
//! The walker turns a ZIP-family artifact into a lazy, finite, non-restartable
//! sequence of member entries, each reclassified from its bytes. Corrupt
//! archives surface a recoverable [`FormatError`] for the subtree instead of
//! hanging; nesting is bounded by [`MAX_CONTAINER_DEPTH`]. The container's
//! canonical hash is the member-digest aggregate, never the whole-file hash of
//! the archive on disk.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Cursor;
use std::io::Read;
use std::path::Path;

use zip::ZipArchive;

use crate::core::artifact::ArtifactKind;
use crate::core::hashing::HashDigest;
use crate::core::hashing::hash_bytes;
use crate::core::hashing::hash_member_aggregate;
use crate::interfaces::FormatError;
use crate::runtime::classifier::sniff;
use crate::runtime::embed::MARK_MEMBER_NAME;
use crate::runtime::embed::strip_mark;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum container nesting depth the walker will descend.
pub const MAX_CONTAINER_DEPTH: usize = 16;

// ============================================================================
// SECTION: Member Entries
// ============================================================================

/// One member of a container artifact.
#[derive(Debug, Clone)]
pub struct MemberEntry {
    /// Member name as stored in the archive.
    pub name: String,
    /// Raw member bytes as stored.
    pub bytes: Vec<u8>,
    /// Kind sniffed from the member bytes.
    pub kind: ArtifactKind,
}

/// Lazy, non-restartable walk over a container's members.
///
/// # Invariants
/// - Directory entries and the embedded mark member are skipped.
/// - The sequence is finite; each member is yielded at most once.
pub struct MemberWalk {
    /// Archive being walked, consumed index by index.
    archive: ZipArchive<Cursor<Vec<u8>>>,
    /// Next member index to yield.
    next_index: usize,
    /// Display label for error messages.
    label: String,
}

impl MemberWalk {
    /// Opens a walk over archive bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::InvalidArchive`] when the bytes are not a
    /// structurally valid ZIP archive.
    pub fn open(path: &Path, bytes: &[u8]) -> Result<Self, FormatError> {
        let archive = ZipArchive::new(Cursor::new(bytes.to_vec())).map_err(|err| {
            FormatError::InvalidArchive {
                path: path.display().to_string(),
                cause: err.to_string(),
            }
        })?;
        Ok(Self {
            archive,
            next_index: 0,
            label: path.display().to_string(),
        })
    }
}

impl Iterator for MemberWalk {
    type Item = Result<MemberEntry, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next_index < self.archive.len() {
            let index = self.next_index;
            self.next_index += 1;
            let mut member = match self.archive.by_index(index) {
                Ok(member) => member,
                Err(err) => {
                    return Some(Err(FormatError::InvalidArchive {
                        path: self.label.clone(),
                        cause: err.to_string(),
                    }));
                }
            };
            if member.is_dir() || member.name() == MARK_MEMBER_NAME {
                continue;
            }
            let name = member.name().to_string();
            let mut bytes = Vec::new();
            if let Err(err) = member.read_to_end(&mut bytes) {
                return Some(Err(FormatError::InvalidArchive {
                    path: self.label.clone(),
                    cause: err.to_string(),
                }));
            }
            let kind = sniff(&bytes);
            return Some(Ok(MemberEntry {
                name,
                bytes,
                kind,
            }));
        }
        None
    }
}

// ============================================================================
// SECTION: Container Digest
// ============================================================================

/// Aggregate digest of a container plus its member count.
#[derive(Debug, Clone)]
pub struct ContainerDigest {
    /// Canonical aggregate hash over member digests.
    pub digest: HashDigest,
    /// Number of file members, mark member excluded.
    pub member_count: usize,
}

/// Computes the canonical aggregate digest for archive bytes.
///
/// Member digests are taken over mark-stripped member bytes, so marking the
/// members (or the archive) never changes the container identity.
///
/// # Errors
///
/// Returns [`FormatError::InvalidArchive`] when the archive is corrupt.
pub fn container_digest(path: &Path, bytes: &[u8]) -> Result<ContainerDigest, FormatError> {
    let walk = MemberWalk::open(path, bytes)?;
    let mut members: Vec<(String, HashDigest)> = Vec::new();
    for entry in walk {
        let entry = entry?;
        members.push((entry.name, hash_bytes(strip_mark(&entry.bytes))));
    }
    let member_count = members.len();
    let digest =
        hash_member_aggregate(&members).map_err(|err| FormatError::InvalidArchive {
            path: path.display().to_string(),
            cause: err.to_string(),
        })?;
    Ok(ContainerDigest {
        digest,
        member_count,
    })
}
