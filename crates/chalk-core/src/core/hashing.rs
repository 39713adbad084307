// crates/chalk-core/src/core/hashing.rs
// ============================================================================
// Module: Chalk Content Hashing
// Description: SHA-256 content digests and RFC 8785 canonical JSON hashing.
// Purpose: Provide deterministic content identities for artifacts and containers.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Chalk identifies artifacts by SHA-256 over canonical bytes. Plain artifacts
//! hash their raw bytes (with any previously embedded mark stripped by the
//! classifier). Container artifacts hash an RFC 8785 (JCS) canonical JSON
//! aggregate of their member digests, so the recorded `HASH` of an archive is
//! deliberately never the whole-file hash of the marked archive on disk.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Hash Digest
// ============================================================================

/// Deterministic SHA-256 content digest.
///
/// # Invariants
/// - `value` is 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashDigest {
    /// Lowercase hex-encoded digest bytes.
    value: String,
}

impl HashDigest {
    /// Creates a digest from raw digest bytes.
    #[must_use]
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            value: hex_encode(bytes),
        }
    }

    /// Returns the digest as a lowercase hex string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl std::fmt::Display for HashDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.value.fmt(f)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when computing canonical hashes.
#[derive(Debug, Error)]
pub enum HashError {
    /// JSON canonicalization failed.
    #[error("failed to canonicalize json: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Hashing Helpers
// ============================================================================

/// Hashes raw bytes with SHA-256.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> HashDigest {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    HashDigest::new(&digest)
}

/// Returns the raw SHA-256 digest bytes for the input.
#[must_use]
pub fn digest_bytes(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Returns canonical JSON bytes for a serializable value using RFC 8785.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn canonical_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Hashes the canonical aggregate of container member digests.
///
/// The aggregate is the RFC 8785 canonical JSON array of
/// `[member_name, member_digest]` pairs sorted by member name. The embedded
/// mark member is the caller's responsibility to exclude.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn hash_member_aggregate(members: &[(String, HashDigest)]) -> Result<HashDigest, HashError> {
    let mut sorted: Vec<(&str, &str)> =
        members.iter().map(|(name, digest)| (name.as_str(), digest.as_str())).collect();
    sorted.sort_unstable_by(|a, b| a.0.cmp(b.0));
    let bytes = canonical_json_bytes(&sorted)?;
    Ok(hash_bytes(&bytes))
}

// ============================================================================
// SECTION: Hex Encoding
// ============================================================================

/// Encodes bytes as a lowercase hex string.
pub(crate) fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}
