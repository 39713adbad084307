// crates/chalk-core/src/core/identifiers.rs
// ============================================================================
// Module: Chalk Identifiers
// Description: Content-addressed identifiers for artifacts and insertion events.
// Purpose: Provide strongly typed identifiers with stable wire forms.
// Dependencies: serde, sha2
// ============================================================================

//! ## Overview
//! Chalk derives two identifiers per mark. `ChalkId` is a pure function of
//! artifact content: the same bytes always produce the same id, across runs
//! and hosts. `MetadataId` identifies one insertion event and folds the
//! insertion timestamp and a random nonce into the derivation, so repeated
//! insertions of identical content always differ.
//!
//! Both render as 100 bits in RFC 4648 base32, grouped `XXXXXX-XXXX-XXXX-XXXXXX`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::hashing::HashDigest;
use crate::core::hashing::digest_bytes;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Magic constant identifying the chalk mark format on the wire.
pub const MARK_MAGIC: &str = "dadfedabbadabbed";

/// Version string stamped into every mark as `CHALK_VERSION`.
pub const CHALK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// RFC 4648 base32 alphabet used for identifier rendering.
const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Dash positions for the `XXXXXX-XXXX-XXXX-XXXXXX` grouping.
const GROUP_LENGTHS: [usize; 4] = [6, 4, 4, 6];

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Stable identifier derived purely from artifact content.
///
/// # Invariants
/// - Wire form is `XXXXXX-XXXX-XXXX-XXXXXX` over the base32 alphabet.
/// - Equal content hashes always yield equal identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChalkId(String);

impl ChalkId {
    /// Derives the identifier from a content hash.
    #[must_use]
    pub fn from_content_hash(hash: &HashDigest) -> Self {
        let digest = digest_bytes(hash.as_str().as_bytes());
        Self(render_100_bits(&digest))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChalkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier unique to one insertion event.
///
/// # Invariants
/// - Wire form is `XXXXXX-XXXX-XXXX-XXXXXX` over the base32 alphabet.
/// - Derivation folds content, timestamp, and nonce; two insertions of
///   identical content differ whenever timestamp or nonce differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataId(String);

impl MetadataId {
    /// Derives the identifier for one insertion event.
    #[must_use]
    pub fn from_insertion(hash: &HashDigest, timestamp_millis: i64, nonce: [u8; 8]) -> Self {
        let mut input = Vec::with_capacity(hash.as_str().len() + 16);
        input.extend_from_slice(hash.as_str().as_bytes());
        input.extend_from_slice(&timestamp_millis.to_le_bytes());
        input.extend_from_slice(&nonce);
        let digest = digest_bytes(&input);
        Self(render_100_bits(&digest))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MetadataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders the first 100 bits of a digest as grouped base32.
fn render_100_bits(digest: &[u8; 32]) -> String {
    let mut chars = Vec::with_capacity(20);
    let mut acc: u32 = 0;
    let mut acc_bits: u32 = 0;
    for byte in digest {
        acc = (acc << 8) | u32::from(*byte);
        acc_bits += 8;
        while acc_bits >= 5 {
            acc_bits -= 5;
            let index = usize::try_from((acc >> acc_bits) & 0x1f).unwrap_or(0);
            chars.push(BASE32_ALPHABET[index]);
            if chars.len() == 20 {
                return group(&chars);
            }
        }
    }
    group(&chars)
}

/// Inserts dashes at the fixed group boundaries.
fn group(chars: &[u8]) -> String {
    let mut out = String::with_capacity(23);
    let mut offset = 0;
    for (i, len) in GROUP_LENGTHS.iter().enumerate() {
        if i > 0 {
            out.push('-');
        }
        for ch in &chars[offset..offset + len] {
            out.push(*ch as char);
        }
        offset += len;
    }
    out
}
