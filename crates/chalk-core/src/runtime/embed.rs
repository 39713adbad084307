// crates/chalk-core/src/runtime/embed.rs
// ============================================================================
// Module: Chalk Embedder
// Description: Physical mark embedding, stripping, and read-back per kind.
// Purpose: Put marks into artifact bytes without corrupting the artifact.
// Dependencies: serde_json, zip
// ============================================================================

//! ## Overview
//! Non-virtual insertion rewrites artifact bytes at a format-appropriate
//! location: ELF binaries get the mark JSON appended after the final byte
//! (loaders ignore trailing bytes), scripts get a final comment line, and
//! ZIP archives get a `chalk.json` member. Stripping is the exact inverse, so
//! re-chalking an unmodified artifact reproduces the original canonical bytes
//! and therefore the same `CHALK_ID`. All on-disk writes go through a
//! temporary file in the target's directory followed by a rename.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Cursor;
use std::io::Read;
use std::io::Write;
use std::path::Path;

use zip::ZipArchive;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::core::artifact::ArtifactKind;
use crate::core::mark::ChalkMark;
use crate::interfaces::EmbedError;

// ============================================================================
// SECTION: Wire Constants
// ============================================================================

/// Archive member name holding a container's embedded mark.
pub const MARK_MEMBER_NAME: &str = "chalk.json";

/// Leading bytes of every serialized mark; the anchor for stripping and
/// read-back. Must stay in sync with the mark's field order and
/// [`crate::core::identifiers::MARK_MAGIC`].
pub(crate) const MARK_HEADER: &[u8] = b"{\"MAGIC\":\"dadfedabbadabbed\"";

// ============================================================================
// SECTION: Mark Location
// ============================================================================

/// Finds the last occurrence of a subslice.
fn rfind_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (0..=haystack.len() - needle.len())
        .rev()
        .find(|&i| &haystack[i..i + needle.len()] == needle)
}

/// Returns the canonical bytes with any embedded tail mark stripped.
///
/// Bytes without a mark come back unchanged, so strip-then-hash is stable for
/// marked and unmarked artifacts alike.
#[must_use]
pub fn strip_mark(bytes: &[u8]) -> &[u8] {
    let Some(pos) = rfind_subslice(bytes, MARK_HEADER) else {
        return bytes;
    };
    let mut cut = pos;
    if bytes[..cut].ends_with(b"# ") {
        cut -= 2;
    }
    if bytes[..cut].ends_with(b"\n") {
        cut -= 1;
    }
    &bytes[..cut]
}

/// Parses the embedded tail mark out of artifact bytes, if any.
#[must_use]
pub fn find_embedded_mark(bytes: &[u8]) -> Option<ChalkMark> {
    let pos = rfind_subslice(bytes, MARK_HEADER)?;
    let mut stream = serde_json::Deserializer::from_slice(&bytes[pos..]).into_iter::<ChalkMark>();
    match stream.next() {
        Some(Ok(mark)) if mark.has_magic() => Some(mark),
        _ => None,
    }
}

// ============================================================================
// SECTION: Embedding
// ============================================================================

/// Serializes a mark into its embedded JSON form.
///
/// # Errors
///
/// Returns [`EmbedError::Io`] when serialization fails.
pub fn render_mark(path: &Path, mark: &ChalkMark) -> Result<Vec<u8>, EmbedError> {
    serde_json::to_vec(mark).map_err(|err| EmbedError::Io {
        path: path.display().to_string(),
        cause: err.to_string(),
    })
}

/// Embeds a mark into plain (non-container) artifact bytes.
///
/// Any previous mark is stripped first, so repeated insertion replaces the
/// mark instead of stacking marks.
///
/// # Errors
///
/// Returns [`EmbedError::Unsupported`] for kinds without a physical embedding
/// strategy and [`EmbedError::Io`] when serialization fails.
pub fn embed_plain(
    path: &Path,
    kind: ArtifactKind,
    bytes: &[u8],
    mark: &ChalkMark,
) -> Result<Vec<u8>, EmbedError> {
    let json = render_mark(path, mark)?;
    let stripped = strip_mark(bytes);
    let mut out = Vec::with_capacity(stripped.len() + json.len() + 4);
    out.extend_from_slice(stripped);
    match kind {
        ArtifactKind::Elf => out.extend_from_slice(b"\n"),
        ArtifactKind::Script => out.extend_from_slice(b"\n# "),
        ArtifactKind::Zip | ArtifactKind::Unknown => {
            return Err(EmbedError::Unsupported {
                path: path.display().to_string(),
            });
        }
    }
    out.extend_from_slice(&json);
    Ok(out)
}

/// Rewrites archive bytes with a `chalk.json` mark member.
///
/// `replacements` maps member names to already-marked member bytes; members
/// not in the map are carried over unchanged. A pre-existing mark member is
/// dropped, so repeated insertion replaces the container mark.
///
/// # Errors
///
/// Returns [`EmbedError::Io`] when the archive cannot be read or rewritten.
pub fn embed_container(
    path: &Path,
    bytes: &[u8],
    mark: &ChalkMark,
    replacements: &std::collections::BTreeMap<String, Vec<u8>>,
) -> Result<Vec<u8>, EmbedError> {
    let as_embed_err = |cause: String| EmbedError::Io {
        path: path.display().to_string(),
        cause,
    };
    let json = render_mark(path, mark)?;
    let mut archive = ZipArchive::new(Cursor::new(bytes.to_vec()))
        .map_err(|err| as_embed_err(err.to_string()))?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    for index in 0..archive.len() {
        let mut member = archive.by_index(index).map_err(|err| as_embed_err(err.to_string()))?;
        if member.is_dir() || member.name() == MARK_MEMBER_NAME {
            continue;
        }
        let name = member.name().to_string();
        let mut member_bytes = Vec::new();
        member
            .read_to_end(&mut member_bytes)
            .map_err(|err| as_embed_err(err.to_string()))?;
        let out_bytes = replacements.get(&name).map_or(member_bytes.as_slice(), Vec::as_slice);
        writer.start_file(&name, options).map_err(|err| as_embed_err(err.to_string()))?;
        writer.write_all(out_bytes).map_err(|err| as_embed_err(err.to_string()))?;
    }
    writer
        .start_file(MARK_MEMBER_NAME, options)
        .map_err(|err| as_embed_err(err.to_string()))?;
    writer.write_all(&json).map_err(|err| as_embed_err(err.to_string()))?;
    let cursor = writer.finish().map_err(|err| as_embed_err(err.to_string()))?;
    Ok(cursor.into_inner())
}

// ============================================================================
// SECTION: Read-back
// ============================================================================

/// Reads the embedded mark back out of artifact bytes.
///
/// Absence of a mark is an empty result, never an error; a corrupt archive
/// likewise yields nothing here because read-back must not fail a whole run.
#[must_use]
pub fn extract_from_bytes(kind: ArtifactKind, bytes: &[u8]) -> Option<ChalkMark> {
    match kind {
        ArtifactKind::Elf | ArtifactKind::Script => find_embedded_mark(bytes),
        ArtifactKind::Zip => extract_from_container(bytes),
        ArtifactKind::Unknown => None,
    }
}

/// Reads the `chalk.json` member out of archive bytes.
fn extract_from_container(bytes: &[u8]) -> Option<ChalkMark> {
    let mut archive = ZipArchive::new(Cursor::new(bytes.to_vec())).ok()?;
    let mut member = archive.by_name(MARK_MEMBER_NAME).ok()?;
    let mut json = Vec::new();
    member.read_to_end(&mut json).ok()?;
    let mark: ChalkMark = serde_json::from_slice(&json).ok()?;
    mark.has_magic().then_some(mark)
}

// ============================================================================
// SECTION: Atomic Writes
// ============================================================================

/// Writes marked bytes atomically: temp file in the target's directory, then
/// rename over the original. Permissions are carried over so executables stay
/// executable.
///
/// # Errors
///
/// Returns [`EmbedError::Io`] when any step fails; the original artifact is
/// left untouched in that case.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), EmbedError> {
    let as_embed_err = |cause: String| EmbedError::Io {
        path: path.display().to_string(),
        cause,
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| as_embed_err("target has no file name".to_string()))?;
    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(file_name);
    tmp_name.push(".chalktmp");
    let tmp_path = path.with_file_name(tmp_name);

    let permissions = fs::metadata(path).map(|meta| meta.permissions()).ok();
    fs::write(&tmp_path, bytes).map_err(|err| as_embed_err(err.to_string()))?;
    if let Some(permissions) = permissions {
        fs::set_permissions(&tmp_path, permissions).map_err(|err| as_embed_err(err.to_string()))?;
    }
    fs::rename(&tmp_path, path).map_err(|err| {
        let _ = fs::remove_file(&tmp_path);
        as_embed_err(err.to_string())
    })
}
