// crates/chalk-core/src/runtime/virtual_store.rs
// ============================================================================
// Module: Chalk Virtual Store
// Description: The out-of-band manifest mapping artifact paths to marks.
// Purpose: Record marks without touching artifact bytes in virtual mode.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Virtual insertion leaves artifacts byte-for-byte untouched and records
//! marks in `virtual-chalk.json` under the scanned root instead. The store is
//! an explicit object threaded by reference through the pipeline — never
//! ambient global state. It is created on first virtual write, merged (not
//! replaced) across insertions, flushed once at end of invocation, and never
//! written by extraction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use crate::core::mark::ChalkMark;
use crate::interfaces::EmbedError;
use crate::interfaces::ExtractError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Well-known manifest file name under the scanned root.
pub const VIRTUAL_CHALK_FILE: &str = "virtual-chalk.json";

// ============================================================================
// SECTION: Virtual Store
// ============================================================================

/// The per-root virtual mark manifest.
///
/// # Invariants
/// - Absent file on disk ⇔ no virtual marks exist under the root.
/// - Entries merge across invocations; insertion overwrites only its own
///   paths.
/// - `flush` writes only when a mark was recorded, so extraction can load the
///   store without ever creating the file.
#[derive(Debug)]
pub struct VirtualChalkFile {
    /// Manifest path under the scanned root.
    manifest_path: PathBuf,
    /// Path-keyed marks, container members keyed `<archive>!/<member>`.
    entries: BTreeMap<String, ChalkMark>,
    /// True once a mark has been recorded this invocation.
    dirty: bool,
}

impl VirtualChalkFile {
    /// Loads the manifest for a scanned root, absent file yielding an empty
    /// store.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Io`] when an existing manifest cannot be read
    /// or parsed.
    pub fn load(scan_root: &Path) -> Result<Self, ExtractError> {
        let root = if scan_root.is_dir() {
            scan_root.to_path_buf()
        } else {
            scan_root.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf)
        };
        let manifest_path = root.join(VIRTUAL_CHALK_FILE);
        let entries = if manifest_path.exists() {
            let bytes = fs::read(&manifest_path).map_err(|err| ExtractError::Io {
                path: manifest_path.display().to_string(),
                cause: err.to_string(),
            })?;
            serde_json::from_slice(&bytes).map_err(|err| ExtractError::Io {
                path: manifest_path.display().to_string(),
                cause: err.to_string(),
            })?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            manifest_path,
            entries,
            dirty: false,
        })
    }

    /// Records (or overwrites) the mark for an artifact path.
    pub fn record(&mut self, path_key: impl Into<String>, mark: ChalkMark) {
        self.entries.insert(path_key.into(), mark);
        self.dirty = true;
    }

    /// Looks up the mark recorded for an artifact path.
    #[must_use]
    pub fn get(&self, path_key: &str) -> Option<&ChalkMark> {
        self.entries.get(path_key)
    }

    /// Returns true when the manifest exists on disk or has pending entries.
    #[must_use]
    pub fn has_entries(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Flushes pending entries to disk; a no-op when nothing was recorded.
    ///
    /// # Errors
    ///
    /// Returns [`EmbedError::Io`] when the manifest cannot be written.
    pub fn flush(&mut self) -> Result<(), EmbedError> {
        if !self.dirty {
            return Ok(());
        }
        let json = serde_json::to_vec_pretty(&self.entries).map_err(|err| EmbedError::Io {
            path: self.manifest_path.display().to_string(),
            cause: err.to_string(),
        })?;
        fs::write(&self.manifest_path, json).map_err(|err| EmbedError::Io {
            path: self.manifest_path.display().to_string(),
            cause: err.to_string(),
        })?;
        self.dirty = false;
        Ok(())
    }
}
