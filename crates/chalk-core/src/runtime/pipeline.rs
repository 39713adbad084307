// crates/chalk-core/src/runtime/pipeline.rs
// ============================================================================
// Module: Chalk Marking Pipeline
// Description: Per-invocation orchestration of classify, mark, persist, report.
// Purpose: Run insert/extract over a scan root with per-artifact failure isolation.
// Dependencies: serde_json, zip (via walker/embed)
// ============================================================================

//! ## Overview
//! The pipeline discovers artifacts under a scan root in deterministic order,
//! classifies and hashes each, builds marks, and persists them either
//! physically (embedder) or virtually (manifest). Exactly one report is
//! produced per invocation; per-artifact failures become report entries and
//! an exit-status count, never an abort. The virtual manifest and the report
//! accumulator are owned here and threaded by `&mut` — the exclusive-access
//! discipline that keeps classification and hashing safely parallelizable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;
use tracing::warn;

use crate::core::artifact::ArtifactInfo;
use crate::core::artifact::ArtifactKind;
use crate::core::hashing::hash_bytes;
use crate::core::mark::ChalkMark;
use crate::core::report::ChalkOperation;
use crate::core::report::ChalkReport;
use crate::core::report::ReportEntry;
use crate::interfaces::Clock;
use crate::interfaces::EmbedError;
use crate::interfaces::EnrichmentFacts;
use crate::interfaces::Entropy;
use crate::interfaces::FormatError;
use crate::runtime::builder::MarkBuilder;
use crate::runtime::classifier::sniff;
use crate::runtime::embed::atomic_write;
use crate::runtime::embed::embed_container;
use crate::runtime::embed::embed_plain;
use crate::runtime::embed::extract_from_bytes;
use crate::runtime::embed::strip_mark;
use crate::runtime::virtual_store::VIRTUAL_CHALK_FILE;
use crate::runtime::virtual_store::VirtualChalkFile;
use crate::runtime::walker::MAX_CONTAINER_DEPTH;
use crate::runtime::walker::MemberWalk;
use crate::runtime::walker::container_digest;

// ============================================================================
// SECTION: Options and Outcome
// ============================================================================

/// Insertion options for one invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct InsertOptions {
    /// Record marks in the virtual manifest instead of embedding them.
    pub virtual_mode: bool,
}

/// Result of one pipeline run.
#[derive(Debug)]
pub struct RunOutcome {
    /// The single report for this invocation.
    pub report: ChalkReport,
    /// Number of hard per-artifact failures; non-zero maps to a non-zero
    /// process exit.
    pub hard_failures: usize,
}

// ============================================================================
// SECTION: Container Marking Errors
// ============================================================================

/// Distinguishes skip-the-subtree from fail-the-artifact while marking a
/// container.
enum ContainerError {
    /// Structurally invalid archive; subtree is skipped silently.
    Format(FormatError),
    /// Archive was valid but the rewrite failed; hard failure for the
    /// artifact.
    Embed(EmbedError),
}

// ============================================================================
// SECTION: Discovery
// ============================================================================

/// Discovers candidate files under the scan root in deterministic order.
///
/// Directories are walked breadth-first with name-sorted entries; the virtual
/// manifest itself is never a candidate.
fn discover(scan_root: &Path) -> Vec<PathBuf> {
    if scan_root.is_file() {
        return vec![scan_root.to_path_buf()];
    }
    let mut files = Vec::new();
    let mut dirs = VecDeque::new();
    dirs.push_back(scan_root.to_path_buf());
    while let Some(dir) = dirs.pop_front() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "cannot read directory, skipping");
                continue;
            }
        };
        let mut paths: Vec<PathBuf> = entries.filter_map(Result::ok).map(|e| e.path()).collect();
        paths.sort();
        for path in paths {
            if path.is_dir() {
                dirs.push_back(path);
            } else if path.file_name().is_none_or(|name| name != VIRTUAL_CHALK_FILE) {
                files.push(path);
            }
        }
    }
    files
}

// ============================================================================
// SECTION: Insert
// ============================================================================

/// Runs the insert operation over a scan root.
///
/// Enrichment facts are collected by the caller before the run; mark-scoped
/// facts attach to every produced mark, report-scoped facts attach once to
/// the report envelope.
#[must_use]
pub fn run_insert(
    scan_root: &Path,
    options: InsertOptions,
    facts: &EnrichmentFacts,
    clock: &dyn Clock,
    entropy: &mut dyn Entropy,
) -> RunOutcome {
    let mut report = ChalkReport::new(ChalkOperation::Insert);
    report.host.clone_from(&facts.report);
    let mut hard_failures = 0usize;

    let mut store = if options.virtual_mode {
        match VirtualChalkFile::load(scan_root) {
            Ok(store) => Some(store),
            Err(err) => {
                warn!(error = %err, "virtual manifest unreadable, starting empty");
                hard_failures += 1;
                None
            }
        }
    } else {
        None
    };

    for path in discover(scan_root) {
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "unreadable artifact, skipping");
                continue;
            }
        };
        let kind = sniff(&bytes);
        if !kind.is_chalkable() {
            debug!(path = %path.display(), "unrecognized artifact, not chalked");
            continue;
        }
        match kind {
            ArtifactKind::Zip => insert_container(
                &path,
                &bytes,
                facts,
                clock,
                entropy,
                store.as_mut(),
                &mut report,
                &mut hard_failures,
            ),
            ArtifactKind::Elf | ArtifactKind::Script => insert_plain(
                &path,
                kind,
                &bytes,
                facts,
                clock,
                entropy,
                store.as_mut(),
                &mut report,
                &mut hard_failures,
            ),
            ArtifactKind::Unknown => {}
        }
    }

    if let Some(store) = store.as_mut()
        && let Err(err) = store.flush()
    {
        warn!(error = %err, "cannot flush virtual manifest");
        hard_failures += 1;
    }

    RunOutcome {
        report,
        hard_failures,
    }
}

/// Inserts a mark into one plain (non-container) artifact.
#[allow(clippy::too_many_arguments, reason = "Pipeline state is threaded explicitly by design.")]
fn insert_plain(
    path: &Path,
    kind: ArtifactKind,
    bytes: &[u8],
    facts: &EnrichmentFacts,
    clock: &dyn Clock,
    entropy: &mut dyn Entropy,
    store: Option<&mut VirtualChalkFile>,
    report: &mut ChalkReport,
    hard_failures: &mut usize,
) {
    let info = ArtifactInfo {
        path: path.to_path_buf(),
        kind,
        content_hash: hash_bytes(strip_mark(bytes)),
        is_container: false,
    };
    let mark = MarkBuilder::build(&info, &facts.mark, clock, entropy);
    if let Some(store) = store {
        store.record(path.display().to_string(), mark.clone());
        report.chalks.push(ReportEntry::mark(path, mark));
        return;
    }
    match embed_plain(path, kind, bytes, &mark).and_then(|marked| atomic_write(path, &marked)) {
        Ok(()) => report.chalks.push(ReportEntry::mark(path, mark)),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "embedding failed");
            report.chalks.push(ReportEntry::failure(path, err.to_string()));
            *hard_failures += 1;
        }
    }
}

/// Inserts a container-level mark (and member marks) for one archive.
#[allow(clippy::too_many_arguments, reason = "Pipeline state is threaded explicitly by design.")]
fn insert_container(
    path: &Path,
    bytes: &[u8],
    facts: &EnrichmentFacts,
    clock: &dyn Clock,
    entropy: &mut dyn Entropy,
    store: Option<&mut VirtualChalkFile>,
    report: &mut ChalkReport,
    hard_failures: &mut usize,
) {
    if let Some(store) = store {
        let digest = match container_digest(path, bytes) {
            Ok(digest) => digest,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "malformed archive, subtree skipped");
                return;
            }
        };
        if digest.member_count == 0 {
            debug!(path = %path.display(), "empty archive, not chalked");
            return;
        }
        let info = ArtifactInfo {
            path: path.to_path_buf(),
            kind: ArtifactKind::Zip,
            content_hash: digest.digest,
            is_container: true,
        };
        let mark = MarkBuilder::build(&info, &facts.mark, clock, entropy);
        store.record(path.display().to_string(), mark.clone());
        if let Err(err) = record_members_virtual(store, path, bytes, facts, clock, entropy, 1) {
            warn!(path = %path.display(), error = %err, "member recording incomplete");
        }
        report.chalks.push(ReportEntry::mark(path, mark));
        return;
    }

    match mark_container_bytes(path, bytes, facts, clock, entropy, 0) {
        Ok(Some((mark, marked_bytes))) => match atomic_write(path, &marked_bytes) {
            Ok(()) => report.chalks.push(ReportEntry::mark(path, mark)),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "embedding failed");
                report.chalks.push(ReportEntry::failure(path, err.to_string()));
                *hard_failures += 1;
            }
        },
        Ok(None) => debug!(path = %path.display(), "empty archive, not chalked"),
        Err(ContainerError::Format(err)) => {
            warn!(path = %path.display(), error = %err, "malformed archive, subtree skipped");
        }
        Err(ContainerError::Embed(err)) => {
            warn!(path = %path.display(), error = %err, "embedding failed");
            report.chalks.push(ReportEntry::failure(path, err.to_string()));
            *hard_failures += 1;
        }
    }
}

/// Builds the marked bytes for an archive, recursing into chalkable members.
///
/// Returns `Ok(None)` for an empty archive, which is never chalked.
fn mark_container_bytes(
    label: &Path,
    bytes: &[u8],
    facts: &EnrichmentFacts,
    clock: &dyn Clock,
    entropy: &mut dyn Entropy,
    depth: usize,
) -> Result<Option<(ChalkMark, Vec<u8>)>, ContainerError> {
    let digest = container_digest(label, bytes).map_err(ContainerError::Format)?;
    if digest.member_count == 0 {
        return Ok(None);
    }
    let info = ArtifactInfo {
        path: label.to_path_buf(),
        kind: ArtifactKind::Zip,
        content_hash: digest.digest,
        is_container: true,
    };
    let mark = MarkBuilder::build(&info, &facts.mark, clock, entropy);
    let replacements =
        member_replacements(label, bytes, facts, clock, entropy, depth).map_err(ContainerError::Format)?;
    let marked = embed_container(label, bytes, &mark, &replacements).map_err(ContainerError::Embed)?;
    Ok(Some((mark, marked)))
}

/// Marks chalkable members of an archive, returning replacement bytes per
/// member name. Member-level failures degrade to warnings; the container mark
/// still lands.
fn member_replacements(
    label: &Path,
    bytes: &[u8],
    facts: &EnrichmentFacts,
    clock: &dyn Clock,
    entropy: &mut dyn Entropy,
    depth: usize,
) -> Result<BTreeMap<String, Vec<u8>>, FormatError> {
    let mut replacements = BTreeMap::new();
    if depth >= MAX_CONTAINER_DEPTH {
        warn!(path = %label.display(), "container nesting limit reached, members left unmarked");
        return Ok(replacements);
    }
    for entry in MemberWalk::open(label, bytes)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(path = %label.display(), error = %err, "unreadable member, skipping");
                continue;
            }
        };
        let member_label = member_key(label, &entry.name);
        match entry.kind {
            ArtifactKind::Elf | ArtifactKind::Script => {
                let info = ArtifactInfo {
                    path: member_label.clone(),
                    kind: entry.kind,
                    content_hash: hash_bytes(strip_mark(&entry.bytes)),
                    is_container: false,
                };
                let mark = MarkBuilder::build(&info, &facts.mark, clock, entropy);
                match embed_plain(&member_label, entry.kind, &entry.bytes, &mark) {
                    Ok(marked) => {
                        replacements.insert(entry.name, marked);
                    }
                    Err(err) => {
                        warn!(member = %member_label.display(), error = %err, "member left unmarked");
                    }
                }
            }
            ArtifactKind::Zip => {
                match mark_container_bytes(&member_label, &entry.bytes, facts, clock, entropy, depth + 1)
                {
                    Ok(Some((_, marked))) => {
                        replacements.insert(entry.name, marked);
                    }
                    Ok(None) => {}
                    Err(ContainerError::Format(_) | ContainerError::Embed(_)) => {
                        warn!(member = %member_label.display(), "nested archive left unmarked");
                    }
                }
            }
            ArtifactKind::Unknown => {}
        }
    }
    Ok(replacements)
}

/// Records member marks in the virtual manifest, keyed `<archive>!/<member>`.
fn record_members_virtual(
    store: &mut VirtualChalkFile,
    label: &Path,
    bytes: &[u8],
    facts: &EnrichmentFacts,
    clock: &dyn Clock,
    entropy: &mut dyn Entropy,
    depth: usize,
) -> Result<(), FormatError> {
    if depth >= MAX_CONTAINER_DEPTH {
        warn!(path = %label.display(), "container nesting limit reached, members left unrecorded");
        return Ok(());
    }
    for entry in MemberWalk::open(label, bytes)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(path = %label.display(), error = %err, "unreadable member, skipping");
                continue;
            }
        };
        let member_label = member_key(label, &entry.name);
        match entry.kind {
            ArtifactKind::Elf | ArtifactKind::Script => {
                let info = ArtifactInfo {
                    path: member_label.clone(),
                    kind: entry.kind,
                    content_hash: hash_bytes(strip_mark(&entry.bytes)),
                    is_container: false,
                };
                let mark = MarkBuilder::build(&info, &facts.mark, clock, entropy);
                store.record(member_label.display().to_string(), mark);
            }
            ArtifactKind::Zip => match container_digest(&member_label, &entry.bytes) {
                Ok(digest) if digest.member_count > 0 => {
                    let info = ArtifactInfo {
                        path: member_label.clone(),
                        kind: ArtifactKind::Zip,
                        content_hash: digest.digest,
                        is_container: true,
                    };
                    let mark = MarkBuilder::build(&info, &facts.mark, clock, entropy);
                    store.record(member_label.display().to_string(), mark);
                    if let Err(err) = record_members_virtual(
                        store,
                        &member_label,
                        &entry.bytes,
                        facts,
                        clock,
                        entropy,
                        depth + 1,
                    ) {
                        warn!(member = %member_label.display(), error = %err, "nested members unrecorded");
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(member = %member_label.display(), error = %err, "nested archive skipped");
                }
            },
            ArtifactKind::Unknown => {}
        }
    }
    Ok(())
}

/// Builds the manifest key label for a container member.
fn member_key(archive: &Path, member_name: &str) -> PathBuf {
    PathBuf::from(format!("{}!/{member_name}", archive.display()))
}

// ============================================================================
// SECTION: Extract
// ============================================================================

/// Runs the extract operation over a scan root.
///
/// Embedded marks win; the virtual manifest is the fallback. Absence of a
/// mark, the manifest, or a manifest entry yields no entry rather than an
/// error, and nothing on disk is ever mutated.
#[must_use]
pub fn run_extract(scan_root: &Path, facts: &EnrichmentFacts) -> RunOutcome {
    let mut report = ChalkReport::new(ChalkOperation::Extract);
    report.host.clone_from(&facts.report);

    let store = match VirtualChalkFile::load(scan_root) {
        Ok(store) => Some(store),
        Err(err) => {
            warn!(error = %err, "virtual manifest unreadable, treated as absent");
            None
        }
    };

    for path in discover(scan_root) {
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "unreadable artifact, skipping");
                continue;
            }
        };
        let kind = sniff(&bytes);
        if !kind.is_chalkable() {
            continue;
        }
        if let Some(mark) = extract_from_bytes(kind, &bytes) {
            report.chalks.push(ReportEntry::mark(&path, mark));
        } else if let Some(mark) =
            store.as_ref().and_then(|store| store.get(&path.display().to_string()))
        {
            report.chalks.push(ReportEntry::mark(&path, mark.clone()));
        }
    }

    RunOutcome {
        report,
        hard_failures: 0,
    }
}
