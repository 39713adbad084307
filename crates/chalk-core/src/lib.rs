// crates/chalk-core/src/lib.rs
// ============================================================================
// Module: Chalk Core
// Description: Domain model and marking runtime for the chalk provenance tool.
// Purpose: Provide artifact identity, mark construction, and insertion/extraction.
// Dependencies: serde, serde_json, serde_jcs, sha2, thiserror, time, zip
// ============================================================================

//! ## Overview
//! `chalk-core` owns the marking/extraction engine: classifying artifacts,
//! computing stable content identities, building chalk marks, embedding them
//! physically or recording them virtually, and assembling one report per
//! invocation. Enrichment data arrives through the plugin interfaces defined
//! in [`interfaces`]; the crate never probes CI systems or cloud metadata
//! itself.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use crate::core::artifact::ArtifactInfo;
pub use crate::core::artifact::ArtifactKind;
pub use crate::core::hashing::HashDigest;
pub use crate::core::hashing::canonical_json_bytes;
pub use crate::core::hashing::hash_bytes;
pub use crate::core::identifiers::CHALK_VERSION;
pub use crate::core::identifiers::ChalkId;
pub use crate::core::identifiers::MARK_MAGIC;
pub use crate::core::identifiers::MetadataId;
pub use crate::core::mark::ChalkMark;
pub use crate::core::report::ChalkOperation;
pub use crate::core::report::ChalkReport;
pub use crate::core::report::ReportEntry;
pub use crate::core::time::MarkTime;
pub use crate::interfaces::ClassifyError;
pub use crate::interfaces::Clock;
pub use crate::interfaces::CollectContext;
pub use crate::interfaces::CollectError;
pub use crate::interfaces::EmbedError;
pub use crate::interfaces::EnrichmentFacts;
pub use crate::interfaces::EnrichmentPlugin;
pub use crate::interfaces::EnvSnapshot;
pub use crate::interfaces::Entropy;
pub use crate::interfaces::ExtractError;
pub use crate::interfaces::FormatError;
pub use crate::interfaces::ReportError;
pub use crate::runtime::classifier::classify;
pub use crate::runtime::pipeline::InsertOptions;
pub use crate::runtime::pipeline::RunOutcome;
pub use crate::runtime::pipeline::run_extract;
pub use crate::runtime::pipeline::run_insert;
pub use crate::runtime::system::SystemClock;
pub use crate::runtime::system::SystemEntropy;
