// crates/chalk-providers/src/lib.rs
// ============================================================================
// Module: Chalk Providers
// Description: Enrichment plugins and the ordered plugin registry.
// Purpose: Contribute CI, cloud, and ownership facts to marks and reports.
// Dependencies: chalk-core, reqwest, serde, serde_json
// ============================================================================

//! ## Overview
//! Enrichment plugins implement the [`chalk_core::EnrichmentPlugin`]
//! capability: each receives a read-only environment snapshot plus local
//! filesystem probes and returns namespaced fields, or nothing. An absent
//! signal is never an error; only genuine I/O faults surface, and the
//! registry logs and ignores those. Plugins are resolved through an ordered
//! list, never runtime reflection; on key collision the last registered
//! plugin wins.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod ci;
pub mod cloud;
pub mod owners;
pub mod registry;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use ci::CiPlugin;
pub use cloud::CloudMetadataPlugin;
pub use cloud::CloudProviderConfig;
pub use owners::CodeOwnersPlugin;
pub use registry::PluginRegistry;
