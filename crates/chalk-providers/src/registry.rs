// crates/chalk-providers/src/registry.rs
// ============================================================================
// Module: Plugin Registry
// Description: Ordered registry for enrichment plugins.
// Purpose: Collect and merge namespaced facts with deterministic precedence.
// Dependencies: chalk-core
// ============================================================================

//! ## Overview
//! The registry holds plugins in registration order and collects them in that
//! order; a later plugin wins on key collision. Plugin I/O faults are logged
//! and ignored so a single broken probe never poisons an invocation — the
//! reserved-core-key guard lives downstream in the mark builder.

// ============================================================================
// SECTION: Imports
// ============================================================================

use chalk_core::CollectContext;
use chalk_core::EnrichmentFacts;
use chalk_core::EnrichmentPlugin;
use tracing::warn;

// ============================================================================
// SECTION: Plugin Registry
// ============================================================================

/// Ordered set of enrichment plugins.
///
/// # Invariants
/// - Collection order equals registration order.
/// - A failing plugin contributes nothing; the run continues.
#[derive(Default)]
pub struct PluginRegistry {
    /// Plugins in registration order.
    plugins: Vec<Box<dyn EnrichmentPlugin>>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a plugin; it collects after (and overrides) earlier plugins.
    pub fn register(&mut self, plugin: impl EnrichmentPlugin + 'static) {
        self.plugins.push(Box::new(plugin));
    }

    /// Returns the registered plugin names in order.
    #[must_use]
    pub fn plugin_names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|plugin| plugin.name()).collect()
    }

    /// Collects all plugins against the context and merges their facts.
    #[must_use]
    pub fn collect_all(&self, ctx: &CollectContext) -> EnrichmentFacts {
        let mut facts = EnrichmentFacts::default();
        for plugin in &self.plugins {
            match plugin.collect(ctx) {
                Ok(contribution) => facts.merge(contribution),
                Err(err) => {
                    warn!(plugin = plugin.name(), error = %err, "plugin fault ignored");
                }
            }
        }
        facts
    }
}
