// crates/chalk-core/src/core/time.rs
// ============================================================================
// Module: Chalk Time Model
// Description: Insertion timestamps with epoch and RFC 3339 renderings.
// Purpose: Provide the two wall-clock fields stamped into every mark.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! The core never reads the wall clock directly; hosts supply a [`MarkTime`]
//! through the [`crate::interfaces::Clock`] seam. A `MarkTime` carries epoch
//! milliseconds and renders the matching RFC 3339 datetime with offset on
//! demand, so the two mark fields can never disagree.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Mark Time
// ============================================================================

/// Wall-clock capture for one insertion event.
///
/// # Invariants
/// - `millis` is unix epoch milliseconds.
/// - The RFC 3339 rendering is derived from `millis`; the two representations
///   always describe the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkTime {
    /// Unix epoch milliseconds.
    millis: i64,
}

impl MarkTime {
    /// Creates a mark time from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self {
            millis,
        }
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn unix_millis(self) -> i64 {
        self.millis
    }

    /// Renders the timestamp as RFC 3339 with offset.
    ///
    /// Out-of-range values fall back to the epoch rendering rather than
    /// failing mark construction.
    #[must_use]
    pub fn to_rfc3339(self) -> String {
        let nanos = i128::from(self.millis) * 1_000_000;
        OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .ok()
            .and_then(|dt| dt.format(&Rfc3339).ok())
            .unwrap_or_else(|| "1970-01-01T00:00:00Z".to_string())
    }
}
