// crates/chalk-core/src/runtime/system.rs
// ============================================================================
// Module: Chalk System Seams
// Description: Production clock and entropy implementations.
// Purpose: Supply wall-clock time and nonces outside of tests.
// Dependencies: rand
// ============================================================================

//! ## Overview
//! The runtime itself never reads the wall clock or an RNG directly; these
//! are the host-side implementations of the [`Clock`] and [`Entropy`] seams
//! used by the CLI. Tests substitute fixed implementations.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use rand::RngCore;
use rand::rngs::OsRng;

use crate::core::time::MarkTime;
use crate::interfaces::Clock;
use crate::interfaces::Entropy;

// ============================================================================
// SECTION: System Clock
// ============================================================================

/// Wall-clock backed [`Clock`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> MarkTime {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| i64::try_from(duration.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0);
        MarkTime::from_unix_millis(millis)
    }
}

// ============================================================================
// SECTION: System Entropy
// ============================================================================

/// OS-random backed [`Entropy`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemEntropy;

impl Entropy for SystemEntropy {
    fn nonce(&mut self) -> [u8; 8] {
        let mut bytes = [0u8; 8];
        OsRng.fill_bytes(&mut bytes);
        bytes
    }
}
