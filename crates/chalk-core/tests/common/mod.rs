// crates/chalk-core/tests/common/mod.rs
// ============================================================================
// Module: Chalk Core Test Helpers
// Description: Shared fixtures for classifier, embedder, and pipeline tests.
// ============================================================================
//! ## Overview
//! Deterministic clock/entropy seams and in-memory artifact authoring used
//! across the chalk-core integration tests.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    dead_code,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::io::Write;

use chalk_core::Clock;
use chalk_core::Entropy;
use chalk_core::MarkTime;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Clock pinned to a fixed instant.
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now(&self) -> MarkTime {
        MarkTime::from_unix_millis(self.0)
    }
}

/// Entropy yielding a deterministic counter sequence.
#[derive(Default)]
pub struct SeqEntropy(pub u64);

impl Entropy for SeqEntropy {
    fn nonce(&mut self) -> [u8; 8] {
        self.0 += 1;
        self.0.to_le_bytes()
    }
}

/// Minimal bytes that sniff as an ELF binary.
pub fn elf_bytes() -> Vec<u8> {
    let mut bytes = b"\x7fELF\x02\x01\x01\x00".to_vec();
    bytes.extend_from_slice(&[0u8; 8]);
    bytes.extend_from_slice(b"not actually machine code, but enough for sniffing");
    bytes
}

/// A small shebang script.
pub fn script_bytes() -> Vec<u8> {
    b"#!/bin/sh\necho hello\n".to_vec()
}

/// Builds an in-memory ZIP archive from `(name, bytes)` members.
pub fn zip_bytes(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, bytes) in members {
        writer.start_file(*name, options).unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// An archive with zero members.
pub fn empty_zip_bytes() -> Vec<u8> {
    zip_bytes(&[])
}
