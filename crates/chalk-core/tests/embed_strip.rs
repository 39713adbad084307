// crates/chalk-core/tests/embed_strip.rs
// ============================================================================
// Module: Embed/Strip Tests
// Description: Embedding inverse property and mark read-back parsing.
// ============================================================================
//! ## Overview
//! Stripping an embedded mark must reproduce the original canonical bytes
//! exactly, for content with and without a trailing newline, so repeated
//! insertion replaces rather than stacks marks.

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
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::collections::BTreeMap;
use std::path::Path;

use chalk_core::ArtifactInfo;
use chalk_core::ArtifactKind;
use chalk_core::ChalkMark;
use chalk_core::hash_bytes;
use chalk_core::runtime::builder::MarkBuilder;
use chalk_core::runtime::embed::embed_plain;
use chalk_core::runtime::embed::find_embedded_mark;
use chalk_core::runtime::embed::strip_mark;
use proptest::prelude::*;

use crate::common::FixedClock;
use crate::common::SeqEntropy;

/// Builds a mark for raw bytes of the given kind.
fn mark_for(bytes: &[u8], kind: ArtifactKind) -> ChalkMark {
    let info = ArtifactInfo {
        path: Path::new("mem").to_path_buf(),
        kind,
        content_hash: hash_bytes(bytes),
        is_container: false,
    };
    MarkBuilder::build(
        &info,
        &BTreeMap::new(),
        &FixedClock(1_700_000_000_000),
        &mut SeqEntropy::default(),
    )
}

#[test]
fn strip_is_identity_without_mark() {
    let bytes = b"#!/bin/sh\necho plain\n";
    assert_eq!(strip_mark(bytes), bytes);
}

#[test]
fn script_embed_then_strip_reproduces_original() {
    for original in [&b"#!/bin/sh\necho x\n"[..], &b"#!/bin/sh\necho no-trailing-newline"[..]] {
        let mark = mark_for(original, ArtifactKind::Script);
        let marked = embed_plain(Path::new("run.sh"), ArtifactKind::Script, original, &mark).unwrap();
        assert_eq!(strip_mark(&marked), original);
    }
}

#[test]
fn elf_embed_then_strip_reproduces_original() {
    let original = b"\x7fELF\x02\x01\x01\x00payload";
    let mark = mark_for(original, ArtifactKind::Elf);
    let marked = embed_plain(Path::new("app"), ArtifactKind::Elf, original, &mark).unwrap();
    assert_eq!(strip_mark(&marked), &original[..]);
}

#[test]
fn embedded_mark_parses_back() {
    let original = b"#!/bin/sh\necho x\n";
    let mark = mark_for(original, ArtifactKind::Script);
    let marked = embed_plain(Path::new("run.sh"), ArtifactKind::Script, original, &mark).unwrap();

    let found = find_embedded_mark(&marked).unwrap();
    assert_eq!(found, mark);
}

#[test]
fn unmarked_bytes_yield_no_mark() {
    assert!(find_embedded_mark(b"#!/bin/sh\necho x\n").is_none());
}

#[test]
fn reembedding_replaces_rather_than_stacks() {
    let original = b"#!/bin/sh\necho x\n";
    let first = mark_for(original, ArtifactKind::Script);
    let once = embed_plain(Path::new("run.sh"), ArtifactKind::Script, original, &first).unwrap();

    let second = mark_for(original, ArtifactKind::Script);
    let twice = embed_plain(Path::new("run.sh"), ArtifactKind::Script, &once, &second).unwrap();

    assert_eq!(strip_mark(&twice), original);
    let found = find_embedded_mark(&twice).unwrap();
    assert_eq!(found.metadata_id, second.metadata_id);
}

proptest! {
    #[test]
    fn embed_strip_roundtrips_for_arbitrary_scripts(
        body in "[ -~]{0,200}",
        trailing_newline in any::<bool>(),
    ) {
        let mut original = b"#!/bin/sh\n".to_vec();
        original.extend_from_slice(body.as_bytes());
        if trailing_newline {
            original.push(b'\n');
        }
        let mark = mark_for(&original, ArtifactKind::Script);
        let marked =
            embed_plain(Path::new("run.sh"), ArtifactKind::Script, &original, &mark).unwrap();
        prop_assert_eq!(strip_mark(&marked), original.as_slice());
    }
}
