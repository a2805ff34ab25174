// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::bundle;
use crate::RelKind;

#[test]
fn default_weights_rank_passes() {
    let w = PassWeights::default();
    assert!(w.weight(Pass::Deterministic) > w.weight(Pass::Global));
    assert!(w.weight(Pass::Global) > w.weight(Pass::IntraDir));
    assert!(w.weight(Pass::IntraDir) > w.weight(Pass::IntraFile));
}

#[test]
fn record_is_idempotent_per_pass() {
    let mut b = bundle("a--x", "a--y", RelKind::Calls, vec![Pass::IntraFile, Pass::IntraDir]);
    let e = Evidence::agreeing(Pass::IntraFile, crate::Confidence::clamped(0.8));

    b.record(e);
    b.record(e);

    assert_eq!(b.collected_count(), 1);
    assert!(!b.is_complete());
}

#[test]
fn bundle_completes_when_all_passes_report() {
    let mut b = bundle("a--x", "a--y", RelKind::Calls, vec![Pass::IntraFile, Pass::IntraDir]);
    b.record(Evidence::agreeing(Pass::IntraFile, crate::Confidence::clamped(0.8)));
    b.record(Evidence::agreeing(Pass::IntraDir, crate::Confidence::clamped(0.9)));

    assert!(b.is_complete());
    assert!(b.silent_passes().is_empty());
}

#[test]
fn silent_passes_lists_missing_expectations() {
    let mut b = bundle(
        "a--x",
        "a--y",
        RelKind::Calls,
        vec![Pass::IntraFile, Pass::IntraDir, Pass::Deterministic],
    );
    b.record(Evidence::agreeing(Pass::IntraFile, crate::Confidence::clamped(0.7)));

    let silent = b.silent_passes();
    assert_eq!(silent, vec![Pass::IntraDir, Pass::Deterministic]);
}

#[test]
fn contradiction_counts_as_collected_not_silent() {
    let mut b = bundle("a--x", "a--y", RelKind::Calls, vec![Pass::IntraFile, Pass::Deterministic]);
    b.record(Evidence::agreeing(Pass::IntraFile, crate::Confidence::clamped(0.7)));
    b.record(Evidence::contradicting(Pass::Deterministic));

    assert!(b.is_complete());
    assert!(b.silent_passes().is_empty());
}

#[test]
fn evidence_serde_round_trip() {
    let e = Evidence::agreeing(Pass::Global, crate::Confidence::clamped(0.5));
    let json = serde_json::to_string(&e).unwrap();
    assert!(json.contains("\"global\""));
    let back: Evidence = serde_json::from_str(&json).unwrap();
    assert_eq!(back, e);
}
