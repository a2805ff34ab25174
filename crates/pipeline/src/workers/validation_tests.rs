// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::Harness;
use trellis_queue::Backend as _;
use std::time::Duration;
use trellis_core::{Confidence, Evidence, QueueName, RelKind, TriangulationConfig};
use trellis_queue::{JobHandler as _, JobOptions, QueuedJob};
use yare::parameterized;

fn qn(s: &str) -> QualifiedName {
    QualifiedName::new(s)
}

#[parameterized(
    same_file = { "/src/a.js--foo", "/src/a.js--bar", vec![Pass::IntraFile, Pass::Deterministic] },
    module_ref = { "/src/a.js--a.js", "lodash--lodash", vec![Pass::IntraFile, Pass::Deterministic] },
    same_dir = { "/src/app/a.js--foo", "/src/app/b.js--bar",
                 vec![Pass::IntraFile, Pass::IntraDir, Pass::Deterministic] },
    cross_dir = { "/src/app/a.js--foo", "/src/lib/c.js--baz", vec![Pass::Global] },
)]
fn expected_passes_follow_candidate_scope(source: &str, target: &str, expected: Vec<Pass>) {
    let config = TriangulationConfig::default();
    assert_eq!(expected_passes(&qn(source), &qn(target), &config), expected);
}

#[test]
fn disabled_passes_are_never_expected() {
    let config = TriangulationConfig {
        enabled_passes: vec![Pass::IntraFile, Pass::IntraDir, Pass::Global],
        ..TriangulationConfig::default()
    };
    assert_eq!(
        expected_passes(&qn("/a.js--x"), &qn("/a.js--y"), &config),
        vec![Pass::IntraFile]
    );
}

fn validate_job(source: &str, target: &str, pass: Pass, confidence: f64) -> QueuedJob {
    let source = qn(source);
    let target = qn(target);
    QueuedJob::new(
        JobPayload::Validate {
            rel_hash: trellis_core::rel_hash(&source, &target, RelKind::Calls),
            source,
            target,
            kind: RelKind::Calls,
            evidence: Evidence::agreeing(pass, Confidence::clamped(confidence)),
        },
        JobOptions::default(),
    )
}

#[tokio::test]
async fn incomplete_bundle_is_not_sealed() {
    let h = Harness::new().await;
    let worker = ValidationWorker::new(h.ctx.clone());

    worker
        .handle(&validate_job("/src/a.js--foo", "/src/a.js--bar", Pass::IntraFile, 0.8))
        .await
        .unwrap();

    assert_eq!(h.backend.depth(QueueName::Reconciliation).await.unwrap(), 0);
    assert_eq!(h.ctx.store.count_bundles().await.unwrap(), 1);
}

#[tokio::test]
async fn complete_bundle_seals_and_enqueues_reconciliation_once() {
    let h = Harness::new().await;
    let worker = ValidationWorker::new(h.ctx.clone());

    let first = validate_job("/src/a.js--foo", "/src/a.js--bar", Pass::IntraFile, 0.8);
    let second = validate_job("/src/a.js--foo", "/src/a.js--bar", Pass::Deterministic, 1.0);

    worker.handle(&first).await.unwrap();
    worker.handle(&second).await.unwrap();
    // A replayed delivery after sealing loses the flag and does nothing.
    worker.handle(&second).await.unwrap();

    assert_eq!(h.backend.depth(QueueName::Reconciliation).await.unwrap(), 1);

    let hash = trellis_core::rel_hash(
        &qn("/src/a.js--foo"),
        &qn("/src/a.js--bar"),
        RelKind::Calls,
    );
    let bundle = h.ctx.store.bundle(&hash).await.unwrap().unwrap();
    assert!(bundle.sealed);
}

#[tokio::test]
async fn grace_sweep_seals_stragglers_exactly_once() {
    let h = Harness::new().await;
    let worker = ValidationWorker::new(h.ctx.clone());

    // Same-directory candidate: expects intra-file + intra-dir +
    // deterministic, only intra-file arrives.
    worker
        .handle(&validate_job("/src/app/a.js--foo", "/src/app/b.js--bar", Pass::IntraFile, 0.7))
        .await
        .unwrap();
    assert_eq!(worker.sweep_grace().await.unwrap(), 0);

    h.clock.advance(Duration::from_millis(250));
    assert_eq!(worker.sweep_grace().await.unwrap(), 1);
    assert_eq!(worker.sweep_grace().await.unwrap(), 0);
    assert_eq!(h.backend.depth(QueueName::Reconciliation).await.unwrap(), 1);
}

#[tokio::test]
async fn replayed_evidence_does_not_double_count() {
    let h = Harness::new().await;
    let worker = ValidationWorker::new(h.ctx.clone());
    let job = validate_job("/src/a.js--foo", "/src/a.js--bar", Pass::IntraFile, 0.8);

    worker.handle(&job).await.unwrap();
    worker.handle(&job).await.unwrap();

    let hash = trellis_core::rel_hash(
        &qn("/src/a.js--foo"),
        &qn("/src/a.js--bar"),
        RelKind::Calls,
    );
    let bundle = h.ctx.store.bundle(&hash).await.unwrap().unwrap();
    assert_eq!(bundle.collected_count(), 1);
    assert!(!bundle.sealed);
}
