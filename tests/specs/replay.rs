// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Duplicate-delivery and replay specs: at-least-once everywhere, effects
//! exactly once.

use super::support::{analysis_json, Spec};
use trellis_queue::Backend as _;
use futures_util::FutureExt;
use std::sync::Arc;
use trellis_core::{Confidence, Evidence, JobPayload, Pass, QueueName, RelKind};
use trellis_pipeline::workers::{GraphIngestionWorker, ValidationWorker};
use trellis_pipeline::OutboxPublisher;
use trellis_queue::JobHandler;

async fn completed_single_file_run(spec: &Spec) -> (String, trellis_core::RelHash) {
    let a = spec.write_file("src/a.js", "function foo() {\n  bar();\n}\nfunction bar() {}\n");
    spec.transport.stub(
        format!("of {a}"),
        analysis_json(
            &[
                ("Function", "foo", &format!("{a}--foo")),
                ("Function", "bar", &format!("{a}--bar")),
            ],
            &[(&format!("{a}--foo"), &format!("{a}--bar"), "CALLS", 0.8)],
        ),
    );
    let outcome = spec.run().await;
    assert_eq!(outcome.summary.committed_relationships, 1);

    let hash = trellis_core::rel_hash(
        &trellis_core::QualifiedName::entity(&a, "foo"),
        &trellis_core::QualifiedName::entity(&a, "bar"),
        RelKind::Calls,
    );
    (a, hash)
}

#[tokio::test]
async fn duplicate_validation_delivery_reconciles_once() {
    let spec = Spec::new(|config| {
        config.triangulation.enabled_passes = vec![Pass::IntraFile];
    })
    .await;
    let (a, hash) = completed_single_file_run(&spec).await;

    let edges_before = spec.graph.edge_count();
    let finals_before = spec.ctx.store.count_finals(trellis_core::RelState::Validated).await.unwrap();

    // The outbox republishes the same evidence event after a crash. The
    // seal flag was already won, so no second reconciliation fires.
    let worker = ValidationWorker::new(spec.ctx.clone());
    let job = trellis_queue::QueuedJob::new(
        JobPayload::Validate {
            rel_hash: hash.clone(),
            source: format!("{a}--foo").into(),
            target: format!("{a}--bar").into(),
            kind: RelKind::Calls,
            evidence: Evidence::agreeing(Pass::IntraFile, Confidence::clamped(0.8)),
        },
        trellis_queue::JobOptions::default(),
    );
    worker.handle(&job).await.unwrap();

    assert_eq!(spec.backend.depth(QueueName::Reconciliation).await.unwrap(), 0);
    assert_eq!(
        spec.ctx.store.count_finals(trellis_core::RelState::Validated).await.unwrap(),
        finals_before
    );
    assert_eq!(spec.graph.edge_count(), edges_before);
}

#[tokio::test]
async fn duplicate_graph_commit_creates_zero_duplicate_edges() {
    let spec = Spec::new(|config| {
        config.triangulation.enabled_passes = vec![Pass::IntraFile];
    })
    .await;
    let (_, hash) = completed_single_file_run(&spec).await;

    let rel = spec.ctx.store.final_relationship(&hash).await.unwrap().unwrap();
    spec.ctx
        .queues
        .enqueue(JobPayload::GraphCommit { nodes: vec![], edges: vec![rel] })
        .await
        .unwrap();

    let nodes_before = spec.graph.node_count();
    let edges_before = spec.graph.edge_count();

    let worker = GraphIngestionWorker::new(spec.ctx.clone());
    worker.drain_once().await.unwrap();

    assert_eq!(spec.graph.node_count(), nodes_before);
    assert_eq!(spec.graph.edge_count(), edges_before);
}

#[tokio::test]
async fn redraining_the_outbox_publishes_nothing_new() {
    let spec = Spec::new(|config| {
        config.triangulation.enabled_passes = vec![Pass::IntraFile];
    })
    .await;
    completed_single_file_run(&spec).await;
    assert_eq!(spec.ctx.store.count_unpublished().await.unwrap(), 0);

    // A fresh publisher instance over the same store finds nothing pending.
    let queues = Arc::clone(&spec.ctx.queues);
    let publisher = OutboxPublisher::new(
        spec.ctx.store.clone(),
        Arc::new(move |payload| {
            let queues = Arc::clone(&queues);
            async move { queues.enqueue(payload).await.map(|_| ()) }.boxed()
        }),
        spec.ctx.config.outbox.clone(),
    );
    assert_eq!(publisher.drain_once().await.unwrap(), 0);
}

#[tokio::test]
async fn rerunning_file_analysis_after_completion_is_silent() {
    let spec = Spec::new(|config| {
        config.triangulation.enabled_passes = vec![Pass::IntraFile];
    })
    .await;
    completed_single_file_run(&spec).await;

    let events_before = spec.ctx.store.count_outbox_events().await.unwrap();
    let pois_before = spec.graph.node_count();

    // Re-enqueue the file-analysis job (stalled-lease reclaim after a
    // worker death). The content hash short-circuit makes it a no-op.
    let files = spec.backend.jobs_snapshot();
    let original = files
        .iter()
        .find(|j| matches!(j.payload, JobPayload::FileAnalyse { .. }))
        .expect("file job retained");
    let replay = trellis_queue::QueuedJob::new(
        original.payload.clone(),
        trellis_queue::JobOptions::default(),
    );

    let worker = trellis_pipeline::workers::FileAnalysisWorker::new(spec.ctx.clone());
    worker.handle(&replay).await.unwrap();

    assert_eq!(spec.ctx.store.count_outbox_events().await.unwrap(), events_before);
    assert_eq!(spec.graph.node_count(), pois_before);
}
