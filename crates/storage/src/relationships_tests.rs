// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use trellis_core::{rel_hash, RelKind};

fn validated(src: &str, tgt: &str) -> FinalRelationship {
    let source = QualifiedName::new(src);
    let target = QualifiedName::new(tgt);
    FinalRelationship {
        rel_hash: rel_hash(&source, &target, RelKind::Calls),
        source,
        target,
        kind: RelKind::Calls,
        confidence: Confidence::clamped(0.9),
        state: RelState::Validated,
        committed: false,
    }
}

#[tokio::test]
async fn upsert_round_trips() {
    let store = Store::in_memory().await.unwrap();
    let rel = validated("/a--x", "/a--y");
    store.upsert_final(&rel).await.unwrap();

    let loaded = store.final_relationship(&rel.rel_hash).await.unwrap().unwrap();
    assert_eq!(loaded, rel);
}

#[tokio::test]
async fn upsert_is_idempotent() {
    let store = Store::in_memory().await.unwrap();
    let rel = validated("/a--x", "/a--y");
    store.upsert_final(&rel).await.unwrap();
    store.upsert_final(&rel).await.unwrap();

    assert_eq!(store.count_finals(RelState::Validated).await.unwrap(), 1);
}

#[tokio::test]
async fn replay_does_not_clear_committed_flag() {
    let store = Store::in_memory().await.unwrap();
    let rel = validated("/a--x", "/a--y");
    store.upsert_final(&rel).await.unwrap();
    store.mark_committed(&rel.rel_hash).await.unwrap();

    // A reconciliation retry upserts again with committed = false.
    store.upsert_final(&rel).await.unwrap();
    let loaded = store.final_relationship(&rel.rel_hash).await.unwrap().unwrap();
    assert!(loaded.committed);
}

#[tokio::test]
async fn finals_filtered_by_state() {
    let store = Store::in_memory().await.unwrap();
    let good = validated("/a--x", "/a--y");
    let mut bad = validated("/b--x", "/b--y");
    bad.state = RelState::Rejected;
    bad.confidence = Confidence::clamped(0.2);

    store.upsert_final(&good).await.unwrap();
    store.upsert_final(&bad).await.unwrap();

    assert_eq!(store.finals_with_state(RelState::Validated).await.unwrap(), vec![good]);
    assert_eq!(store.count_finals(RelState::Rejected).await.unwrap(), 1);
}
