// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn one_summary_per_run_and_directory() {
    let store = Store::in_memory().await.unwrap();
    let first = DirectorySummary {
        run_id: "run-1".into(),
        dir_path: "/src/app".into(),
        summary_text: "http handlers".into(),
        poi_count: 4,
    };
    store.upsert_summary(&first).await.unwrap();

    let updated = DirectorySummary { summary_text: "http handlers + auth".into(), poi_count: 6, ..first };
    store.upsert_summary(&updated).await.unwrap();

    let all = store.summaries_for_run("run-1".into()).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].summary_text, "http handlers + auth");
    assert_eq!(all[0].poi_count, 6);
}

#[tokio::test]
async fn summaries_sorted_by_directory() {
    let store = Store::in_memory().await.unwrap();
    for dir in ["/src/z", "/src/a"] {
        store
            .upsert_summary(&DirectorySummary {
                run_id: "run-1".into(),
                dir_path: dir.into(),
                summary_text: String::new(),
                poi_count: 0,
            })
            .await
            .unwrap();
    }

    let all = store.summaries_for_run("run-1".into()).await.unwrap();
    let dirs: Vec<_> = all.iter().map(|s| s.dir_path.as_str()).collect();
    assert_eq!(dirs, vec!["/src/a", "/src/z"]);
}
