// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use trellis_core::FileRecord;

async fn store_with_run() -> Store {
    let store = Store::in_memory().await.unwrap();
    store.create_run("run-1".into(), "/src").await.unwrap();
    store
}

#[tokio::test]
async fn create_run_rejects_duplicate_id() {
    let store = store_with_run().await;
    let err = store.create_run("run-1".into(), "/src").await.unwrap_err();
    assert!(err.to_string().contains("already exists"));
}

#[tokio::test]
async fn run_status_round_trips() {
    let store = store_with_run().await;
    assert_eq!(store.run_status("run-1".into()).await.unwrap(), Some(RunStatus::Active));

    store.set_run_status("run-1".into(), RunStatus::Completed).await.unwrap();
    assert_eq!(store.run_status("run-1".into()).await.unwrap(), Some(RunStatus::Completed));

    assert_eq!(store.run_status("run-absent".into()).await.unwrap(), None);
}

#[tokio::test]
async fn files_round_trip_with_status() {
    let store = store_with_run().await;
    let rec = FileRecord::new("run-1".into(), "/src/a.js", "hash-a");
    store.insert_files(std::slice::from_ref(&rec)).await.unwrap();

    let loaded = store.file(rec.id).await.unwrap().unwrap();
    assert_eq!(loaded.path, "/src/a.js");
    assert_eq!(loaded.status, FileStatus::Pending);

    store.set_file_status(rec.id, FileStatus::Completed).await.unwrap();
    let loaded = store.file(rec.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, FileStatus::Completed);
}

#[tokio::test]
async fn duplicate_path_in_run_is_rejected() {
    let store = store_with_run().await;
    let a = FileRecord::new("run-1".into(), "/src/a.js", "h1");
    let b = FileRecord::new("run-1".into(), "/src/a.js", "h2");
    store.insert_files(&[a]).await.unwrap();
    assert!(store.insert_files(&[b]).await.is_err());
}

#[tokio::test]
async fn count_files_with_status_filters() {
    let store = store_with_run().await;
    let a = FileRecord::new("run-1".into(), "/src/a.js", "h1");
    let b = FileRecord::new("run-1".into(), "/src/b.js", "h2");
    store.insert_files(&[a.clone(), b]).await.unwrap();
    store.set_file_status(a.id, FileStatus::Failed).await.unwrap();

    assert_eq!(store.count_files_with_status("run-1".into(), FileStatus::Pending).await.unwrap(), 1);
    assert_eq!(store.count_files_with_status("run-1".into(), FileStatus::Failed).await.unwrap(), 1);
}
