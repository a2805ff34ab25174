// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use trellis_core::{JobPayload, JobState};

fn groups() -> Vec<(String, Vec<(FileId, String)>)> {
    vec![
        (
            "/src/app".to_string(),
            vec![
                (FileId::new(), "/src/app/a.js".to_string()),
                (FileId::new(), "/src/app/b.js".to_string()),
            ],
        ),
        ("/src/lib".to_string(), vec![(FileId::new(), "/src/lib/c.js".to_string())]),
    ]
}

#[test]
fn root_waits_on_every_directory() {
    let tree = JobTree::build("run-1".into(), &groups(), JobOptions::default());
    assert_eq!(tree.root.state, JobState::WaitingChildren);
    assert_eq!(tree.root.pending_children, 2);
    assert!(matches!(tree.root.payload, JobPayload::GlobalResolve { .. }));
}

#[test]
fn directories_wait_on_their_files_and_link_to_the_root() {
    let tree = JobTree::build("run-1".into(), &groups(), JobOptions::default());
    let app = &tree.directories[0];
    assert_eq!(app.resolve.state, JobState::WaitingChildren);
    assert_eq!(app.resolve.pending_children, 2);
    assert_eq!(app.resolve.parent, Some(tree.root.id));

    for file in &app.files {
        assert_eq!(file.state, JobState::Waiting);
        assert_eq!(file.parent, Some(app.resolve.id));
    }
}

#[test]
fn jobs_lists_parents_before_children() {
    let tree = JobTree::build("run-1".into(), &groups(), JobOptions::default());
    let jobs = tree.jobs();
    assert_eq!(jobs.len(), 6);
    assert_eq!(jobs[0].id, tree.root.id);
    // Both directory parents precede any file child.
    let first_file_idx = jobs
        .iter()
        .position(|j| matches!(j.payload, JobPayload::FileAnalyse { .. }))
        .unwrap();
    assert_eq!(first_file_idx, 3);
    assert_eq!(tree.file_job_count(), 3);
}

#[test]
fn empty_tree_has_a_runnable_root() {
    let tree = JobTree::build("run-1".into(), &[], JobOptions::default());
    assert_eq!(tree.root.state, JobState::Waiting);
    assert_eq!(tree.jobs().len(), 1);
}
