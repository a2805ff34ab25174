// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::support::{analysis_json, directory_json, Spec};
use trellis_core::{Pass, RelKind, RelState, RunStatus};

#[tokio::test]
async fn single_file_intra_file_call_commits() {
    let spec = Spec::new(|config| {
        config.triangulation.enabled_passes = vec![Pass::IntraFile];
    })
    .await;
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

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.summary.pois, 2);
    assert_eq!(outcome.summary.committed_relationships, 1);
    assert_eq!(outcome.summary.rejected_relationships, 0);
    assert_eq!(outcome.summary.dead_letters, 0);
    assert_eq!(outcome.exit_code(), 0);

    // One agreer, no disagreers: the final confidence is the raw 0.8.
    let edge = spec
        .graph
        .edge(&format!("{a}--foo"), RelKind::Calls, &format!("{a}--bar"))
        .expect("edge committed");
    assert!((edge.confidence - 0.8).abs() < 1e-9);
    assert_eq!(spec.graph.node_count(), 2);
}

#[tokio::test]
async fn import_between_two_files_commits_both_candidates() {
    let spec = Spec::new(|config| {
        config.triangulation.enabled_passes = vec![Pass::IntraFile, Pass::IntraDir];
    })
    .await;
    let a = spec.write_file("src/a.js", "export function foo() {}\n");
    let b = spec.write_file("src/b.js", "import { foo } from './a';\nexport function main() {\n  foo();\n}\n");
    let dir = std::path::Path::new(&a).parent().unwrap().display().to_string();

    let import_edge =
        (format!("{b}--b.js"), format!("{a}--a.js"), "IMPORTS".to_string(), 0.9f64);
    let call_edge = (format!("{b}--main"), format!("{a}--foo"), "CALLS".to_string(), 0.7f64);
    let rels: Vec<(&str, &str, &str, f64)> = vec![
        (&import_edge.0, &import_edge.1, &import_edge.2, import_edge.3),
        (&call_edge.0, &call_edge.1, &call_edge.2, call_edge.3),
    ];

    spec.transport.stub(
        format!("of {a}"),
        analysis_json(
            &[("File", "a.js", &format!("{a}--a.js")), ("Function", "foo", &format!("{a}--foo"))],
            &[],
        ),
    );
    spec.transport.stub(
        format!("of {b}"),
        analysis_json(
            &[("File", "b.js", &format!("{b}--b.js")), ("Function", "main", &format!("{b}--main"))],
            &rels,
        ),
    );
    spec.transport.stub(
        format!("directory {dir}"),
        directory_json(&rels, "a helper and its importer"),
    );

    let outcome = spec.run().await;

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.summary.committed_relationships, 2);
    assert_eq!(outcome.summary.pois, 4);

    // Both passes agreed with identical confidences, so the weighted mean
    // keeps each raw value.
    let import = spec
        .graph
        .edge(&format!("{b}--b.js"), RelKind::Imports, &format!("{a}--a.js"))
        .expect("import edge");
    assert!((import.confidence - 0.9).abs() < 1e-9);
    let call = spec
        .graph
        .edge(&format!("{b}--main"), RelKind::Calls, &format!("{a}--foo"))
        .expect("call edge");
    assert!((call.confidence - 0.7).abs() < 1e-9);
}

#[tokio::test]
async fn deterministic_and_directory_agreement_takes_the_weighted_mean() {
    let spec = Spec::new(|config| {
        config.triangulation.enabled_passes = vec![Pass::Deterministic, Pass::IntraDir];
    })
    .await;
    let a = spec.write_file("src/a.js", "function foo() { return 1; }\n");
    let b = spec.write_file("src/b.js", "function main() {\n  foo();\n}\n");
    let dir = std::path::Path::new(&a).parent().unwrap().display().to_string();

    spec.transport.stub(
        format!("of {a}"),
        analysis_json(&[("Function", "foo", &format!("{a}--foo"))], &[]),
    );
    spec.transport.stub(
        format!("of {b}"),
        analysis_json(&[("Function", "main", &format!("{b}--main"))], &[]),
    );
    spec.transport.stub(
        format!("directory {dir}"),
        directory_json(
            &[(&format!("{b}--main"), &format!("{a}--foo"), "CALLS", 0.8)],
            "caller and callee",
        ),
    );

    let outcome = spec.run().await;

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.summary.committed_relationships, 1);

    // deterministic 1.0 (weight 1.0) + intra-dir 0.8 (weight 0.6):
    // (1.0 + 0.48) / 1.6 = 0.925, and two agreers earn no boost.
    let edge = spec
        .graph
        .edge(&format!("{b}--main"), RelKind::Calls, &format!("{a}--foo"))
        .expect("edge");
    assert!((edge.confidence - 0.925).abs() < 1e-9);
}

#[tokio::test]
async fn silent_directory_pass_rejects_the_candidate() {
    let spec = Spec::new(|config| {
        config.triangulation.enabled_passes = vec![Pass::IntraFile, Pass::IntraDir];
        config.triangulation.grace_ms = 200;
    })
    .await;
    let a = spec.write_file("src/a.js", "function foo() {}\n");
    let b = spec.write_file("src/b.js", "function main() {\n  foo();\n}\n");
    let dir = std::path::Path::new(&a).parent().unwrap().display().to_string();

    spec.transport.stub(
        format!("of {a}"),
        analysis_json(&[("Function", "foo", &format!("{a}--foo"))], &[]),
    );
    // The file pass claims a call the directory pass does not confirm.
    spec.transport.stub(
        format!("of {b}"),
        analysis_json(
            &[("Function", "main", &format!("{b}--main"))],
            &[(&format!("{b}--main"), &format!("{a}--foo"), "CALLS", 0.7)],
        ),
    );
    spec.transport.stub(format!("directory {dir}"), directory_json(&[], "nothing cross-file"));

    let outcome = spec.run().await;

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.summary.committed_relationships, 0);
    assert_eq!(outcome.summary.rejected_relationships, 1);

    // 0.7 halved by the silent pass: 0.35, below the 0.6 threshold.
    let finals = spec.ctx.store.finals_with_state(RelState::Rejected).await.unwrap();
    assert!((finals[0].confidence.value() - 0.35).abs() < 1e-9);
    assert!(spec.graph.edge(&format!("{b}--main"), RelKind::Calls, &format!("{a}--foo")).is_none());
}

#[cfg(unix)]
#[tokio::test]
async fn traversal_attempts_never_reach_the_queue() {
    let spec = Spec::new(|config| {
        config.triangulation.enabled_passes = vec![Pass::IntraFile];
    })
    .await;
    let a = spec.write_file("src/a.js", "function foo() {}\n");

    let outside = tempfile::tempdir().unwrap();
    std::fs::write(outside.path().join("passwd"), "root:x").unwrap();
    std::os::unix::fs::symlink(outside.path().join("passwd"), spec.dir.path().join("src/evil.js"))
        .unwrap();

    spec.transport.stub(
        format!("of {a}"),
        analysis_json(&[("Function", "foo", &format!("{a}--foo"))], &[]),
    );

    let outcome = spec.run().await;

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.summary.pois, 1);

    // Only the legitimate file ever got a job.
    let file_jobs = spec
        .backend
        .jobs_snapshot()
        .into_iter()
        .filter(|j| matches!(&j.payload, trellis_core::JobPayload::FileAnalyse { file_path, .. }
            if file_path.ends_with("evil.js")))
        .count();
    assert_eq!(file_jobs, 0);
}
