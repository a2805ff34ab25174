// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{Confidence, RunId};
use yare::parameterized;

#[parameterized(
    file_analysis = { QueueName::FileAnalysis, "file-analysis-queue" },
    directory_resolution = { QueueName::DirectoryResolution, "directory-resolution-queue" },
    global_resolution = { QueueName::GlobalResolution, "global-resolution-queue" },
    directory_aggregation = { QueueName::DirectoryAggregation, "directory-aggregation-queue" },
    relationship_resolution = { QueueName::RelationshipResolution, "relationship-resolution-queue" },
    validation = { QueueName::Validation, "validation-queue" },
    reconciliation = { QueueName::Reconciliation, "reconciliation-queue" },
    graph_ingestion = { QueueName::GraphIngestion, "graph-ingestion-queue" },
    failed_jobs = { QueueName::FailedJobs, "failed-jobs" },
)]
fn queue_name_round_trips(queue: QueueName, s: &str) {
    assert_eq!(queue.as_str(), s);
    assert_eq!(s.parse::<QueueName>().unwrap(), queue);
}

#[test]
fn unknown_queue_name_is_rejected() {
    let err = "file-analysis-quene".parse::<QueueName>().unwrap_err();
    assert_eq!(err, UnknownQueue("file-analysis-quene".to_string()));
}

#[test]
fn only_failed_jobs_is_the_dead_letter_queue() {
    for queue in QueueName::ALL {
        assert_eq!(queue.is_dead_letter(), queue == QueueName::FailedJobs);
    }
}

#[test]
fn payload_routes_to_its_queue() {
    let run_id = RunId::from_string("run-1");
    let p = JobPayload::FileAnalyse {
        run_id,
        file_id: "fil-1".into(),
        file_path: "/tmp/a.js".into(),
    };
    assert_eq!(p.queue(), QueueName::FileAnalysis);
    assert_eq!(p.run_id(), Some(run_id));

    let p = JobPayload::Reconcile { rel_hash: crate::RelHash::from_string("ab") };
    assert_eq!(p.queue(), QueueName::Reconciliation);
    assert_eq!(p.run_id(), None);
}

#[test]
fn payload_serde_uses_tagged_format() {
    let p = JobPayload::GlobalResolve { run_id: "run-1".into() };
    let json = serde_json::to_string(&p).unwrap();
    assert!(json.contains("\"type\":\"global:resolve\""));

    let back: JobPayload = serde_json::from_str(&json).unwrap();
    assert_eq!(back, p);
}

#[test]
fn validate_payload_round_trips() {
    let p = JobPayload::Validate {
        rel_hash: crate::RelHash::from_string("deadbeef"),
        source: "/a.js--foo".into(),
        target: "/a.js--bar".into(),
        kind: crate::RelKind::Calls,
        evidence: Evidence::agreeing(crate::Pass::IntraFile, Confidence::clamped(0.8)),
    };
    let json = serde_json::to_string(&p).unwrap();
    let back: JobPayload = serde_json::from_str(&json).unwrap();
    assert_eq!(back, p);
}

#[parameterized(
    waiting = { JobState::Waiting, false },
    waiting_children = { JobState::WaitingChildren, false },
    active = { JobState::Active, false },
    delayed = { JobState::Delayed, false },
    completed = { JobState::Completed, true },
    failed = { JobState::Failed, true },
)]
fn job_state_terminality(state: JobState, terminal: bool) {
    assert_eq!(state.is_terminal(), terminal);
}
