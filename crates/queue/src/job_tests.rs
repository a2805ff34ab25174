// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use trellis_core::RunId;

fn payload() -> JobPayload {
    JobPayload::GlobalResolve { run_id: RunId::from_string("run-1") }
}

#[test]
fn new_job_is_waiting_on_its_payload_queue() {
    let job = QueuedJob::new(payload(), JobOptions::default());
    assert_eq!(job.state, JobState::Waiting);
    assert_eq!(job.queue, QueueName::GlobalResolution);
    assert_eq!(job.attempts_made, 0);
    assert!(job.parent.is_none());
}

#[test]
fn parent_with_children_waits_for_them() {
    let job = QueuedJob::new_parent(payload(), JobOptions::default(), 3);
    assert_eq!(job.state, JobState::WaitingChildren);
    assert_eq!(job.pending_children, 3);
}

#[test]
fn parent_with_no_children_is_immediately_runnable() {
    let job = QueuedJob::new_parent(payload(), JobOptions::default(), 0);
    assert_eq!(job.state, JobState::Waiting);
}

#[test]
fn attempts_exhausted_after_the_configured_count() {
    let mut job = QueuedJob::new(payload(), JobOptions::default().with_attempts(2));
    assert!(!job.attempts_exhausted());
    job.attempts_made = 2;
    assert!(job.attempts_exhausted());
}

#[test]
fn envelope_serde_round_trips() {
    let job = QueuedJob::new(payload(), JobOptions::default()).with_parent("job-parent".into());
    let json = serde_json::to_string(&job).unwrap();
    let back: QueuedJob = serde_json::from_str(&json).unwrap();
    assert_eq!(back, job);
}
