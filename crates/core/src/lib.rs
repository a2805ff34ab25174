// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! trellis-core: domain model for the trellis knowledge-graph pipeline

pub mod macros;

pub mod clock;
pub mod config;
pub mod evidence;
pub mod id;
pub mod job;
pub mod poi;
pub mod relationship;
pub mod run;
pub mod triangulate;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{
    FileConfig, GraphConfig, LlmConfig, OutboxConfig, QueueConfig, RunConfig, TrellisConfig,
    TriangulationConfig,
};
pub use evidence::{Evidence, EvidenceBundle, Pass, PassWeights};
pub use id::{short, EventId, FileId, JobId, PoiId, RunId};
pub use job::{JobPayload, JobState, QueueName, UnknownQueue};
#[cfg(any(test, feature = "test-support"))]
pub use poi::PoiBuilder;
pub use poi::{Poi, PoiKind, QualifiedName, UnknownKind};
#[cfg(any(test, feature = "test-support"))]
pub use relationship::CandidateBuilder;
pub use relationship::{
    rel_hash, Confidence, FinalRelationship, RelHash, RelKind, RelState, RelationshipCandidate,
    UnknownRelKind,
};
pub use run::{FileRecord, FileStatus, RunStatus, RunSummary};
pub use triangulate::{reconcile, Verdict};
