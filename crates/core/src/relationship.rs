// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Relationship candidates, hashes, and final scored relationships.

use crate::evidence::Pass;
use crate::poi::QualifiedName;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown relationship type: {0:?}")]
pub struct UnknownRelKind(pub String);

/// The fixed allow-list of relationship types.
///
/// These become edge types in the graph store; like [`crate::PoiKind`], the
/// enum is the injection guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelKind {
    Contains,
    Calls,
    Uses,
    Imports,
    Exports,
    Extends,
    Implements,
    Defines,
    DependsOn,
}

impl RelKind {
    pub const ALL: [RelKind; 9] = [
        RelKind::Contains,
        RelKind::Calls,
        RelKind::Uses,
        RelKind::Imports,
        RelKind::Exports,
        RelKind::Extends,
        RelKind::Implements,
        RelKind::Defines,
        RelKind::DependsOn,
    ];

    /// Graph edge type. Static strings only.
    pub fn as_type(&self) -> &'static str {
        match self {
            RelKind::Contains => "CONTAINS",
            RelKind::Calls => "CALLS",
            RelKind::Uses => "USES",
            RelKind::Imports => "IMPORTS",
            RelKind::Exports => "EXPORTS",
            RelKind::Extends => "EXTENDS",
            RelKind::Implements => "IMPLEMENTS",
            RelKind::Defines => "DEFINES",
            RelKind::DependsOn => "DEPENDS_ON",
        }
    }
}

impl std::str::FromStr for RelKind {
    type Err = UnknownRelKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RelKind::ALL
            .iter()
            .find(|k| k.as_type() == s)
            .copied()
            .ok_or_else(|| UnknownRelKind(s.to_string()))
    }
}

impl std::fmt::Display for RelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_type())
    }
}

/// A confidence score, always within `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Confidence(f64);

impl Confidence {
    pub const ZERO: Confidence = Confidence(0.0);
    pub const FULL: Confidence = Confidence(1.0);

    /// Construct, clamping into `[0, 1]`. NaN becomes zero.
    pub fn clamped(raw: f64) -> Self {
        if raw.is_nan() {
            return Self(0.0);
        }
        Self(raw.clamp(0.0, 1.0))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

/// Stable hash identifying a relationship candidate across passes.
///
/// A pure function of `(source-qn, target-qn, type)` — identical candidates
/// from different passes share a hash, which is what lets evidence
/// accumulate into one bundle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelHash(String);

impl RelHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse a stored hash. Callers are trusted to hand back values produced
    /// by [`rel_hash`].
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl std::fmt::Display for RelHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the relationship hash for `(source, target, kind)`.
pub fn rel_hash(source: &QualifiedName, target: &QualifiedName, kind: RelKind) -> RelHash {
    let mut hasher = Sha256::new();
    hasher.update(source.as_str().as_bytes());
    hasher.update(b"\x1f");
    hasher.update(target.as_str().as_bytes());
    hasher.update(b"\x1f");
    hasher.update(kind.as_type().as_bytes());
    let digest = hasher.finalize();
    RelHash(digest.iter().map(|b| format!("{b:02x}")).collect())
}

/// One pass's sighting of a relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipCandidate {
    pub source: QualifiedName,
    pub target: QualifiedName,
    pub kind: RelKind,
    pub pass: Pass,
    pub confidence: Confidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl RelationshipCandidate {
    pub fn new(
        source: QualifiedName,
        target: QualifiedName,
        kind: RelKind,
        pass: Pass,
        confidence: Confidence,
    ) -> Self {
        Self { source, target, kind, pass, confidence, explanation: None }
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    pub fn hash(&self) -> RelHash {
        rel_hash(&self.source, &self.target, self.kind)
    }
}

/// Validation outcome of a reconciled relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelState {
    Validated,
    Rejected,
}

crate::simple_display! {
    RelState {
        Validated => "validated",
        Rejected => "rejected",
    }
}

/// Output of reconciliation; consumed by the graph builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalRelationship {
    pub rel_hash: RelHash,
    pub source: QualifiedName,
    pub target: QualifiedName,
    pub kind: RelKind,
    pub confidence: Confidence,
    pub state: RelState,
    #[serde(default)]
    pub committed: bool,
}

crate::builder! {
    pub struct CandidateBuilder => RelationshipCandidate {
        into {
            source: QualifiedName = "/src/a.js--foo",
            target: QualifiedName = "/src/a.js--bar",
        }
        set {
            kind: RelKind = RelKind::Calls,
            pass: Pass = Pass::IntraFile,
            confidence: Confidence = Confidence::clamped(0.8),
        }
        option {
            explanation: String = None,
        }
    }
}

#[cfg(test)]
#[path = "relationship_tests.rs"]
mod tests;
