// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Evidence accumulation for relationship candidates.

use crate::poi::QualifiedName;
use crate::relationship::{Confidence, RelHash, RelKind};
use serde::{Deserialize, Serialize};

/// One evidence-generating stage of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    Deterministic,
    IntraFile,
    IntraDir,
    Global,
}

impl Pass {
    pub const ALL: [Pass; 4] = [Pass::Deterministic, Pass::IntraFile, Pass::IntraDir, Pass::Global];
}

crate::simple_display! {
    Pass {
        Deterministic => "deterministic",
        IntraFile => "intra_file",
        IntraDir => "intra_dir",
        Global => "global",
    }
}

/// Per-pass weights for the initial weighted mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PassWeights {
    pub deterministic: f64,
    pub global: f64,
    pub intra_dir: f64,
    pub intra_file: f64,
}

impl Default for PassWeights {
    fn default() -> Self {
        Self { deterministic: 1.0, global: 0.8, intra_dir: 0.6, intra_file: 0.4 }
    }
}

impl PassWeights {
    pub fn weight(&self, pass: Pass) -> f64 {
        match pass {
            Pass::Deterministic => self.deterministic,
            Pass::Global => self.global,
            Pass::IntraDir => self.intra_dir,
            Pass::IntraFile => self.intra_file,
        }
    }
}

/// A single pass's contribution for one relationship hash.
///
/// `agrees = false` records an explicit contradiction (the pass looked and
/// found the relationship absent). Passes that were expected but never
/// reported at all are synthesized as disagreers at reconciliation time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub pass: Pass,
    pub confidence: Confidence,
    pub agrees: bool,
}

impl Evidence {
    pub fn agreeing(pass: Pass, confidence: Confidence) -> Self {
        Self { pass, confidence, agrees: true }
    }

    pub fn contradicting(pass: Pass) -> Self {
        Self { pass, confidence: Confidence::ZERO, agrees: false }
    }
}

/// Accumulator for one rel-hash awaiting reconciliation.
///
/// Created on first evidence; sealed when the collected count reaches the
/// expected count or the grace timeout expires; deleted after
/// reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceBundle {
    pub rel_hash: RelHash,
    pub source: QualifiedName,
    pub target: QualifiedName,
    pub kind: RelKind,
    /// Passes expected to report for this candidate.
    pub expected: Vec<Pass>,
    pub collected: Vec<Evidence>,
    pub sealed: bool,
}

impl EvidenceBundle {
    pub fn new(
        rel_hash: RelHash,
        source: QualifiedName,
        target: QualifiedName,
        kind: RelKind,
        expected: Vec<Pass>,
    ) -> Self {
        Self { rel_hash, source, target, kind, expected, collected: Vec::new(), sealed: false }
    }

    /// Record evidence from a pass. A pass contributes at most once per
    /// bundle; replays of the same evidence are no-ops.
    pub fn record(&mut self, evidence: Evidence) {
        if self.collected.iter().any(|e| e.pass == evidence.pass) {
            return;
        }
        self.collected.push(evidence);
    }

    pub fn expected_count(&self) -> usize {
        self.expected.len()
    }

    pub fn collected_count(&self) -> usize {
        self.collected.len()
    }

    /// True once every expected pass has reported.
    pub fn is_complete(&self) -> bool {
        self.collected_count() >= self.expected_count()
    }

    /// Expected passes that never reported (synthesized disagreers).
    pub fn silent_passes(&self) -> Vec<Pass> {
        self.expected
            .iter()
            .filter(|p| !self.collected.iter().any(|e| e.pass == **p))
            .copied()
            .collect()
    }
}

#[cfg(test)]
#[path = "evidence_tests.rs"]
mod tests;
