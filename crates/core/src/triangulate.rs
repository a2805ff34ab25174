// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Confidence reconciliation: folding an evidence bundle into a final score.
//!
//! The fold is a pure function of the evidence list and configuration, so
//! re-running it on the same sealed bundle always yields the same verdict.

use crate::config::TriangulationConfig;
use crate::evidence::{Evidence, EvidenceBundle, Pass};
use crate::relationship::{Confidence, FinalRelationship, RelState};

/// Outcome of reconciling one bundle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub score: Confidence,
    pub state: RelState,
}

/// Reconcile a sealed evidence bundle into a final relationship.
pub fn reconcile(bundle: &EvidenceBundle, config: &TriangulationConfig) -> FinalRelationship {
    let verdict = score(&bundle.collected, &bundle.silent_passes(), config);
    FinalRelationship {
        rel_hash: bundle.rel_hash.clone(),
        source: bundle.source.clone(),
        target: bundle.target.clone(),
        kind: bundle.kind,
        confidence: verdict.score,
        state: verdict.state,
        committed: false,
    }
}

/// Score an evidence list.
///
/// Agreers are folded into a weighted mean; each agreer past the second
/// compounds an agreement boost `s + (1 - s) * boost`; every disagreer
/// (explicit contradiction or silent expected pass) applies the penalty
/// `s * penalty`. The result is clamped to `[0, 1]`.
///
/// Only the counts of post-mean agreers and disagreers matter, so the fold
/// is insensitive to arrival order.
pub fn score(collected: &[Evidence], silent: &[Pass], config: &TriangulationConfig) -> Verdict {
    let mut agreers: Vec<&Evidence> = collected.iter().filter(|e| e.agrees).collect();
    // Canonical pass order, so float summation is exact-identical for any
    // arrival order.
    agreers.sort_by_key(|e| Pass::ALL.iter().position(|p| *p == e.pass));
    let contradictions = collected.iter().filter(|e| !e.agrees).count();
    let disagreers = contradictions + silent.len();

    if agreers.is_empty() {
        return Verdict { score: Confidence::ZERO, state: RelState::Rejected };
    }

    let weight_sum: f64 = agreers.iter().map(|e| config.pass_weights.weight(e.pass)).sum();
    let mut s = if weight_sum > 0.0 {
        agreers
            .iter()
            .map(|e| config.pass_weights.weight(e.pass) * e.confidence.value())
            .sum::<f64>()
            / weight_sum
    } else {
        // All configured weights zero: fall back to the plain mean.
        agreers.iter().map(|e| e.confidence.value()).sum::<f64>() / agreers.len() as f64
    };

    // The first agreeing confirmation is already priced into the mean;
    // boosts start with the second confirmation.
    for _ in 2..agreers.len() {
        s += (1.0 - s) * config.agreement_boost;
    }

    for _ in 0..disagreers {
        s *= config.disagreement_penalty;
    }

    let score = Confidence::clamped(s);
    let state = if score.value() >= config.threshold {
        RelState::Validated
    } else {
        RelState::Rejected
    };
    Verdict { score, state }
}

#[cfg(test)]
#[path = "triangulate_tests.rs"]
mod tests;
