// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test builders and proptest strategies shared across crates.

use crate::evidence::{Evidence, EvidenceBundle, Pass};
use crate::poi::QualifiedName;
use crate::relationship::{rel_hash, Confidence, RelKind};

/// Proptest strategies for domain values.
pub mod strategies {
    use super::*;
    use proptest::prelude::*;

    pub fn confidence() -> impl Strategy<Value = Confidence> {
        (0.0f64..=1.0).prop_map(Confidence::clamped)
    }

    pub fn pass() -> impl Strategy<Value = Pass> {
        prop::sample::select(Pass::ALL.to_vec())
    }

    pub fn rel_kind() -> impl Strategy<Value = RelKind> {
        prop::sample::select(RelKind::ALL.to_vec())
    }

    /// A set of agreeing evidence with distinct passes (each pass reports at
    /// most once per bundle).
    pub fn agreeing_evidence() -> impl Strategy<Value = Vec<Evidence>> {
        proptest::sample::subsequence(Pass::ALL.to_vec(), 0..=4).prop_flat_map(|passes| {
            let n = passes.len();
            (Just(passes), proptest::collection::vec(confidence(), n)).prop_map(
                |(passes, confidences)| {
                    passes
                        .into_iter()
                        .zip(confidences)
                        .map(|(pass, confidence)| Evidence::agreeing(pass, confidence))
                        .collect()
                },
            )
        })
    }
}

/// A bundle for `(source)-[kind]->(target)` with the given expectations.
pub fn bundle(source: &str, target: &str, kind: RelKind, expected: Vec<Pass>) -> EvidenceBundle {
    let source = QualifiedName::new(source);
    let target = QualifiedName::new(target);
    let hash = rel_hash(&source, &target, kind);
    EvidenceBundle::new(hash, source, target, kind, expected)
}
