// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn defaults_match_the_standard_policy() {
    let opts = JobOptions::default();
    assert_eq!(opts.attempts, 3);
    assert_eq!(opts.backoff.initial_ms, 1_000);
    assert_eq!(opts.backoff.factor, 2.0);
    assert_eq!(opts.backoff.cap_ms, 30_000);
    assert_eq!(opts.keep_completed, 1_000);
}

#[parameterized(
    first = { 1, 1_000 },
    second = { 2, 2_000 },
    third = { 3, 4_000 },
    capped = { 10, 30_000 },
)]
fn backoff_doubles_until_the_cap(attempt: u32, expected_ms: u64) {
    assert_eq!(Backoff::default().delay_ms(attempt), expected_ms);
}

#[test]
fn backoff_survives_huge_attempt_numbers() {
    assert_eq!(Backoff::default().delay_ms(u32::MAX), 30_000);
}

#[test]
fn with_attempts_overrides() {
    assert_eq!(JobOptions::default().with_attempts(1).attempts, 1);
}
