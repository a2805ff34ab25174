// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Default job options applied to every enqueue.

use serde::{Deserialize, Serialize};

/// Exponential backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Backoff {
    pub initial_ms: u64,
    pub factor: f64,
    pub cap_ms: u64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self { initial_ms: 1_000, factor: 2.0, cap_ms: 30_000 }
    }
}

impl Backoff {
    /// Delay before retry number `attempt` (1-based).
    pub fn delay_ms(&self, attempt: u32) -> u64 {
        let exp = attempt.saturating_sub(1).min(32);
        let raw = self.initial_ms as f64 * self.factor.powi(exp as i32);
        if raw >= self.cap_ms as f64 {
            self.cap_ms
        } else {
            raw as u64
        }
    }
}

/// Per-job options; the manager stamps these defaults on every enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JobOptions {
    /// Total attempts before the job is dead-lettered.
    pub attempts: u32,
    pub backoff: Backoff,
    /// Completed jobs retained for inspection.
    pub keep_completed: usize,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self { attempts: 3, backoff: Backoff::default(), keep_completed: 1_000 }
    }
}

impl JobOptions {
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }
}

#[cfg(test)]
#[path = "options_tests.rs"]
mod tests;
