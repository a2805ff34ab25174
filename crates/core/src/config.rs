// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration for a trellis deployment.
//!
//! All keys are recognised in kebab-case TOML; every field has a default so
//! a missing file or empty table is a valid configuration.

use crate::evidence::{Pass, PassWeights};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct TrellisConfig {
    pub run: RunConfig,
    pub file: FileConfig,
    pub llm: LlmConfig,
    pub queue: QueueConfig,
    pub outbox: OutboxConfig,
    pub triangulation: TriangulationConfig,
    pub graph: GraphConfig,
}

impl TrellisConfig {
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml(&raw)
    }
}

/// What to analyse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RunConfig {
    pub target_root: PathBuf,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FileConfig {
    pub max_size_bytes: u64,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self { max_size_bytes: 10 * 1024 * 1024 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LlmConfig {
    /// Size of the semaphore gating outbound calls.
    pub concurrency: usize,
    pub context_budget_tokens: usize,
    pub max_attempts: u32,
    pub backoff_initial_ms: u64,
    pub backoff_factor: f64,
    pub backoff_cap_ms: u64,
    /// Per-call hard timeout.
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            context_budget_tokens: 90_000,
            max_attempts: 3,
            backoff_initial_ms: 1_000,
            backoff_factor: 2.0,
            backoff_cap_ms: 30_000,
            timeout_ms: 300_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct QueueConfig {
    pub default_attempts: u32,
    pub stalled_interval_ms: u64,
    /// Must outlast an LLM call.
    pub lock_duration_ms: u64,
    /// How long in-flight jobs get to finish on shutdown.
    pub shutdown_grace_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            default_attempts: 3,
            stalled_interval_ms: 30_000,
            lock_duration_ms: 1_800_000,
            shutdown_grace_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OutboxConfig {
    pub poll_interval_ms: u64,
    pub batch_size: usize,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self { poll_interval_ms: 500, batch_size: 500 }
    }
}

/// Knobs for the confidence fold and evidence collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct TriangulationConfig {
    pub agreement_boost: f64,
    pub disagreement_penalty: f64,
    pub threshold: f64,
    pub pass_weights: PassWeights,
    /// Passes enabled for this deployment; expected-evidence counts are
    /// derived from this set.
    pub enabled_passes: Vec<Pass>,
    /// Grace window after first evidence before a short bundle is sealed
    /// anyway.
    pub grace_ms: u64,
}

impl Default for TriangulationConfig {
    fn default() -> Self {
        Self {
            agreement_boost: 0.2,
            disagreement_penalty: 0.5,
            threshold: 0.6,
            pass_weights: PassWeights::default(),
            enabled_passes: Pass::ALL.to_vec(),
            grace_ms: 60_000,
        }
    }
}

impl TriangulationConfig {
    pub fn pass_enabled(&self, pass: Pass) -> bool {
        self.enabled_passes.contains(&pass)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct GraphConfig {
    pub batch_size: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self { batch_size: 500 }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
