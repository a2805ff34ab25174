// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run summary assembly.

use crate::error::PipelineError;
use trellis_core::{FileStatus, RelState, RunId, RunSummary};
use trellis_storage::Store;

/// Collect the user-visible totals for a finished (or failed) run.
pub async fn build_summary(store: &Store, run_id: RunId) -> Result<RunSummary, PipelineError> {
    Ok(RunSummary {
        run_id: Some(run_id),
        committed_relationships: store.count_finals(RelState::Validated).await?,
        rejected_relationships: store.count_finals(RelState::Rejected).await?,
        dead_letters: store.count_dead_letters().await?,
        skipped_files: store.count_files_with_status(run_id, FileStatus::Failed).await?,
        pois: store.count_pois(run_id).await?,
    })
}
