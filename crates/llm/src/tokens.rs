// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token counting for the context budget.

use crate::error::LlmError;
use std::sync::Arc;
use tiktoken_rs::CoreBPE;

/// Shared tokenizer. Construction is expensive; build once and clone.
#[derive(Clone)]
pub struct TokenCounter {
    bpe: Arc<CoreBPE>,
}

impl TokenCounter {
    /// The `cl100k_base` encoding, a reasonable proxy for current chat
    /// models' tokenizers.
    pub fn new() -> Result<Self, LlmError> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| LlmError::Transport(format!("tokenizer init failed: {e}")))?;
        Ok(Self { bpe: Arc::new(bpe) })
    }

    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

#[cfg(test)]
#[path = "tokens_tests.rs"]
mod tests;
