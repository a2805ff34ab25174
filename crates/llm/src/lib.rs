// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! trellis-llm: the bounded, self-correcting LLM client.
//!
//! All outbound calls pass through one counting semaphore; responses are
//! sanitised, parsed against strict schemas, and schema failures feed a
//! correction-prompt retry loop. Token counting and chunk splitting for the
//! context budget live here too.

mod chunk;
mod client;
mod error;
mod prompts;
mod sanitize;
mod schema;
mod tokens;
mod transport;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use chunk::{split_chunks, Chunk};
pub use client::{LlmClient, LlmRequest};
pub use error::{LlmError, SchemaDiagnostic};
pub use prompts::{
    correction_prompt, directory_prompt, file_analysis_prompt, global_prompt, SummaryInput,
};
pub use sanitize::sanitize_json;
pub use schema::{
    DirectoryAnalysis, FileAnalysis, GlobalAnalysis, RawPoi, RawRelationship, Validate,
};
pub use tokens::TokenCounter;
pub use transport::{HttpTransport, HttpTransportConfig, LlmTransport};

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeTransport;
