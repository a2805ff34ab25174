// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt builders for the three passes and the self-correction loop.

use crate::client::LlmRequest;
use trellis_core::Poi;

/// The slice of a directory summary the global prompt needs.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryInput {
    pub dir_path: String,
    pub poi_count: u64,
    pub summary_text: String,
}

const SYSTEM: &str = "You are a precise static-analysis assistant. You respond with a single \
strict JSON object and nothing else: no prose, no markdown fences.";

const POI_SCHEMA: &str = r#"{"pois": [{"kind": "File|Function|Class|Method|Variable|Table|Package|Interface", "name": "...", "qualified_name": "<absolute-path>--<name>", "signature": "optional", "start_line": 1, "end_line": 1}], "relationships": [{"source": "<qualified-name>", "target": "<qualified-name>", "kind": "CONTAINS|CALLS|USES|IMPORTS|EXPORTS|EXTENDS|IMPLEMENTS|DEFINES|DEPENDS_ON", "confidence": 0.0, "explanation": "optional"}]}"#;

const REL_SCHEMA: &str = r#"{"relationships": [{"source": "<qualified-name>", "target": "<qualified-name>", "kind": "CONTAINS|CALLS|USES|IMPORTS|EXPORTS|EXTENDS|IMPLEMENTS|DEFINES|DEPENDS_ON", "confidence": 0.0, "explanation": "optional"}]}"#;

/// Analyse one chunk of one file.
pub fn file_analysis_prompt(file_path: &str, chunk_text: &str, chunk_start_line: u32) -> LlmRequest {
    LlmRequest {
        system: SYSTEM.to_string(),
        user: format!(
            "Extract every point of interest (functions, classes, methods, variables, \
             imports-as-packages, tables, interfaces) and every relationship whose source is \
             defined in this code. Use absolute line numbers; this excerpt starts at line \
             {chunk_start_line} of {file_path}. Qualified names are \
             `{file_path}--<entity-name>`; for an imported external module use \
             `<module>--<module>`.\n\nRespond with JSON matching exactly:\n{POI_SCHEMA}\n\n\
             Code:\n{chunk_text}"
        ),
    }
}

/// Cross-file relationships within one directory.
pub fn directory_prompt(dir_path: &str, pois: &[Poi]) -> LlmRequest {
    let listing = pois
        .iter()
        .map(|p| format!("- {} {} [{}..{}]", p.kind, p.qualified_name, p.start_line, p.end_line))
        .collect::<Vec<_>>()
        .join("\n");
    LlmRequest {
        system: SYSTEM.to_string(),
        user: format!(
            "These points of interest all live in directory {dir_path}. Report ONLY \
             relationships whose source and target are defined in DIFFERENT files within this \
             directory. Also produce a one-paragraph `summary` of what the directory does.\n\n\
             Respond with JSON matching exactly:\n{{\"relationships\": [...], \"summary\": \
             \"...\"}} where relationships follow:\n{REL_SCHEMA}\n\nPoints of interest:\n{listing}"
        ),
    }
}

/// Cross-directory relationships from directory summaries.
pub fn global_prompt(summaries: &[SummaryInput]) -> LlmRequest {
    let listing = summaries
        .iter()
        .map(|s| format!("## {} ({} entities)\n{}", s.dir_path, s.poi_count, s.summary_text))
        .collect::<Vec<_>>()
        .join("\n\n");
    LlmRequest {
        system: SYSTEM.to_string(),
        user: format!(
            "Given these per-directory summaries of one codebase, report relationships whose \
             endpoints live in DIFFERENT directories. Use the qualified names mentioned in the \
             summaries.\n\nRespond with JSON matching exactly:\n{REL_SCHEMA}\n\n{listing}"
        ),
    }
}

/// Embed the original request, the offending response, and the validator's
/// findings, and ask for a corrected answer.
pub fn correction_prompt(original: &LlmRequest, offending: &str, diagnostic: &str) -> LlmRequest {
    LlmRequest {
        system: original.system.clone(),
        user: format!(
            "Your previous response to the request below was rejected by a strict JSON schema \
             validator.\n\n=== ORIGINAL REQUEST ===\n{}\n\n=== YOUR RESPONSE ===\n{}\n\n=== \
             VALIDATION ERRORS ===\n{}\n\nReturn a corrected response that satisfies the schema. \
             JSON only.",
            original.user, offending, diagnostic
        ),
    }
}

#[cfg(test)]
#[path = "prompts_tests.rs"]
mod tests;
