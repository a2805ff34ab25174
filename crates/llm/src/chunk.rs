// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Chunk splitting for the context budget.

use crate::tokens::TokenCounter;

/// Lines of context repeated at the start of each follow-on chunk, so
/// entities spanning a cut are visible to both sides.
const OVERLAP_LINES: usize = 20;

/// One slice of a file, with its 1-based starting line for absolute
/// positions in the model output.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub index: usize,
    pub start_line: u32,
    pub text: String,
}

/// Split `content` into chunks that each fit `budget_tokens`.
///
/// Content at or under the budget stays whole — exactly at the budget is one
/// chunk, one token over is split. Splits happen on line boundaries with
/// [`OVERLAP_LINES`] lines of overlap; a single line larger than the whole
/// budget is hard-split by characters as a last resort.
pub fn split_chunks(content: &str, budget_tokens: usize, counter: &TokenCounter) -> Vec<Chunk> {
    if counter.count(content) <= budget_tokens {
        return vec![Chunk { index: 0, start_line: 1, text: content.to_string() }];
    }

    let lines: Vec<&str> = content.lines().collect();
    let mut chunks = Vec::new();
    let mut cursor = 0usize;

    while cursor < lines.len() {
        let start = cursor;
        let mut tokens = 0usize;
        let mut end = start;

        while end < lines.len() {
            let line_tokens = counter.count(lines[end]) + 1;
            if tokens + line_tokens > budget_tokens && end > start {
                break;
            }
            if line_tokens > budget_tokens && end == start {
                // A single pathological line: hard-split by characters.
                for piece in char_split(lines[end], budget_tokens, counter) {
                    chunks.push(Chunk {
                        index: chunks.len(),
                        start_line: (start + 1) as u32,
                        text: piece,
                    });
                }
                end += 1;
                tokens = budget_tokens; // force the chunk to close
                break;
            }
            tokens += line_tokens;
            end += 1;
        }

        if end > start && !lines[start..end].is_empty() {
            let text = lines[start..end].join("\n");
            // Pathological lines were already pushed piecewise.
            if counter.count(&text) <= budget_tokens {
                chunks.push(Chunk {
                    index: chunks.len(),
                    start_line: (start + 1) as u32,
                    text,
                });
            }
        }

        if end >= lines.len() {
            break;
        }
        cursor = end.saturating_sub(OVERLAP_LINES).max(start + 1);
    }

    chunks
}

fn char_split(line: &str, budget_tokens: usize, counter: &TokenCounter) -> Vec<String> {
    // Rough bytes-per-token estimate from the line itself, floor of 1.
    let total_tokens = counter.count(line).max(1);
    let bytes_per_token = (line.len() / total_tokens).max(1);
    let window = (budget_tokens * bytes_per_token).max(1);

    let mut pieces = Vec::new();
    let mut rest = line;
    while !rest.is_empty() {
        let mut cut = window.min(rest.len());
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        pieces.push(rest[..cut].to_string());
        rest = &rest[cut..];
    }
    pieces
}

#[cfg(test)]
#[path = "chunk_tests.rs"]
mod tests;
