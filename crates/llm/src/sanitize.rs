// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Response sanitiser: strip the non-JSON wrapping models like to add.

/// Extract the JSON body from a model response.
///
/// Handles markdown fences (with or without a language tag) and leading or
/// trailing prose by slicing from the first `{`/`[` to the matching last
/// `}`/`]`. Returns the trimmed input unchanged when no JSON delimiters are
/// found; the parser produces the real diagnostic in that case.
pub fn sanitize_json(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(stripped) = text.strip_prefix("```") {
        // Drop the info string ("json", "JSON", ...) up to the first newline.
        let body = stripped.split_once('\n').map(|(_, rest)| rest).unwrap_or(stripped);
        text = body.strip_suffix("```").map(str::trim_end).unwrap_or(body);
        text = text.trim();
    }

    let open_obj = text.find('{');
    let open_arr = text.find('[');
    let start = match (open_obj, open_arr) {
        (Some(o), Some(a)) => Some(o.min(a)),
        (Some(o), None) => Some(o),
        (None, Some(a)) => Some(a),
        (None, None) => None,
    };
    let Some(start) = start else {
        return text;
    };

    let close = match text.as_bytes()[start] {
        b'{' => text.rfind('}'),
        _ => text.rfind(']'),
    };
    match close {
        Some(end) if end >= start => &text[start..=end],
        _ => text,
    }
}

#[cfg(test)]
#[path = "sanitize_tests.rs"]
mod tests;
