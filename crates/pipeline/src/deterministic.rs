// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The deterministic syntactic pass.
//!
//! No AST: a regex scan over the file text, matched against the run's known
//! qualified names. Exact-name hits are high-signal, so this pass emits
//! confidence 1.0 and carries the top default weight in reconciliation.

use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;
use trellis_core::{
    Confidence, Pass, Poi, PoiKind, QualifiedName, RelKind, RelationshipCandidate,
};

fn call_site_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| match Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\s*\(") {
        Ok(re) => re,
        Err(_) => unreachable!("literal pattern"),
    })
}

fn import_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| match Regex::new(r#"(?:require\s*\(\s*|from\s+|import\s+)['"]([^'"]+)['"]"#) {
        Ok(re) => re,
        Err(_) => unreachable!("literal pattern"),
    })
}

/// Scan one file's text for relationships among the run's known POIs.
///
/// - Call sites: `name(` inside a POI's line range, where `name` is another
///   known POI of a callable kind → `CALLS`.
/// - Imports: `require('x')` / `import ... from 'x'` → `IMPORTS` from this
///   file's file entity, targeting the resolved file entity when the
///   specifier is a known relative path, or a module reference otherwise.
pub fn scan_relationships(
    file_path: &str,
    content: &str,
    file_pois: &[Poi],
    run_pois: &[Poi],
) -> Vec<RelationshipCandidate> {
    let callables: BTreeMap<&str, &Poi> = run_pois
        .iter()
        .filter(|p| matches!(p.kind, PoiKind::Function | PoiKind::Method | PoiKind::Class))
        .map(|p| (p.name.as_str(), p))
        .collect();
    let file_entities: BTreeMap<String, &Poi> = run_pois
        .iter()
        .filter(|p| p.kind == PoiKind::File)
        .map(|p| (p.qualified_name.scope().to_string(), p))
        .collect();

    let lines: Vec<&str> = content.lines().collect();
    let mut candidates = Vec::new();

    // Call sites inside each local definition's span.
    for poi in file_pois {
        if !matches!(poi.kind, PoiKind::Function | PoiKind::Method) {
            continue;
        }
        let start = poi.start_line.saturating_sub(1) as usize;
        let end = (poi.end_line as usize).min(lines.len());
        if start >= end {
            continue;
        }
        let body = lines[start..end].join("\n");
        for capture in call_site_re().captures_iter(&body) {
            let name = &capture[1];
            if name == poi.name {
                continue;
            }
            let Some(target) = callables.get(name) else { continue };
            candidates.push(
                RelationshipCandidate::new(
                    poi.qualified_name.clone(),
                    target.qualified_name.clone(),
                    RelKind::Calls,
                    Pass::Deterministic,
                    Confidence::FULL,
                )
                .with_explanation(format!("call site `{name}(` in {file_path}")),
            );
        }
    }

    // Imports from this file's file entity.
    let source = file_qualified_name(file_path);
    for capture in import_re().captures_iter(content) {
        let specifier = &capture[1];
        let target = if specifier.starts_with('.') {
            match resolve_relative(file_path, specifier, &file_entities) {
                Some(poi) => poi.qualified_name.clone(),
                None => continue,
            }
        } else {
            QualifiedName::module(specifier)
        };
        candidates.push(
            RelationshipCandidate::new(
                source.clone(),
                target,
                RelKind::Imports,
                Pass::Deterministic,
                Confidence::FULL,
            )
            .with_explanation(format!("import of {specifier:?} in {file_path}")),
        );
    }

    dedupe(candidates)
}

/// The file-entity qualified name: `<path>--<basename>`.
pub fn file_qualified_name(file_path: &str) -> QualifiedName {
    let basename = Path::new(file_path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file_path.to_string());
    QualifiedName::entity(file_path, &basename)
}

fn resolve_relative<'a>(
    file_path: &str,
    specifier: &str,
    file_entities: &BTreeMap<String, &'a Poi>,
) -> Option<&'a Poi> {
    let dir = Path::new(file_path).parent()?;
    let joined = normalise(&dir.join(specifier));
    // Specifiers commonly omit the extension; try the common ones.
    let candidates = [
        joined.clone(),
        format!("{joined}.js"),
        format!("{joined}.ts"),
        format!("{joined}.jsx"),
        format!("{joined}.tsx"),
    ];
    candidates.iter().find_map(|path| file_entities.get(path).copied())
}

/// Lexical `.`/`..` resolution, no filesystem access.
fn normalise(path: &Path) -> String {
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                parts.pop();
            }
            std::path::Component::CurDir => {}
            other => parts.push(other.as_os_str()),
        }
    }
    let mut out = std::path::PathBuf::new();
    for part in parts {
        out.push(part);
    }
    out.display().to_string()
}

fn dedupe(candidates: Vec<RelationshipCandidate>) -> Vec<RelationshipCandidate> {
    let mut seen = std::collections::BTreeSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.hash()))
        .collect()
}

#[cfg(test)]
#[path = "deterministic_tests.rs"]
mod tests;
