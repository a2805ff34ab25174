// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Strict response schemas for the three LLM passes.
//!
//! Unknown fields are tolerated; missing required fields fail at parse time
//! and are routed into the self-correction loop. Validation beyond shape
//! (allow-listed kinds, confidence bounds, line ordering) happens in
//! [`Validate::validate`].

use crate::error::SchemaDiagnostic;
use serde::Deserialize;
use trellis_core::{PoiKind, RelKind};

/// Post-parse validation with diagnostics the model can act on.
pub trait Validate {
    fn validate(&self) -> Result<(), SchemaDiagnostic>;
}

/// One POI as the model reports it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawPoi {
    pub kind: String,
    pub name: String,
    pub qualified_name: String,
    #[serde(default)]
    pub signature: Option<String>,
    pub start_line: u32,
    pub end_line: u32,
}

impl RawPoi {
    fn validate_into(&self, path: &str, diagnostic: &mut SchemaDiagnostic) {
        if self.kind.parse::<PoiKind>().is_err() {
            diagnostic.push(format!(
                "{path}.kind: {:?} is not one of the allowed kinds (File, Function, Class, \
                 Method, Variable, Table, Package, Interface)",
                self.kind
            ));
        }
        if self.name.trim().is_empty() {
            diagnostic.push(format!("{path}.name: must be non-empty"));
        }
        if self.qualified_name.trim().is_empty() {
            diagnostic.push(format!("{path}.qualified_name: must be non-empty"));
        }
        if self.end_line < self.start_line {
            diagnostic.push(format!(
                "{path}: end_line {} precedes start_line {}",
                self.end_line, self.start_line
            ));
        }
    }
}

/// One relationship as the model reports it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawRelationship {
    pub source: String,
    pub target: String,
    pub kind: String,
    pub confidence: f64,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl RawRelationship {
    fn validate_into(&self, path: &str, diagnostic: &mut SchemaDiagnostic) {
        if self.kind.parse::<RelKind>().is_err() {
            diagnostic.push(format!(
                "{path}.kind: {:?} is not one of the allowed types (CONTAINS, CALLS, USES, \
                 IMPORTS, EXPORTS, EXTENDS, IMPLEMENTS, DEFINES, DEPENDS_ON)",
                self.kind
            ));
        }
        if self.source.trim().is_empty() || self.target.trim().is_empty() {
            diagnostic.push(format!("{path}: source and target must be non-empty"));
        }
        if !(0.0..=1.0).contains(&self.confidence) || self.confidence.is_nan() {
            diagnostic.push(format!(
                "{path}.confidence: {} is outside [0, 1]",
                self.confidence
            ));
        }
    }
}

/// Per-chunk output of the file-analysis pass.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FileAnalysis {
    pub pois: Vec<RawPoi>,
    #[serde(default)]
    pub relationships: Vec<RawRelationship>,
}

impl Validate for FileAnalysis {
    fn validate(&self) -> Result<(), SchemaDiagnostic> {
        let mut diagnostic = SchemaDiagnostic { issues: Vec::new() };
        for (i, poi) in self.pois.iter().enumerate() {
            poi.validate_into(&format!("pois[{i}]"), &mut diagnostic);
        }
        for (i, rel) in self.relationships.iter().enumerate() {
            rel.validate_into(&format!("relationships[{i}]"), &mut diagnostic);
        }
        if diagnostic.is_empty() {
            Ok(())
        } else {
            Err(diagnostic)
        }
    }
}

/// Output of the directory-resolution pass.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DirectoryAnalysis {
    pub relationships: Vec<RawRelationship>,
    pub summary: String,
}

impl Validate for DirectoryAnalysis {
    fn validate(&self) -> Result<(), SchemaDiagnostic> {
        let mut diagnostic = SchemaDiagnostic { issues: Vec::new() };
        for (i, rel) in self.relationships.iter().enumerate() {
            rel.validate_into(&format!("relationships[{i}]"), &mut diagnostic);
        }
        if self.summary.trim().is_empty() {
            diagnostic.push("summary: must be non-empty".to_string());
        }
        if diagnostic.is_empty() {
            Ok(())
        } else {
            Err(diagnostic)
        }
    }
}

/// Output of the global-resolution pass.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GlobalAnalysis {
    pub relationships: Vec<RawRelationship>,
}

impl Validate for GlobalAnalysis {
    fn validate(&self) -> Result<(), SchemaDiagnostic> {
        let mut diagnostic = SchemaDiagnostic { issues: Vec::new() };
        for (i, rel) in self.relationships.iter().enumerate() {
            rel.validate_into(&format!("relationships[{i}]"), &mut diagnostic);
        }
        if diagnostic.is_empty() {
            Ok(())
        } else {
            Err(diagnostic)
        }
    }
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
