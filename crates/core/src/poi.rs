// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Points of interest: named code entities extracted from source files.

use crate::id::{FileId, PoiId, RunId};
use serde::{Deserialize, Serialize};

/// A queue-name-style parse failure for POI kinds.
///
/// Kinds outside the allow-list are a security violation when they reach the
/// graph layer, so parsing is strict from the start.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown POI kind: {0:?}")]
pub struct UnknownKind(pub String);

/// The fixed allow-list of entity kinds.
///
/// These become node labels in the graph store; the enum is the injection
/// guard — no label string ever comes from input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoiKind {
    File,
    Function,
    Class,
    Method,
    Variable,
    Table,
    Package,
    Interface,
}

impl PoiKind {
    pub const ALL: [PoiKind; 8] = [
        PoiKind::File,
        PoiKind::Function,
        PoiKind::Class,
        PoiKind::Method,
        PoiKind::Variable,
        PoiKind::Table,
        PoiKind::Package,
        PoiKind::Interface,
    ];

    /// Graph node label. Static strings only.
    pub fn as_label(&self) -> &'static str {
        match self {
            PoiKind::File => "File",
            PoiKind::Function => "Function",
            PoiKind::Class => "Class",
            PoiKind::Method => "Method",
            PoiKind::Variable => "Variable",
            PoiKind::Table => "Table",
            PoiKind::Package => "Package",
            PoiKind::Interface => "Interface",
        }
    }
}

impl std::str::FromStr for PoiKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PoiKind::ALL
            .iter()
            .find(|k| k.as_label() == s)
            .copied()
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

crate::simple_display! {
    PoiKind {
        File => "File",
        Function => "Function",
        Class => "Class",
        Method => "Method",
        Variable => "Variable",
        Table => "Table",
        Package => "Package",
        Interface => "Interface",
    }
}

/// Stable string identifier for a POI, unique within a run.
///
/// Format is `<absolute-path>--<entity-name>` for file-scoped entities and
/// `<module>--<module>` for external module references.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QualifiedName(String);

impl QualifiedName {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Qualified name for an entity defined in a file.
    pub fn entity(path: &str, name: &str) -> Self {
        Self(format!("{path}--{name}"))
    }

    /// Qualified name for an external module reference.
    pub fn module(module: &str) -> Self {
        Self(format!("{module}--{module}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The path (or module) part, up to the first `--` separator.
    pub fn scope(&self) -> &str {
        self.0.split_once("--").map_or(self.0.as_str(), |(p, _)| p)
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QualifiedName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for QualifiedName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::borrow::Borrow<str> for QualifiedName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A point of interest. Immutable once created by the file-analysis worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poi {
    pub id: PoiId,
    pub file_id: FileId,
    pub run_id: RunId,
    pub kind: PoiKind,
    pub name: String,
    /// Unique within the run.
    pub qualified_name: QualifiedName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    pub start_line: u32,
    pub end_line: u32,
}

impl Poi {
    /// Construct a POI with its deterministic ID derived from the run and
    /// qualified name.
    pub fn new(
        run_id: RunId,
        file_id: FileId,
        kind: PoiKind,
        name: impl Into<String>,
        qualified_name: QualifiedName,
        start_line: u32,
        end_line: u32,
    ) -> Self {
        let id = PoiId::derive(&run_id, qualified_name.as_str());
        Self {
            id,
            file_id,
            run_id,
            kind,
            name: name.into(),
            qualified_name,
            signature: None,
            start_line,
            end_line,
        }
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }
}

crate::builder! {
    pub struct PoiBuilder => Poi {
        into {
            id: PoiId = "poi-test",
            file_id: FileId = "fil-test",
            run_id: RunId = "run-test",
            name: String = "foo",
            qualified_name: QualifiedName = "/src/a.js--foo",
        }
        set {
            kind: PoiKind = PoiKind::Function,
            start_line: u32 = 1,
            end_line: u32 = 10,
        }
        option {
            signature: String = None,
        }
    }
}

#[cfg(test)]
#[path = "poi_tests.rs"]
mod tests;
