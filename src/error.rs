//! Errors and diagnostics for the live preview pipeline.
//!
//! Two tiers:
//! - [`LiveCodeError`]: hard failures. Only caller precondition violations
//!   (writing an unknown path, a duplicate path in a snapshot) and I/O or
//!   parse failures while *loading* content end up here.
//! - [`Diagnostic`]: soft findings produced while building a preview. They
//!   never stop the pipeline; some renderable document is always produced.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// HARD ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum LiveCodeError {
    /// The editing surface referenced a path that is not in the snapshot.
    #[error("no such file in the active project: {path}")]
    UnknownPath { path: String },

    /// A snapshot listed the same path twice.
    #[error("duplicate path in project snapshot: {path}")]
    DuplicatePath { path: String },

    /// The catalog has no lesson for the requested topic.
    #[error("no live-code lesson for {topic}/{subtopic}")]
    UnknownLesson { topic: String, subtopic: String },

    /// The sandbox policy would let preview scripts reach the host page.
    #[error("sandbox policy is not isolating: {reason}")]
    InsecureSandbox { reason: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl LiveCodeError {
    pub fn unknown_path(path: impl Into<String>) -> Self {
        Self::UnknownPath { path: path.into() }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SOFT DIAGNOSTICS
// ═══════════════════════════════════════════════════════════════════════════════

pub const DIAG_UNRECOGNIZED_ENTRY: &str = "LC-W001";
pub const DIAG_UNRESOLVED_EXPORT: &str = "LC-W002";
pub const DIAG_UNRESOLVED_IMPORT: &str = "LC-W003";
pub const DIAG_UNSUPPORTED_IMPORT: &str = "LC-W004";
pub const DIAG_PUBLISH_AFTER_READ: &str = "LC-W005";
pub const DIAG_MISSING_ENTRY: &str = "LC-W006";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Diagnostic {
    /// The entry is a fragment with no known injection point; the shell was
    /// synthesized around it.
    UnrecognizedEntryShape { entry: String },
    /// No export pattern matched; the module was published under `fallback`.
    UnresolvedComponentExport { path: String, fallback: String },
    /// A component-path import did not resolve to any component module.
    UnresolvedImport { importer: String, source: String },
    /// An import of something that is neither a UI library nor a component.
    UnsupportedImport { importer: String, source: String },
    /// `reader` reads `name` before the module publishing it has run.
    PublishAfterRead { reader: String, name: String },
    /// The snapshot has no file at its designated entry path.
    MissingEntry { path: String },
}

impl Diagnostic {
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnrecognizedEntryShape { .. } => DIAG_UNRECOGNIZED_ENTRY,
            Self::UnresolvedComponentExport { .. } => DIAG_UNRESOLVED_EXPORT,
            Self::UnresolvedImport { .. } => DIAG_UNRESOLVED_IMPORT,
            Self::UnsupportedImport { .. } => DIAG_UNSUPPORTED_IMPORT,
            Self::PublishAfterRead { .. } => DIAG_PUBLISH_AFTER_READ,
            Self::MissingEntry { .. } => DIAG_MISSING_ENTRY,
        }
    }

    /// Log through `tracing`. A fragment entry is an expected shape, the rest
    /// are warnings.
    pub fn emit(&self) {
        match self {
            Self::UnrecognizedEntryShape { .. } => {
                tracing::debug!("[LiveCode] {}: {}", self.code(), self)
            }
            _ => tracing::warn!("[LiveCode] {}: {}", self.code(), self),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnrecognizedEntryShape { entry } => write!(
                f,
                "'{}' is neither a full document nor uses a known injection point; using the fallback shell",
                entry
            ),
            Self::UnresolvedComponentExport { path, fallback } => write!(
                f,
                "could not find the exported component in '{}'; publishing it as '{}'",
                path, fallback
            ),
            Self::UnresolvedImport { importer, source } => write!(
                f,
                "'{}' imports '{}' which is not a component module of this project",
                importer, source
            ),
            Self::UnsupportedImport { importer, source } => write!(
                f,
                "'{}' imports '{}'; only UI-library and component imports are supported",
                importer, source
            ),
            Self::PublishAfterRead { reader, name } => write!(
                f,
                "'{}' reads '{}' before the module that publishes it runs",
                reader, name
            ),
            Self::MissingEntry { path } => {
                write!(f, "entry file '{}' is missing from the project", path)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let all = [
            Diagnostic::UnrecognizedEntryShape { entry: "a".into() },
            Diagnostic::UnresolvedComponentExport {
                path: "a".into(),
                fallback: "b".into(),
            },
            Diagnostic::UnresolvedImport {
                importer: "a".into(),
                source: "b".into(),
            },
            Diagnostic::UnsupportedImport {
                importer: "a".into(),
                source: "b".into(),
            },
            Diagnostic::PublishAfterRead {
                reader: "a".into(),
                name: "b".into(),
            },
            Diagnostic::MissingEntry { path: "a".into() },
        ];
        let codes: std::collections::HashSet<_> = all.iter().map(|d| d.code()).collect();
        assert_eq!(codes.len(), all.len());
    }

    #[test]
    fn test_unknown_path_message() {
        let err = LiveCodeError::unknown_path("missing.js");
        assert_eq!(err.to_string(), "no such file in the active project: missing.js");
    }
}
