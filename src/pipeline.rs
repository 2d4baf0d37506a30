//! Classifier → Transform → Assembler, as one pure function of a snapshot.

use serde::Serialize;

use crate::classify::{classify, EntryClassification};
use crate::config::PreviewConfig;
use crate::document::{assemble, AssembledDocument};
use crate::error::{Diagnostic, LiveCodeError};
use crate::transform::build_bundles;
use crate::vfs::ProjectSnapshot;

/// Result of one pipeline run.
#[derive(Debug, Clone)]
pub struct PreviewBuild {
    pub document: AssembledDocument,
    pub classification: EntryClassification,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn build_preview(snapshot: &ProjectSnapshot, config: &PreviewConfig) -> PreviewBuild {
    let mut diagnostics = Vec::new();

    let entry_path = snapshot.entry_path();
    let entry = match snapshot.entry() {
        Some(file) => file.content.as_str(),
        None => {
            diagnostics.push(Diagnostic::MissingEntry {
                path: entry_path.to_string(),
            });
            ""
        }
    };

    let classification = classify(entry_path, entry);
    if classification.is_unrecognized() && snapshot.entry().is_some() {
        diagnostics.push(Diagnostic::UnrecognizedEntryShape {
            entry: entry_path.to_string(),
        });
    }

    let transformed = build_bundles(snapshot, &classification, config);
    diagnostics.extend(transformed.diagnostics);

    let document = assemble(entry, &classification, &transformed.bundles, config);

    for diagnostic in &diagnostics {
        diagnostic.emit();
    }
    tracing::debug!(
        "[LiveCode] Assembled {} byte(s), fingerprint {}",
        document.as_str().len(),
        document.fingerprint()
    );

    PreviewBuild {
        document,
        classification,
        diagnostics,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HOST REPORT
// ═══════════════════════════════════════════════════════════════════════════════

/// Serializable summary of a build for hosts that only speak JSON.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewReport {
    pub html: String,
    pub fingerprint: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl From<PreviewBuild> for PreviewReport {
    fn from(build: PreviewBuild) -> Self {
        Self {
            fingerprint: build.document.fingerprint(),
            html: build.document.into_string(),
            diagnostics: build.diagnostics,
        }
    }
}

/// Parse a snapshot (and optional config) from JSON and build it.
pub fn build_preview_json(
    snapshot_json: &str,
    config_json: Option<&str>,
) -> Result<PreviewReport, LiveCodeError> {
    let snapshot = ProjectSnapshot::from_json(snapshot_json)?;
    let config = match config_json {
        Some(json) => PreviewConfig::from_json(json)?,
        None => PreviewConfig::default(),
    };
    Ok(build_preview(&snapshot, &config).into())
}
