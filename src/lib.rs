//! # Live Code Preview
//!
//! Turns a small multi-file web project (markup, stylesheets, scripts and
//! component modules) into one self-contained document for a sandboxed frame,
//! and rebuilds it on every edit.
//!
//! ## Pipeline
//!
//! ```text
//! VirtualFileStore ──► classify ──► build_bundles ──► assemble ──► PreviewRenderer
//!   (vfs.rs)        (classify.rs)  (transform.rs)  (document.rs)    (render.rs)
//!                                        │
//!                               exports.rs + symbols.rs
//! ```
//!
//! ## Invariants
//!
//! 1. **Pure rebuild**: the document is a function of the snapshot and the
//!    config only. An unmodified snapshot gives a byte-identical document.
//!
//! 2. **Insertion order**: bundles concatenate files in the order the snapshot
//!    lists them. Nothing is sorted or reordered.
//!
//! 3. **One of each**: the document carries exactly one assembler-produced
//!    `<style>` block and one inline script block.
//!
//! 4. **Publish before use**: every component publishes its export into the
//!    module namespace before the entry component (or a later component)
//!    reads it. A read that would run first is reported, not reordered.
//!
//! 5. **Never fatal**: malformed content degrades to diagnostics. Only caller
//!    mistakes (unknown path, duplicate path, unknown lesson, unsafe sandbox)
//!    are errors.

#[cfg(feature = "napi")]
use napi_derive::napi;

mod catalog;
mod classify;
mod config;
mod document;
mod error;
mod exports;
mod pipeline;
mod render;
mod session;
mod symbols;
mod transform;
mod vfs;


pub use catalog::{Lesson, LessonCatalog};
pub use classify::{
    classify, BindingMode, BindingModes, DocumentShape, EntryClassification, InjectionKind,
    InjectionPoint,
};
pub use config::{LibraryGlobal, PreviewConfig};
pub use document::{assemble, AssembledDocument};
pub use error::{Diagnostic, LiveCodeError};
pub use exports::{discover_exports, DefaultExport, ModuleExports};
pub use pipeline::{build_preview, build_preview_json, PreviewBuild, PreviewReport};
pub use render::{PreviewRenderer, SandboxPolicy, SrcdocFrame};
pub use session::LivePreview;
pub use symbols::SymbolTable;
pub use transform::{build_bundles, Bundles, TransformOutput};
pub use vfs::{FileRole, ProjectSnapshot, VirtualFile, VirtualFileStore};

/// Assemble the preview document for a JSON snapshot with the default config.
#[cfg(feature = "napi")]
#[napi]
pub fn assemble_preview_native(snapshot_json: String) -> napi::Result<String> {
    build_preview_json(&snapshot_json, None)
        .map(|report| report.html)
        .map_err(|e| napi::Error::from_reason(e.to_string()))
}

/// Full build report (`html`, `fingerprint`, `diagnostics`) for the host.
#[cfg(feature = "napi")]
#[napi]
pub fn build_preview_native(
    snapshot_json: String,
    config_json: Option<String>,
) -> napi::Result<serde_json::Value> {
    let report = build_preview_json(&snapshot_json, config_json.as_deref())
        .map_err(|e| napi::Error::from_reason(e.to_string()))?;
    serde_json::to_value(report).map_err(|e| napi::Error::from_reason(e.to_string()))
}
