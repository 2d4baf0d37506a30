//! # Document Assembler
//!
//! Turns the entry markup plus the two bundles into one self-contained
//! document string.
//!
//! ## Key Invariants
//!
//! 1. **Always renderable**: the result is a complete document. Fragments get a
//!    synthesized shell instead of being passed through bare.
//! 2. **One of each**: exactly one assembler-produced `<style>` block and one
//!    inline script block, whatever injection points the entry had.
//! 3. **In place first**: the first recognized stylesheet link is replaced
//!    where it stands. The script bundle replaces the linked entry component's
//!    inclusion when there is one, else the first inclusion in the preferred
//!    binding mode, else the first inclusion. Other recognized points of the
//!    same family are removed, since the bundle already carries their files.
//! 4. **Fallback placement**: a missing style goes before `</head>`, a missing
//!    script before `</body>`.
//! 5. **Fragments** get a classic script, unless the bundle links an entry
//!    component: that code is JSX and only runs as a declarative-UI script.
//! 6. **Whole documents only**: no partial or streaming assembly.

use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::ops::Range;

use crate::classify::{
    BindingMode, EntryClassification, InjectionKind, InjectionPoint, TagAttribute,
};
use crate::config::PreviewConfig;
use crate::transform::Bundles;

lazy_static! {
    static ref SCRIPT_CLOSE_RE: Regex = Regex::new(r"(?i)</(script)").unwrap();
    static ref STYLE_CLOSE_RE: Regex = Regex::new(r"(?i)</(style)").unwrap();
}

/// Attributes that only make sense for an external script.
const EXTERNAL_ONLY_ATTRIBUTES: &[&str] = &["src", "defer", "async", "integrity", "crossorigin"];

// ═══════════════════════════════════════════════════════════════════════════════
// ASSEMBLED DOCUMENT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledDocument {
    html: String,
}

impl AssembledDocument {
    pub fn new(html: String) -> Self {
        Self { html }
    }

    pub fn as_str(&self) -> &str {
        &self.html
    }

    pub fn into_string(self) -> String {
        self.html
    }

    /// SHA-256 of the document, hex encoded.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.html.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl std::fmt::Display for AssembledDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.html)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ASSEMBLY
// ═══════════════════════════════════════════════════════════════════════════════

pub fn assemble(
    entry: &str,
    classification: &EntryClassification,
    bundles: &Bundles,
    config: &PreviewConfig,
) -> AssembledDocument {
    let html = if classification.is_full_document() {
        assemble_full_document(entry, classification, bundles)
    } else {
        synthesize_shell(entry, classification, bundles, config)
    };
    AssembledDocument::new(html)
}

fn assemble_full_document(
    entry: &str,
    classification: &EntryClassification,
    bundles: &Bundles,
) -> String {
    let mut edits = Vec::new();

    let style = style_block(&bundles.stylesheet);
    let mut links = classification.stylesheet_points();
    match links.next() {
        Some(first) => {
            edits.push(Edit::replace(first.span.clone(), style));
            edits.extend(links.map(|p| Edit::remove(p.span.clone())));
        }
        None => {
            let at = find_ignore_case(entry, "</head>")
                .or_else(|| find_ignore_case(entry, "<body"))
                .or_else(|| rfind_ignore_case(entry, "</html>"))
                .unwrap_or(entry.len());
            edits.push(Edit::insert(at, style));
        }
    }

    match script_target(classification, bundles) {
        Some(target) => {
            edits.push(Edit::replace(
                target.span.clone(),
                inline_script_from(target, &bundles.script),
            ));
            edits.extend(
                classification
                    .script_points()
                    .filter(|p| p.span != target.span)
                    .map(|p| Edit::remove(p.span.clone())),
            );
        }
        None => {
            let at = rfind_ignore_case(entry, "</body>")
                .or_else(|| rfind_ignore_case(entry, "</html>"))
                .unwrap_or(entry.len());
            let mode = classification.modes.preferred();
            edits.push(Edit::insert(at, inline_script(mode, &bundles.script)));
        }
    }

    apply_edits(entry, edits)
}

/// Script inclusion the bundle replaces in place.
fn script_target<'a>(
    classification: &'a EntryClassification,
    bundles: &Bundles,
) -> Option<&'a InjectionPoint> {
    if let Some(entry_component) = &bundles.entry_component {
        let linked = classification.script_points().find(|p| {
            p.kind == InjectionKind::DeclarativeScript && &p.path == entry_component
        });
        if linked.is_some() {
            return linked;
        }
    }
    let preferred = classification.modes.preferred();
    classification
        .script_points()
        .find(|p| p.kind.binding_mode() == Some(preferred))
        .or_else(|| classification.script_points().next())
}

fn synthesize_shell(
    fragment: &str,
    classification: &EntryClassification,
    bundles: &Bundles,
    config: &PreviewConfig,
) -> String {
    let edits = classification
        .injection_points
        .iter()
        .map(|p| Edit::remove(p.span.clone()))
        .collect();
    let body = apply_edits(fragment, edits);
    let body = body.trim();
    let mode = if bundles.entry_component.is_some() {
        BindingMode::Declarative
    } else {
        BindingMode::Classic
    };

    let mut out = String::with_capacity(body.len() + bundles.stylesheet.len() + bundles.script.len() + 160);
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n");
    out.push_str(&format!("<title>{}</title>\n", escape_text(&config.document_title)));
    out.push_str(&style_block(&bundles.stylesheet));
    out.push_str("\n</head>\n<body>\n");
    if !body.is_empty() {
        out.push_str(body);
        out.push('\n');
    }
    out.push_str(&inline_script(mode, &bundles.script));
    out.push_str("\n</body>\n</html>\n");
    out
}

// ═══════════════════════════════════════════════════════════════════════════════
// BLOCKS
// ═══════════════════════════════════════════════════════════════════════════════

fn style_block(css: &str) -> String {
    format!("<style>{}</style>", STYLE_CLOSE_RE.replace_all(css, "<\\/$1"))
}

fn escape_script(js: &str) -> String {
    SCRIPT_CLOSE_RE.replace_all(js, "<\\/$1").into_owned()
}

fn inline_script(mode: BindingMode, js: &str) -> String {
    match mode.type_attribute() {
        Some(t) => format!("<script type=\"{}\">{}</script>", t, escape_script(js)),
        None => format!("<script>{}</script>", escape_script(js)),
    }
}

/// Inline version of a recognized script inclusion, keeping its other
/// attributes (`type`, `data-presets`, ...).
fn inline_script_from(point: &InjectionPoint, js: &str) -> String {
    let attrs: String = point
        .attributes
        .iter()
        .filter(|a| !EXTERNAL_ONLY_ATTRIBUTES.contains(&a.name.as_str()))
        .map(render_attribute)
        .collect();
    format!("<script{}>{}</script>", attrs, escape_script(js))
}

fn render_attribute(attr: &TagAttribute) -> String {
    match &attr.value {
        Some(v) => format!(" {}=\"{}\"", attr.name, v.replace('"', "&quot;")),
        None => format!(" {}", attr.name),
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// ═══════════════════════════════════════════════════════════════════════════════
// SPLICING
// ═══════════════════════════════════════════════════════════════════════════════

struct Edit {
    range: Range<usize>,
    text: String,
}

impl Edit {
    fn replace(range: Range<usize>, text: String) -> Self {
        Self { range, text }
    }

    fn remove(range: Range<usize>) -> Self {
        Self {
            range,
            text: String::new(),
        }
    }

    fn insert(at: usize, text: String) -> Self {
        Self { range: at..at, text }
    }
}

/// Apply non-overlapping edits. Edits at the same offset keep push order.
fn apply_edits(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|e| e.range.start);
    let extra: usize = edits.iter().map(|e| e.text.len()).sum();
    let mut out = String::with_capacity(source.len() + extra);
    let mut cursor = 0;
    for edit in edits {
        if edit.range.start < cursor {
            // Overlaps an earlier edit; the recognized spans never do.
            continue;
        }
        out.push_str(&source[cursor..edit.range.start]);
        out.push_str(&edit.text);
        cursor = edit.range.end;
    }
    out.push_str(&source[cursor..]);
    out
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_ascii_lowercase().find(needle)
}

fn rfind_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_ascii_lowercase().rfind(needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;

    fn bundles(css: &str, js: &str) -> Bundles {
        Bundles {
            stylesheet: css.to_string(),
            script: js.to_string(),
            entry_component: None,
        }
    }

    fn run(entry: &str, css: &str, js: &str) -> String {
        let c = classify("index.html", entry);
        assemble(entry, &c, &bundles(css, js), &PreviewConfig::default()).into_string()
    }

    #[test]
    fn test_in_place_replacement() {
        let entry = "<!DOCTYPE html>\n<html><head><link rel=\"stylesheet\" href=\"styles.css\"></head>\n<body><script src=\"script.js\"></script></body></html>";
        let out = run(entry, "p{}", "go()");
        assert_eq!(
            out,
            "<!DOCTYPE html>\n<html><head><style>p{}</style></head>\n<body><script>go()</script></body></html>"
        );
    }

    #[test]
    fn test_missing_points_appended() {
        let entry = "<!DOCTYPE html><html><head><title>t</title></head><body><p>x</p></body></html>";
        let out = run(entry, "p{}", "go()");
        assert!(out.contains("<title>t</title><style>p{}</style></head>"));
        assert!(out.contains("<p>x</p><script>go()</script></body>"));
    }

    #[test]
    fn test_appended_script_follows_detected_mode() {
        let entry = "<html><head></head><body><script type=\"module\">import './x.js'</script></body></html>";
        let out = run(entry, "", "go()");
        assert!(out.contains("<script type=\"module\">go()</script></body>"));
    }

    #[test]
    fn test_duplicate_points_removed() {
        let entry = "<html><head><link rel=\"stylesheet\" href=\"a.css\"><link rel=\"stylesheet\" href=\"b.css\"></head><body><script src=\"a.js\"></script><script src=\"b.js\"></script></body></html>";
        let out = run(entry, "a{}\nb{}", "a();\nb();");
        assert_eq!(out.matches("<style>").count(), 1);
        assert_eq!(out.matches("<script").count(), 1);
        assert!(!out.contains("b.css") && !out.contains("b.js"));
    }

    #[test]
    fn test_declarative_attributes_kept() {
        let entry = "<html><body><script type=\"text/babel\" data-presets=\"react\" src=\"App.js\" defer></script></body></html>";
        let out = run(entry, "", "render()");
        assert!(out.contains("<script type=\"text/babel\" data-presets=\"react\">render()</script>"));
    }

    #[test]
    fn test_fragment_shell() {
        let out = run("<h1>Hello</h1>", "", "alert(1)");
        assert!(out.starts_with("<!DOCTYPE html>"));
        assert!(out.contains("<body>\n<h1>Hello</h1>\n<script>alert(1)</script>\n</body>"));
        assert_eq!(out.matches("<style>").count(), 1);
        assert_eq!(out.matches("<script").count(), 1);
    }

    #[test]
    fn test_fragment_injection_points_stripped() {
        let out = run("<h1>Hi</h1>\n<script src=\"app.js\"></script>", "", "x()");
        assert!(!out.contains("app.js"));
        assert_eq!(out.matches("<script").count(), 1);
    }

    #[test]
    fn test_early_close_escaped() {
        let out = run("<p>x</p>", "a::after{content:'</style>'}", "let s = '</script>';");
        assert!(out.contains("content:'<\\/style>'"));
        assert!(out.contains("let s = '<\\/script>';"));
        assert_eq!(out.matches("</script>").count(), 1);
    }

    #[test]
    fn test_fragment_script_is_classic() {
        let entry = "<div id=\"root\"></div>\n<script type=\"module\" src=\"main.js\"></script>";
        let out = run(entry, "", "console.log(1)");
        assert!(out.contains("<script>console.log(1)</script>"));
        assert!(!out.contains("type=\"module\""));
    }

    #[test]
    fn test_fragment_with_linked_entry_component() {
        let entry = "<div id=\"root\"></div>\n<script type=\"text/babel\" src=\"App.js\"></script>";
        let c = classify("index.html", entry);
        let b = Bundles {
            entry_component: Some("App.js".into()),
            ..bundles("", "render(<App />)")
        };
        let out = assemble(entry, &c, &b, &PreviewConfig::default()).into_string();
        assert!(out.contains("<script type=\"text/babel\">render(<App />)</script>"));
        assert_eq!(out.matches("<script").count(), 1);
    }

    #[test]
    fn test_linked_entry_component_is_script_target() {
        let entry = "<html><head><script src=\"helpers.js\"></script></head><body><div id=\"root\"></div><script type=\"text/babel\" src=\"App.js\"></script></body></html>";
        let c = classify("index.html", entry);
        let b = Bundles {
            entry_component: Some("App.js".into()),
            ..bundles("", "render(<App />)")
        };
        let out = assemble(entry, &c, &b, &PreviewConfig::default()).into_string();
        assert_eq!(
            out,
            "<html><head><style></style></head><body><div id=\"root\"></div><script type=\"text/babel\">render(<App />)</script></body></html>"
        );
    }

    #[test]
    fn test_preferred_mode_is_script_target() {
        let entry = "<html><head><script src=\"a.js\"></script></head><body><script type=\"module\" src=\"main.js\"></script></body></html>";
        let out = run(entry, "", "go()");
        assert_eq!(
            out,
            "<html><head><style></style></head><body><script type=\"module\">go()</script></body></html>"
        );
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = AssembledDocument::new("<p>x</p>".into());
        let b = AssembledDocument::new("<p>x</p>".into());
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
        assert_ne!(a.fingerprint(), AssembledDocument::new("<p>y</p>".into()).fingerprint());
    }
}
