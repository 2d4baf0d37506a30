//! Source Classifier
//!
//! Looks at the entry markup and answers three questions:
//! 1. Is it a full document or a fragment?
//! 2. Which script binding modes (classic, module, declarative-UI) appear?
//! 3. Which known injection points (local stylesheet links and local script
//!    inclusions) does it contain, and where?
//!
//! Matching is done against a small catalog of tag shapes, not a real HTML
//! parser. Tags inside HTML comments are ignored.

use lazy_static::lazy_static;
use regex::Regex;
use std::ops::Range;

use crate::vfs::{is_script_path, resolve_relative};

lazy_static! {
    static ref FULL_DOCUMENT_RE: Regex = Regex::new(r"(?i)<!doctype\s+html|<html[\s>]").unwrap();
    static ref COMMENT_RE: Regex = Regex::new(r"(?s)<!--.*?-->").unwrap();
    static ref SCRIPT_TAG_RE: Regex =
        Regex::new(r"(?is)<script\b([^>]*)>(.*?)</script\s*>").unwrap();
    static ref LINK_TAG_RE: Regex = Regex::new(r"(?i)<link\b([^>]*?)/?>").unwrap();
    static ref ATTR_RE: Regex =
        Regex::new(r#"(?i)([a-z0-9:_-]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^>\s]+)))?"#).unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentShape {
    FullDocument,
    Fragment,
}

/// How a script is wired into the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingMode {
    Classic,
    Module,
    /// Preprocessed in the page (`type="text/babel"`), allows JSX.
    Declarative,
}

impl BindingMode {
    /// Value for the `type` attribute of an inline script, if one is needed.
    pub fn type_attribute(self) -> Option<&'static str> {
        match self {
            BindingMode::Classic => None,
            BindingMode::Module => Some("module"),
            BindingMode::Declarative => Some("text/babel"),
        }
    }

    fn from_type(script_type: Option<&str>) -> Option<Self> {
        let Some(t) = script_type else {
            return Some(BindingMode::Classic);
        };
        match t.trim().to_ascii_lowercase().as_str() {
            "" | "text/javascript" | "application/javascript" | "text/ecmascript" => {
                Some(BindingMode::Classic)
            }
            "module" => Some(BindingMode::Module),
            "text/babel" | "text/jsx" => Some(BindingMode::Declarative),
            // JSON blobs, templates and the like are not scripts.
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindingModes {
    pub classic: bool,
    pub module: bool,
    pub declarative: bool,
}

impl BindingModes {
    fn mark(&mut self, mode: BindingMode) {
        match mode {
            BindingMode::Classic => self.classic = true,
            BindingMode::Module => self.module = true,
            BindingMode::Declarative => self.declarative = true,
        }
    }

    /// Mode for a script the assembler has to add on its own:
    /// module if seen, else declarative-UI if seen, else classic.
    pub fn preferred(&self) -> BindingMode {
        if self.module {
            BindingMode::Module
        } else if self.declarative {
            BindingMode::Declarative
        } else {
            BindingMode::Classic
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionKind {
    StylesheetLink,
    ClassicScript,
    ModuleScript,
    DeclarativeScript,
}

impl InjectionKind {
    pub fn is_script(self) -> bool {
        !matches!(self, InjectionKind::StylesheetLink)
    }

    pub fn binding_mode(self) -> Option<BindingMode> {
        match self {
            InjectionKind::StylesheetLink => None,
            InjectionKind::ClassicScript => Some(BindingMode::Classic),
            InjectionKind::ModuleScript => Some(BindingMode::Module),
            InjectionKind::DeclarativeScript => Some(BindingMode::Declarative),
        }
    }

    fn for_mode(mode: BindingMode) -> Self {
        match mode {
            BindingMode::Classic => InjectionKind::ClassicScript,
            BindingMode::Module => InjectionKind::ModuleScript,
            BindingMode::Declarative => InjectionKind::DeclarativeScript,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagAttribute {
    pub name: String,
    pub value: Option<String>,
}

/// A recognized tag that references a project file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionPoint {
    pub kind: InjectionKind,
    /// Byte range of the whole tag in the entry.
    pub span: Range<usize>,
    /// Referenced project path, resolved against the entry.
    pub path: String,
    pub attributes: Vec<TagAttribute>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryClassification {
    pub shape: DocumentShape,
    pub modes: BindingModes,
    /// In document order.
    pub injection_points: Vec<InjectionPoint>,
}

impl EntryClassification {
    pub fn is_full_document(&self) -> bool {
        self.shape == DocumentShape::FullDocument
    }

    pub fn stylesheet_points(&self) -> impl Iterator<Item = &InjectionPoint> {
        self.injection_points
            .iter()
            .filter(|p| p.kind == InjectionKind::StylesheetLink)
    }

    pub fn script_points(&self) -> impl Iterator<Item = &InjectionPoint> {
        self.injection_points.iter().filter(|p| p.kind.is_script())
    }

    /// The file a declarative-UI script inclusion points at.
    pub fn entry_component(&self) -> Option<&str> {
        self.injection_points
            .iter()
            .find(|p| p.kind == InjectionKind::DeclarativeScript)
            .map(|p| p.path.as_str())
    }

    /// Neither a full document nor using any known injection point.
    pub fn is_unrecognized(&self) -> bool {
        !self.is_full_document() && self.injection_points.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLASSIFICATION
// ═══════════════════════════════════════════════════════════════════════════════

pub fn classify(entry_path: &str, content: &str) -> EntryClassification {
    let shape = if FULL_DOCUMENT_RE.is_match(content) {
        DocumentShape::FullDocument
    } else {
        DocumentShape::Fragment
    };

    let comments: Vec<Range<usize>> = COMMENT_RE.find_iter(content).map(|m| m.range()).collect();
    let in_comment = |pos: usize| comments.iter().any(|r| r.contains(&pos));

    let mut modes = BindingModes::default();
    let mut injection_points = Vec::new();

    for caps in SCRIPT_TAG_RE.captures_iter(content) {
        let whole = caps.get(0).map(|m| m.range()).unwrap_or_default();
        if in_comment(whole.start) {
            continue;
        }
        let attributes = parse_attributes(caps.get(1).map_or("", |m| m.as_str()));
        let Some(mode) = BindingMode::from_type(attribute(&attributes, "type")) else {
            continue;
        };
        modes.mark(mode);

        let body = caps.get(2).map_or("", |m| m.as_str());
        if !body.trim().is_empty() {
            continue;
        }
        let Some(src) = attribute(&attributes, "src") else {
            continue;
        };
        if !is_local(src) || !is_script_path(strip_query(src)) {
            continue;
        }
        injection_points.push(InjectionPoint {
            kind: InjectionKind::for_mode(mode),
            span: whole,
            path: resolve_relative(entry_path, strip_query(src)),
            attributes,
        });
    }

    for caps in LINK_TAG_RE.captures_iter(content) {
        let whole = caps.get(0).map(|m| m.range()).unwrap_or_default();
        if in_comment(whole.start) {
            continue;
        }
        let attributes = parse_attributes(caps.get(1).map_or("", |m| m.as_str()));
        let is_stylesheet = attribute(&attributes, "rel")
            .map(|rel| {
                rel.split_whitespace()
                    .any(|r| r.eq_ignore_ascii_case("stylesheet"))
            })
            .unwrap_or(false);
        let Some(href) = attribute(&attributes, "href") else {
            continue;
        };
        let href = strip_query(href);
        if !is_stylesheet || !is_local(href) || !href.to_ascii_lowercase().ends_with(".css") {
            continue;
        }
        injection_points.push(InjectionPoint {
            kind: InjectionKind::StylesheetLink,
            span: whole,
            path: resolve_relative(entry_path, href),
            attributes,
        });
    }

    injection_points.sort_by_key(|p| p.span.start);

    tracing::debug!(
        "[LiveCode] Classified {}: {:?}, modes {:?}, {} injection point(s)",
        entry_path,
        shape,
        modes,
        injection_points.len()
    );

    EntryClassification {
        shape,
        modes,
        injection_points,
    }
}

pub fn parse_attributes(attr_string: &str) -> Vec<TagAttribute> {
    ATTR_RE
        .captures_iter(attr_string)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str().to_string());
            Some(TagAttribute {
                name: name.to_ascii_lowercase(),
                value,
            })
        })
        .collect()
}

fn attribute<'a>(attributes: &'a [TagAttribute], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|a| a.name == name)
        .map(|a| a.value.as_deref().unwrap_or(""))
}

fn is_local(url: &str) -> bool {
    let lower = url.trim().to_ascii_lowercase();
    !(lower.is_empty()
        || lower.starts_with("http:")
        || lower.starts_with("https:")
        || lower.starts_with("//")
        || lower.starts_with("data:")
        || lower.starts_with("blob:"))
}

fn strip_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url).trim()
}
