//! Source Transform Pipeline
//!
//! Builds the two bundles the assembler splices into the entry document:
//!
//! - **Stylesheet bundle**: every `.css` file, in insertion order.
//! - **Script bundle**: when component linkage is active, the namespace
//!   declaration, then every component module (insertion order), then the
//!   entry component, then the remaining plain scripts (insertion order).
//!   Otherwise every script file in insertion order, untouched.
//!
//! Linkage is active only when the entry includes a declarative-UI script
//! that points at a file of the project (the entry component).
//!
//! ## Rewriting conventions
//!
//! Component modules run inside their own function scope and publish into the
//! namespace object:
//! - `import React, { useState } from 'react'` → `const { useState } = React;`
//! - `export default function Card(` → `function Card(`
//! - `export default Card;` → `__modules["Card"] = Card;`
//! - `import Button from './Button'` → `const Button = __modules["Button"];`
//!
//! The entry component runs at top level. Its UI-library imports and
//! `export default` lines are stripped; its component imports become reads off
//! the namespace.
//!
//! Rewrites are line-local: a removed single-line import leaves an empty line
//! and generated declarations take the place of the statement they replace.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::classify::EntryClassification;
use crate::config::PreviewConfig;
use crate::error::Diagnostic;
use crate::exports::{discover_exports, DefaultExport};
use crate::symbols::SymbolTable;
use crate::vfs::{resolve_relative, FileRole, ProjectSnapshot, VirtualFile};

lazy_static! {
    static ref IMPORT_FROM_RE: Regex = Regex::new(
        r#"(?m)^[ \t]*import\s+([\w$*{},\s]+?)\s+from\s*['"]([^'"\n]+)['"][ \t]*;?[ \t]*$"#
    )
    .unwrap();
    static ref IMPORT_BARE_RE: Regex =
        Regex::new(r#"(?m)^[ \t]*import\s*['"]([^'"\n]+)['"][ \t]*;?[ \t]*$"#).unwrap();
    static ref EXPORT_DEFAULT_DECL_RE: Regex = Regex::new(
        r"(?m)^([ \t]*)export\s+default\s+((?:async\s+)?(?:function|class)\b)"
    )
    .unwrap();
    static ref EXPORT_DEFAULT_NAME_RE: Regex =
        Regex::new(r"(?m)^([ \t]*)export\s+default\s+([A-Za-z_$][\w$]*)[ \t]*;?[ \t]*$").unwrap();
    static ref EXPORT_DEFAULT_EXPR_RE: Regex =
        Regex::new(r"(?m)^([ \t]*)export\s+default\s+").unwrap();
    static ref EXPORT_NAMED_DECL_RE: Regex = Regex::new(
        r"(?m)^([ \t]*)export\s+((?:const|let|var|class|async|function)\b)"
    )
    .unwrap();
    static ref EXPORT_LIST_RE: Regex =
        Regex::new(r"(?m)^([ \t]*)export\s*\{([^}]*)\}[ \t]*;?[ \t]*$").unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// Ends every script fragment. A bare newline would let a fragment that starts
/// with `(` or `[` continue the expression of the one before it.
const SCRIPT_SEPARATOR: &str = "\n;\n";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bundles {
    pub stylesheet: String,
    pub script: String,
    /// Path of the entry component, when component linkage was active.
    pub entry_component: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub bundles: Bundles,
    pub diagnostics: Vec<Diagnostic>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// BUNDLING
// ═══════════════════════════════════════════════════════════════════════════════

pub fn build_bundles(
    snapshot: &ProjectSnapshot,
    classification: &EntryClassification,
    config: &PreviewConfig,
) -> TransformOutput {
    let prefix = config.components_prefix.as_str();
    let stylesheet = join_contents(snapshot.files_with_role(FileRole::Stylesheet, prefix), "\n");

    let entry_component = classification
        .entry_component()
        .and_then(|path| snapshot.get(path));

    let Some(entry_component) = entry_component else {
        let script = join_contents(
            snapshot
                .files()
                .filter(|f| snapshot.role_of(&f.path, prefix).is_script()),
            SCRIPT_SEPARATOR,
        );
        tracing::debug!(
            "[LiveCode] Plain bundles: {} byte(s) css, {} byte(s) js",
            stylesheet.len(),
            script.len()
        );
        return TransformOutput {
            bundles: Bundles {
                stylesheet,
                script,
                entry_component: None,
            },
            diagnostics: Vec::new(),
        };
    };

    let mut diagnostics = Vec::new();
    let components: Vec<&VirtualFile> = snapshot
        .files_with_role(FileRole::ComponentModule, prefix)
        .filter(|f| f.path != entry_component.path)
        .collect();

    // Pass 1: discover what every component publishes.
    let mut table = SymbolTable::new(&config.namespace);
    for file in &components {
        let exports = discover_exports(&file.content, file.stem());
        if exports.default.is_fallback() {
            diagnostics.push(Diagnostic::UnresolvedComponentExport {
                path: file.path.clone(),
                fallback: exports.default.name().to_string(),
            });
        }
        table.register(&file.path, exports);
    }

    // Pass 2: rewrite in execution order.
    let mut fragments = vec![table.declaration()];
    for file in &components {
        fragments.push(rewrite_component(file, &table, config, &mut diagnostics));
    }
    fragments.push(rewrite_entry_component(
        entry_component,
        &table,
        config,
        &mut diagnostics,
    ));
    fragments.extend(
        snapshot
            .files_with_role(FileRole::Script, prefix)
            .filter(|f| f.path != entry_component.path)
            .map(|f| f.content.clone()),
    );

    let script = fragments.join(SCRIPT_SEPARATOR);
    tracing::debug!(
        "[LiveCode] Linked {} component(s) into entry component {}: {} byte(s) css, {} byte(s) js",
        components.len(),
        entry_component.path,
        stylesheet.len(),
        script.len()
    );

    TransformOutput {
        bundles: Bundles {
            stylesheet,
            script,
            entry_component: Some(entry_component.path.clone()),
        },
        diagnostics,
    }
}

fn join_contents<'a>(files: impl Iterator<Item = &'a VirtualFile>, separator: &str) -> String {
    files
        .map(|f| f.content.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}

// ═══════════════════════════════════════════════════════════════════════════════
// MODULE REWRITING
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModuleKind {
    Component,
    EntryComponent,
}

/// Rewrite a component module into a self-publishing function scope.
pub fn rewrite_component(
    file: &VirtualFile,
    table: &SymbolTable,
    config: &PreviewConfig,
    diagnostics: &mut Vec<Diagnostic>,
) -> String {
    let fallback;
    let exports = match table.exports_of(&file.path) {
        Some(exports) => exports,
        None => {
            fallback = discover_exports(&file.content, file.stem());
            &fallback
        }
    };
    let default_name = exports.default.name();

    let code = rewrite_imports(
        &file.content,
        &file.path,
        ModuleKind::Component,
        table,
        config,
        diagnostics,
    );

    let code = EXPORT_DEFAULT_DECL_RE.replace_all(&code, "${1}${2}");

    let mut published_inline = false;
    let code = EXPORT_DEFAULT_NAME_RE.replace_all(&code, |caps: &Captures| {
        published_inline = true;
        format!("{}{}", &caps[1], table.publish_stmt(default_name, &caps[2]))
    });
    let code = EXPORT_DEFAULT_EXPR_RE.replace_all(&code, |caps: &Captures| {
        published_inline = true;
        format!("{}{} = ", &caps[1], table.read_expr(default_name))
    });

    let mut publishes = Vec::new();
    let code = EXPORT_LIST_RE.replace_all(&code, |caps: &Captures| {
        for (local, exported) in parse_specifiers(&caps[2]) {
            publishes.push(table.publish_stmt(&exported, &local));
        }
        caps[1].to_string()
    });
    let code = EXPORT_NAMED_DECL_RE.replace_all(&code, "${1}${2}");

    if !published_inline {
        let value = match &exports.default {
            DefaultExport::FileStem(name) => {
                format!("typeof {0} !== \"undefined\" ? {0} : undefined", name)
            }
            other => other.name().to_string(),
        };
        publishes.insert(0, table.publish_stmt(default_name, &value));
    }
    for name in &exports.named {
        publishes.push(table.publish_stmt(name, name));
    }

    let mut out = String::with_capacity(code.len() + 64);
    out.push_str("(function () {\n");
    out.push_str(code.trim_end());
    out.push('\n');
    for stmt in &publishes {
        out.push_str(stmt);
        out.push('\n');
    }
    out.push_str("})();");
    out
}

/// Rewrite the entry component so it runs at top level after all components.
pub fn rewrite_entry_component(
    file: &VirtualFile,
    table: &SymbolTable,
    config: &PreviewConfig,
    diagnostics: &mut Vec<Diagnostic>,
) -> String {
    let code = rewrite_imports(
        &file.content,
        &file.path,
        ModuleKind::EntryComponent,
        table,
        config,
        diagnostics,
    );
    let code = EXPORT_DEFAULT_DECL_RE.replace_all(&code, "${1}${2}");
    let code = EXPORT_DEFAULT_NAME_RE.replace_all(&code, "");
    let code = EXPORT_DEFAULT_EXPR_RE.replace_all(&code, "${1}");
    let code = EXPORT_LIST_RE.replace_all(&code, "");
    let code = EXPORT_NAMED_DECL_RE.replace_all(&code, "${1}${2}");
    code.into_owned()
}

// ═══════════════════════════════════════════════════════════════════════════════
// IMPORTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportClause {
    pub default: Option<String>,
    pub namespace: Option<String>,
    /// `(imported, local)` pairs.
    pub named: Vec<(String, String)>,
}

pub fn parse_import_clause(clause: &str) -> ImportClause {
    let mut result = ImportClause::default();
    let (head, braces) = match (clause.find('{'), clause.rfind('}')) {
        (Some(open), Some(close)) if open < close => (
            format!("{}{}", &clause[..open], &clause[close + 1..]),
            Some(&clause[open + 1..close]),
        ),
        _ => (clause.to_string(), None),
    };

    for part in head.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if let Some(rest) = part.strip_prefix('*') {
            let local = rest.trim().trim_start_matches("as").trim();
            if !local.is_empty() {
                result.namespace = Some(local.to_string());
            }
        } else {
            result.default = Some(part.to_string());
        }
    }
    if let Some(inner) = braces {
        result.named = parse_specifiers(inner);
    }
    result
}

/// Parse `a, b as c` into `(a, a)`, `(b, c)` pairs.
fn parse_specifiers(list: &str) -> Vec<(String, String)> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|spec| {
            let spec = spec.strip_prefix("type ").unwrap_or(spec).trim();
            match spec.split_once(" as ") {
                Some((imported, local)) => (imported.trim().to_string(), local.trim().to_string()),
                None => (spec.to_string(), spec.to_string()),
            }
        })
        .collect()
}

enum ImportTarget<'a> {
    Library(&'a str),
    Component(&'a str),
    Stylesheet,
    UnresolvedLocal,
    Unsupported,
}

fn import_target<'a>(
    importer: &str,
    source: &str,
    table: &'a SymbolTable,
    config: &'a PreviewConfig,
) -> ImportTarget<'a> {
    if let Some(global) = config.library_global(source) {
        return ImportTarget::Library(global);
    }
    if !(source.starts_with('.') || source.starts_with('/')) {
        return ImportTarget::Unsupported;
    }
    let resolved = resolve_relative(importer, source);
    if resolved.to_ascii_lowercase().ends_with(".css") {
        return ImportTarget::Stylesheet;
    }
    match table.resolve_module(&resolved) {
        Some(module) => ImportTarget::Component(module),
        None => ImportTarget::UnresolvedLocal,
    }
}

fn rewrite_imports(
    source: &str,
    importer: &str,
    kind: ModuleKind,
    table: &SymbolTable,
    config: &PreviewConfig,
    diagnostics: &mut Vec<Diagnostic>,
) -> String {
    let reader_order = table.order_of(importer);

    let code = IMPORT_BARE_RE.replace_all(source, |caps: &Captures| {
        match import_target(importer, &caps[1], table, config) {
            ImportTarget::Stylesheet | ImportTarget::Library(_) => String::new(),
            _ => {
                diagnostics.push(Diagnostic::UnsupportedImport {
                    importer: importer.to_string(),
                    source: caps[1].to_string(),
                });
                caps[0].to_string()
            }
        }
    });

    let code = IMPORT_FROM_RE.replace_all(&code, |caps: &Captures| {
        let clause = parse_import_clause(&caps[1]);
        let source = &caps[2];
        match import_target(importer, source, table, config) {
            ImportTarget::Library(global) => match kind {
                ModuleKind::EntryComponent => String::new(),
                ModuleKind::Component => library_bindings(&clause, global),
            },
            ImportTarget::Stylesheet => String::new(),
            ImportTarget::Component(module) => {
                if let (Some(reader), Some(publisher)) = (reader_order, table.order_of(module)) {
                    if publisher >= reader {
                        for (_, local) in clause_locals(&clause) {
                            diagnostics.push(Diagnostic::PublishAfterRead {
                                reader: importer.to_string(),
                                name: local,
                            });
                        }
                    }
                }
                let default_key = table
                    .exports_of(module)
                    .map(|e| e.default.name().to_string());
                namespace_reads(&clause, default_key.as_deref(), table)
            }
            ImportTarget::UnresolvedLocal => {
                diagnostics.push(Diagnostic::UnresolvedImport {
                    importer: importer.to_string(),
                    source: source.to_string(),
                });
                namespace_reads(&clause, None, table)
            }
            ImportTarget::Unsupported => {
                diagnostics.push(Diagnostic::UnsupportedImport {
                    importer: importer.to_string(),
                    source: source.to_string(),
                });
                caps[0].to_string()
            }
        }
    });

    code.into_owned()
}

/// `import React, { useState as useS } from 'react'` → `const { useState: useS } = React;`
fn library_bindings(clause: &ImportClause, global: &str) -> String {
    let mut stmts = Vec::new();
    for local in clause.default.iter().chain(clause.namespace.iter()) {
        if local != global {
            stmts.push(format!("const {} = {};", local, global));
        }
    }
    if !clause.named.is_empty() {
        let bindings = clause
            .named
            .iter()
            .map(|(imported, local)| {
                if imported == local {
                    imported.clone()
                } else {
                    format!("{}: {}", imported, local)
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        stmts.push(format!("const {{ {} }} = {};", bindings, global));
    }
    stmts.join(" ")
}

/// Local bindings an import introduces, paired with the key each one reads.
fn clause_locals(clause: &ImportClause) -> Vec<(String, String)> {
    let mut locals = Vec::new();
    if let Some(default) = &clause.default {
        locals.push((default.clone(), default.clone()));
    }
    locals.extend(clause.named.iter().cloned());
    locals
}

fn namespace_reads(clause: &ImportClause, default_key: Option<&str>, table: &SymbolTable) -> String {
    let mut stmts = Vec::new();
    if let Some(local) = &clause.default {
        let key = default_key.unwrap_or(local);
        stmts.push(format!("const {} = {};", local, table.read_expr(key)));
    }
    if let Some(local) = &clause.namespace {
        stmts.push(format!("const {} = {};", local, table.namespace()));
    }
    for (imported, local) in &clause.named {
        stmts.push(format!("const {} = {};", local, table.read_expr(imported)));
    }
    stmts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_import_clause() {
        let c = parse_import_clause("React, { useState, useEffect as useFx }");
        assert_eq!(c.default.as_deref(), Some("React"));
        assert_eq!(
            c.named,
            vec![
                ("useState".to_string(), "useState".to_string()),
                ("useEffect".to_string(), "useFx".to_string())
            ]
        );

        let c = parse_import_clause("* as Lib");
        assert_eq!(c.namespace.as_deref(), Some("Lib"));
        assert!(c.default.is_none());

        let c = parse_import_clause("{\n  Card,\n  Button,\n}");
        assert_eq!(c.named.len(), 2);
    }

    #[test]
    fn test_script_fragments_are_terminated() {
        let snapshot = ProjectSnapshot::from_pairs(
            "index.html",
            [
                ("index.html", "<p>x</p>"),
                ("a.js", "const f = () => 1"),
                ("b.js", "(function () { f(); })()"),
            ],
        )
        .unwrap();
        let classification = crate::classify::classify("index.html", "<p>x</p>");
        let out = build_bundles(&snapshot, &classification, &PreviewConfig::default());
        assert_eq!(
            out.bundles.script,
            "const f = () => 1\n;\n(function () { f(); })()"
        );
        assert!(out.bundles.entry_component.is_none());
    }

    #[test]
    fn test_entry_component_must_exist() {
        let entry = "<script type=\"text/babel\" src=\"App.js\"></script>";
        let snapshot = ProjectSnapshot::from_pairs(
            "index.html",
            [("index.html", entry), ("components/Card.js", "function Card() {}")],
        )
        .unwrap();
        let classification = crate::classify::classify("index.html", entry);
        let out = build_bundles(&snapshot, &classification, &PreviewConfig::default());
        assert!(out.bundles.entry_component.is_none());
        assert_eq!(out.bundles.script, "function Card() {}");
    }

    #[test]
    fn test_library_bindings() {
        let clause = parse_import_clause("React, { useState }");
        assert_eq!(library_bindings(&clause, "React"), "const { useState } = React;");

        let clause = parse_import_clause("R");
        assert_eq!(library_bindings(&clause, "React"), "const R = React;");

        let clause = parse_import_clause("React");
        assert_eq!(library_bindings(&clause, "React"), "");
    }
}
