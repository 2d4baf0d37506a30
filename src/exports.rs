//! Export discovery for component modules.
//!
//! Finds the name a component module should be published under. Candidates are
//! tried in a fixed order and the first match wins:
//!
//! 1. a named default-exported function (`export default function Card`)
//! 2. a separately named default export (`export default Card;`)
//! 3. any function declaration
//! 4. the file's base name, as a last resort
//!
//! Modules are parsed with oxc. Live-edited code is often half-typed and will
//! not parse, in which case the same ordered patterns run over the raw text.

use lazy_static::lazy_static;
use oxc_allocator::Allocator;
use oxc_ast::ast::{BindingPattern, Declaration, ExportDefaultDeclarationKind, Statement};
use oxc_parser::Parser;
use oxc_span::SourceType;
use regex::Regex;

lazy_static! {
    static ref NAMED_DEFAULT_RE: Regex = Regex::new(
        r"(?m)^\s*export\s+default\s+(?:async\s+)?(?:function\b\s*\*?\s*|class\s+)([A-Za-z_$][\w$]*)"
    )
    .unwrap();
    static ref DEFAULT_REFERENCE_RE: Regex =
        Regex::new(r"(?m)^\s*export\s+default\s+([A-Za-z_$][\w$]*)\s*;?\s*$").unwrap();
    static ref FUNCTION_DECL_RE: Regex =
        Regex::new(r"\bfunction\b\s*\*?\s*([A-Za-z_$][\w$]*)\s*\(").unwrap();
    static ref NAMED_EXPORT_RE: Regex = Regex::new(
        r"(?m)^\s*export\s+(?:(?:const|let|var|class)\s+|(?:async\s+)?function\b\s*\*?\s*)([A-Za-z_$][\w$]*)"
    )
    .unwrap();
}

/// How the default export of a module was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultExport {
    /// `export default function Name` (or `export default class Name`).
    NamedFunction(String),
    /// `export default Name;`
    Reference(String),
    /// No default export; the first function declaration.
    Declaration(String),
    /// Nothing matched; the file's base name.
    FileStem(String),
}

impl DefaultExport {
    pub fn name(&self) -> &str {
        match self {
            DefaultExport::NamedFunction(n)
            | DefaultExport::Reference(n)
            | DefaultExport::Declaration(n)
            | DefaultExport::FileStem(n) => n,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, DefaultExport::FileStem(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleExports {
    pub default: DefaultExport,
    /// `export const/let/var/function/class` names, in source order.
    pub named: Vec<String>,
}

#[derive(Default)]
struct Candidates {
    named_function: Option<String>,
    reference: Option<String>,
    declaration: Option<String>,
    named: Vec<String>,
}

impl Candidates {
    fn into_exports(self, file_stem: &str) -> ModuleExports {
        let default = if let Some(name) = self.named_function {
            DefaultExport::NamedFunction(name)
        } else if let Some(name) = self.reference {
            DefaultExport::Reference(name)
        } else if let Some(name) = self.declaration {
            DefaultExport::Declaration(name)
        } else {
            DefaultExport::FileStem(file_stem.to_string())
        };
        ModuleExports {
            default,
            named: self.named,
        }
    }
}

pub fn discover_exports(source: &str, file_stem: &str) -> ModuleExports {
    let candidates = match structural_candidates(source) {
        Some(found) => found,
        None => {
            tracing::debug!(
                "[LiveCode] '{}' does not parse; matching exports textually",
                file_stem
            );
            textual_candidates(source)
        }
    };
    candidates.into_exports(file_stem)
}

fn structural_candidates(source: &str) -> Option<Candidates> {
    let allocator = Allocator::default();
    let source_type = SourceType::default().with_module(true).with_jsx(true);
    let ret = Parser::new(&allocator, source, source_type).parse();
    if !ret.errors.is_empty() {
        return None;
    }

    let mut found = Candidates::default();
    for stmt in &ret.program.body {
        match stmt {
            Statement::ExportDefaultDeclaration(decl) => match &decl.declaration {
                ExportDefaultDeclarationKind::FunctionDeclaration(func) => {
                    if let Some(id) = &func.id {
                        found.named_function.get_or_insert(id.name.to_string());
                    }
                }
                ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                    if let Some(id) = &class.id {
                        found.named_function.get_or_insert(id.name.to_string());
                    }
                }
                ExportDefaultDeclarationKind::Identifier(ident) => {
                    found.reference.get_or_insert(ident.name.to_string());
                }
                _ => {}
            },
            Statement::FunctionDeclaration(func) => {
                if let Some(id) = &func.id {
                    found.declaration.get_or_insert(id.name.to_string());
                }
            }
            Statement::ExportNamedDeclaration(decl) => match &decl.declaration {
                Some(Declaration::VariableDeclaration(var)) => {
                    for d in &var.declarations {
                        if let BindingPattern::BindingIdentifier(id) = &d.id {
                            found.named.push(id.name.to_string());
                        }
                    }
                }
                Some(Declaration::FunctionDeclaration(func)) => {
                    if let Some(id) = &func.id {
                        found.declaration.get_or_insert(id.name.to_string());
                        found.named.push(id.name.to_string());
                    }
                }
                Some(Declaration::ClassDeclaration(class)) => {
                    if let Some(id) = &class.id {
                        found.named.push(id.name.to_string());
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }
    Some(found)
}

fn textual_candidates(source: &str) -> Candidates {
    let first = |re: &Regex| {
        re.captures(source)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    };
    Candidates {
        named_function: first(&NAMED_DEFAULT_RE),
        reference: first(&DEFAULT_REFERENCE_RE),
        declaration: first(&FUNCTION_DECL_RE),
        named: NAMED_EXPORT_RE
            .captures_iter(source)
            .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
            .collect(),
    }
}
