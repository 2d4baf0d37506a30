//! Symbol table for component linkage.
//!
//! Component modules cannot `import` each other inside the sandbox, so each
//! one publishes its exports into a namespace object and readers take them
//! from there. The table records, at build time, what each module publishes
//! and in what order the modules run. Import resolution and
//! publish-before-read checks both go through it.

use std::collections::HashMap;

use crate::exports::ModuleExports;

#[derive(Debug, Clone)]
pub struct SymbolTable {
    namespace: String,
    modules: Vec<(String, ModuleExports)>,
    module_index: HashMap<String, usize>,
}

const MODULE_SUFFIXES: &[&str] = &["", ".js", ".jsx", ".mjs", "/index.js", "/index.jsx"];

impl SymbolTable {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            modules: Vec::new(),
            module_index: HashMap::new(),
        }
    }

    /// Register a module. Modules run in registration order.
    pub fn register(&mut self, path: &str, exports: ModuleExports) {
        let order = self.modules.len();
        self.module_index.insert(path.to_string(), order);
        self.modules.push((path.to_string(), exports));
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Find the registered module an extension-less import path refers to.
    pub fn resolve_module(&self, path: &str) -> Option<&str> {
        MODULE_SUFFIXES.iter().find_map(|suffix| {
            let candidate = format!("{}{}", path, suffix);
            self.module_index
                .get(&candidate)
                .map(|&idx| self.modules[idx].0.as_str())
        })
    }

    pub fn exports_of(&self, module: &str) -> Option<&ModuleExports> {
        self.module_index
            .get(module)
            .map(|&idx| &self.modules[idx].1)
    }

    pub fn order_of(&self, module: &str) -> Option<usize> {
        self.module_index.get(module).copied()
    }

    // ───────────────────────────────────────────────────────────────────────
    // Emitted code
    // ───────────────────────────────────────────────────────────────────────

    /// Declares the namespace; must come first in the script bundle.
    pub fn declaration(&self) -> String {
        format!("const {} = {{}};", self.namespace)
    }

    pub fn read_expr(&self, name: &str) -> String {
        format!("{}[\"{}\"]", self.namespace, name)
    }

    pub fn publish_stmt(&self, name: &str, value: &str) -> String {
        format!("{} = {};", self.read_expr(name), value)
    }
}
