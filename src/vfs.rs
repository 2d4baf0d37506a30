//! Virtual File Store
//!
//! A project is a small ordered set of named text files. Order matters: it is
//! the order stylesheets and scripts are concatenated in. Paths are keys, so a
//! snapshot can never hold two files with the same path.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::error::LiveCodeError;

// ═══════════════════════════════════════════════════════════════════════════════
// FILES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualFile {
    pub path: String,
    pub content: String,
}

impl VirtualFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: normalize_path(&path.into()),
            content: content.into(),
        }
    }

    /// File name without directory and extension (`components/Card.jsx` → `Card`).
    pub fn stem(&self) -> &str {
        file_stem(&self.path)
    }
}

/// What a file is used for, derived from its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileRole {
    MarkupEntry,
    Markup,
    Stylesheet,
    ComponentModule,
    Script,
    Other,
}

impl FileRole {
    pub fn is_script(self) -> bool {
        matches!(self, FileRole::Script | FileRole::ComponentModule)
    }
}

pub fn is_script_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.ends_with(".js") || lower.ends_with(".jsx") || lower.ends_with(".mjs")
}

fn is_markup_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.ends_with(".html") || lower.ends_with(".htm")
}

pub fn file_stem(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(0) | None => name,
        Some(dot) => &name[..dot],
    }
}

/// Strip `./` segments and leading slashes, resolve `..`, use `/` separators.
pub fn normalize_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}

/// Resolve an import specifier relative to the importing file.
pub fn resolve_relative(importer: &str, specifier: &str) -> String {
    if specifier.starts_with('/') {
        return normalize_path(specifier);
    }
    let dir = match importer.rfind('/') {
        Some(idx) => &importer[..idx],
        None => "",
    };
    if dir.is_empty() {
        normalize_path(specifier)
    } else {
        normalize_path(&format!("{}/{}", dir, specifier))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROJECT SNAPSHOT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Deserialize)]
struct RawSnapshot {
    entry: String,
    files: Vec<VirtualFile>,
}

/// One live-code example: ordered files plus the designated entry path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSnapshot")]
pub struct ProjectSnapshot {
    entry: String,
    files: Vec<VirtualFile>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl TryFrom<RawSnapshot> for ProjectSnapshot {
    type Error = LiveCodeError;

    fn try_from(raw: RawSnapshot) -> Result<Self, Self::Error> {
        ProjectSnapshot::new(raw.entry, raw.files)
    }
}

impl ProjectSnapshot {
    pub fn new(entry: impl Into<String>, files: Vec<VirtualFile>) -> Result<Self, LiveCodeError> {
        let mut index = HashMap::with_capacity(files.len());
        let mut normalized = Vec::with_capacity(files.len());
        for file in files {
            let file = VirtualFile::new(file.path, file.content);
            if index.insert(file.path.clone(), normalized.len()).is_some() {
                return Err(LiveCodeError::DuplicatePath { path: file.path });
            }
            normalized.push(file);
        }
        Ok(Self {
            entry: normalize_path(&entry.into()),
            files: normalized,
            index,
        })
    }

    /// Build from `(path, content)` pairs, keeping their order.
    pub fn from_pairs<P, C>(
        entry: &str,
        pairs: impl IntoIterator<Item = (P, C)>,
    ) -> Result<Self, LiveCodeError>
    where
        P: Into<String>,
        C: Into<String>,
    {
        let files = pairs
            .into_iter()
            .map(|(path, content)| VirtualFile::new(path, content))
            .collect();
        Self::new(entry, files)
    }

    pub fn from_json(json: &str) -> Result<Self, LiveCodeError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load every file under `root`. Files are ordered by path so the result
    /// does not depend on directory iteration order. Dotfiles are skipped.
    pub fn from_dir(root: &Path, entry: &str) -> Result<Self, LiveCodeError> {
        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

        for entry in walker {
            let entry = entry.map_err(|e| LiveCodeError::Io {
                path: e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf()),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let content = fs::read_to_string(entry.path()).map_err(|source| LiveCodeError::Io {
                path: entry.path().to_path_buf(),
                source,
            })?;
            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .to_string();
            files.push(VirtualFile::new(relative, content));
        }

        tracing::info!(
            "[LiveCode] Loaded {} file(s) from {}",
            files.len(),
            root.display()
        );
        Self::new(entry, files)
    }

    pub fn entry_path(&self) -> &str {
        &self.entry
    }

    pub fn entry(&self) -> Option<&VirtualFile> {
        self.get(&self.entry)
    }

    pub fn get(&self, path: &str) -> Option<&VirtualFile> {
        self.index.get(path).map(|&idx| &self.files[idx])
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    pub fn files(&self) -> impl Iterator<Item = &VirtualFile> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn role_of(&self, path: &str, components_prefix: &str) -> FileRole {
        if path == self.entry {
            FileRole::MarkupEntry
        } else if is_markup_path(path) {
            FileRole::Markup
        } else if path.to_ascii_lowercase().ends_with(".css") {
            FileRole::Stylesheet
        } else if is_script_path(path) {
            if path.starts_with(components_prefix) {
                FileRole::ComponentModule
            } else {
                FileRole::Script
            }
        } else {
            FileRole::Other
        }
    }

    /// Files with `role`, in insertion order.
    pub fn files_with_role<'a>(
        &'a self,
        role: FileRole,
        components_prefix: &'a str,
    ) -> impl Iterator<Item = &'a VirtualFile> + 'a {
        self.files
            .iter()
            .filter(move |f| self.role_of(&f.path, components_prefix) == role)
    }

    fn get_mut(&mut self, path: &str) -> Option<&mut VirtualFile> {
        match self.index.get(path) {
            Some(&idx) => Some(&mut self.files[idx]),
            None => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// The active snapshot plus the editing surface's selected path.
///
/// Single writer: the editing surface. Every mutation goes through here.
#[derive(Debug, Clone)]
pub struct VirtualFileStore {
    snapshot: ProjectSnapshot,
    active: Option<String>,
}

impl VirtualFileStore {
    pub fn new(snapshot: ProjectSnapshot) -> Self {
        let active = initial_active(&snapshot);
        Self { snapshot, active }
    }

    pub fn snapshot(&self) -> &ProjectSnapshot {
        &self.snapshot
    }

    pub fn read(&self, path: &str) -> Option<&str> {
        self.snapshot
            .get(&normalize_path(path))
            .map(|f| f.content.as_str())
    }

    /// Replace the content of an existing file. Files cannot be created here.
    pub fn write(&mut self, path: &str, content: impl Into<String>) -> Result<(), LiveCodeError> {
        let path = normalize_path(path);
        match self.snapshot.get_mut(&path) {
            Some(file) => {
                file.content = content.into();
                Ok(())
            }
            None => Err(LiveCodeError::UnknownPath { path }),
        }
    }

    /// Discard the current project and start over with `snapshot`.
    pub fn reset(&mut self, snapshot: ProjectSnapshot) {
        self.active = initial_active(&snapshot);
        self.snapshot = snapshot;
    }

    pub fn select(&mut self, path: &str) -> Result<(), LiveCodeError> {
        let path = normalize_path(path);
        if !self.snapshot.contains(&path) {
            return Err(LiveCodeError::UnknownPath { path });
        }
        self.active = Some(path);
        Ok(())
    }

    pub fn active_path(&self) -> Option<&str> {
        self.active.as_deref()
    }
}

fn initial_active(snapshot: &ProjectSnapshot) -> Option<String> {
    if snapshot.contains(snapshot.entry_path()) {
        Some(snapshot.entry_path().to_string())
    } else {
        snapshot.files().next().map(|f| f.path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProjectSnapshot {
        ProjectSnapshot::from_pairs(
            "index.html",
            [
                ("index.html", "<h1>Hi</h1>"),
                ("styles.css", "h1 { color: red; }"),
                ("./script.js", "console.log(1);"),
                ("components/Card.js", "export default function Card() {}"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_duplicate_paths_rejected() {
        let result = ProjectSnapshot::from_pairs("index.html", [("a.js", ""), ("./a.js", "")]);
        assert!(matches!(result, Err(LiveCodeError::DuplicatePath { path }) if path == "a.js"));
    }

    #[test]
    fn test_roles() {
        let snap = sample();
        assert_eq!(snap.role_of("index.html", "components/"), FileRole::MarkupEntry);
        assert_eq!(snap.role_of("styles.css", "components/"), FileRole::Stylesheet);
        assert_eq!(snap.role_of("script.js", "components/"), FileRole::Script);
        assert_eq!(
            snap.role_of("components/Card.js", "components/"),
            FileRole::ComponentModule
        );
        assert_eq!(snap.role_of("README.md", "components/"), FileRole::Other);
    }

    #[test]
    fn test_write_requires_existing_path() {
        let mut store = VirtualFileStore::new(sample());
        store.write("./script.js", "alert(2);").unwrap();
        assert_eq!(store.read("script.js"), Some("alert(2);"));

        let err = store.write("new.js", "x").unwrap_err();
        assert!(matches!(err, LiveCodeError::UnknownPath { path } if path == "new.js"));
        assert_eq!(store.snapshot().len(), 4);
    }

    #[test]
    fn test_reset_replaces_wholesale() {
        let mut store = VirtualFileStore::new(sample());
        store.select("styles.css").unwrap();
        let next = ProjectSnapshot::from_pairs("index.html", [("index.html", "<p>x</p>")]).unwrap();
        store.reset(next);
        assert_eq!(store.read("styles.css"), None);
        assert_eq!(store.active_path(), Some("index.html"));
    }

    #[test]
    fn test_select_unknown_path() {
        let mut store = VirtualFileStore::new(sample());
        assert!(store.select("nope.css").is_err());
        assert_eq!(store.active_path(), Some("index.html"));
    }

    #[test]
    fn test_normalize_and_resolve() {
        assert_eq!(normalize_path("./components/../App.js"), "App.js");
        assert_eq!(resolve_relative("App.js", "./components/Card"), "components/Card");
        assert_eq!(
            resolve_relative("components/Card.js", "./Button"),
            "components/Button"
        );
        assert_eq!(resolve_relative("src/App.js", "../components/Card"), "components/Card");
        assert_eq!(file_stem("components/Card.jsx"), "Card");
    }

    #[test]
    fn test_json_round_trip_keeps_order() {
        let json = r#"{
            "entry": "index.html",
            "files": [
                { "path": "b.css", "content": "b" },
                { "path": "a.css", "content": "a" },
                { "path": "index.html", "content": "" }
            ]
        }"#;
        let snap = ProjectSnapshot::from_json(json).unwrap();
        let order: Vec<_> = snap.files().map(|f| f.path.as_str()).collect();
        assert_eq!(order, ["b.css", "a.css", "index.html"]);
        assert!(snap.get("a.css").is_some());
    }

    #[test]
    fn test_from_dir_sorted_and_skips_dotfiles() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("components")).unwrap();
        fs::write(dir.path().join("index.html"), "<h1>x</h1>").unwrap();
        fs::write(dir.path().join("b.js"), "b").unwrap();
        fs::write(dir.path().join("a.js"), "a").unwrap();
        fs::write(dir.path().join(".hidden"), "secret").unwrap();
        fs::write(dir.path().join("components/Card.js"), "card").unwrap();

        let snap = ProjectSnapshot::from_dir(dir.path(), "index.html").unwrap();
        let order: Vec<_> = snap.files().map(|f| f.path.as_str()).collect();
        assert_eq!(order, ["a.js", "b.js", "components/Card.js", "index.html"]);
    }
}
