//! Recompute loop.
//!
//! [`LivePreview`] ties the editing surface to the renderer. Every mutation
//! (new project, file selection, content edit) rebuilds the whole document
//! and renders it before returning, so edit N is fully on screen before edit
//! N+1 is applied. There is no batching and no debounce.

use crate::catalog::LessonCatalog;
use crate::config::PreviewConfig;
use crate::error::{Diagnostic, LiveCodeError};
use crate::pipeline::{build_preview, PreviewBuild};
use crate::render::PreviewRenderer;
use crate::vfs::{ProjectSnapshot, VirtualFileStore};

pub struct LivePreview<R: PreviewRenderer> {
    store: VirtualFileStore,
    config: PreviewConfig,
    renderer: R,
    last: Option<PreviewBuild>,
    renders: u64,
}

impl<R: PreviewRenderer> LivePreview<R> {
    /// Start a session on `snapshot` and render it once.
    pub fn new(
        snapshot: ProjectSnapshot,
        config: PreviewConfig,
        renderer: R,
    ) -> Result<Self, LiveCodeError> {
        config.validate()?;
        let mut session = Self {
            store: VirtualFileStore::new(snapshot),
            config,
            renderer,
            last: None,
            renders: 0,
        };
        session.recompute();
        Ok(session)
    }

    /// Replace the active project.
    pub fn load(&mut self, snapshot: ProjectSnapshot) {
        tracing::info!(
            "[LiveCode] Loading project ({} file(s), entry {})",
            snapshot.len(),
            snapshot.entry_path()
        );
        self.store.reset(snapshot);
        self.recompute();
    }

    pub fn load_lesson(
        &mut self,
        catalog: &LessonCatalog,
        topic: &str,
        subtopic: &str,
    ) -> Result<(), LiveCodeError> {
        let snapshot = catalog.get(topic, subtopic)?.clone();
        self.load(snapshot);
        Ok(())
    }

    pub fn select(&mut self, path: &str) -> Result<(), LiveCodeError> {
        self.store.select(path)?;
        self.recompute();
        Ok(())
    }

    pub fn set_content(&mut self, path: &str, text: &str) -> Result<(), LiveCodeError> {
        self.store.write(path, text)?;
        self.recompute();
        Ok(())
    }

    pub fn content(&self, path: &str) -> Option<&str> {
        self.store.read(path)
    }

    pub fn active_path(&self) -> Option<&str> {
        self.store.active_path()
    }

    pub fn snapshot(&self) -> &ProjectSnapshot {
        self.store.snapshot()
    }

    /// Diagnostics of the most recent build.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.last
            .as_ref()
            .map(|b| b.diagnostics.as_slice())
            .unwrap_or(&[])
    }

    pub fn last_build(&self) -> Option<&PreviewBuild> {
        self.last.as_ref()
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Number of documents handed to the renderer so far.
    pub fn render_count(&self) -> u64 {
        self.renders
    }

    pub fn recompute(&mut self) {
        let build = build_preview(self.store.snapshot(), &self.config);
        self.renderer.render(&build.document);
        self.renders += 1;
        tracing::debug!(
            "[LiveCode] Render #{} ({} diagnostic(s))",
            self.renders,
            build.diagnostics.len()
        );
        self.last = Some(build);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::AssembledDocument;
    use crate::render::{SandboxPolicy, SrcdocFrame};

    #[derive(Default)]
    struct RecordingRenderer {
        documents: Vec<String>,
    }

    impl PreviewRenderer for RecordingRenderer {
        fn render(&mut self, document: &AssembledDocument) {
            self.documents.push(document.as_str().to_string());
        }
    }

    fn project() -> ProjectSnapshot {
        ProjectSnapshot::from_pairs(
            "index.html",
            [
                ("index.html", "<h1>Hi</h1>"),
                ("styles.css", "h1 { color: red; }"),
                ("script.js", "console.log('one');"),
            ],
        )
        .unwrap()
    }

    fn session() -> LivePreview<RecordingRenderer> {
        LivePreview::new(project(), PreviewConfig::default(), RecordingRenderer::default()).unwrap()
    }

    #[test]
    fn test_initial_render() {
        let s = session();
        assert_eq!(s.render_count(), 1);
        assert_eq!(s.active_path(), Some("index.html"));
        assert!(s.renderer().documents[0].contains("console.log('one');"));
    }

    #[test]
    fn test_each_mutation_renders_once() {
        let mut s = session();

        s.set_content("script.js", "console.log('two');").unwrap();
        assert_eq!(s.render_count(), 2);
        assert!(s.renderer().documents[1].contains("console.log('two');"));
        assert_eq!(s.content("script.js"), Some("console.log('two');"));

        s.select("styles.css").unwrap();
        assert_eq!(s.render_count(), 3);
        assert_eq!(s.active_path(), Some("styles.css"));

        s.load(project());
        assert_eq!(s.render_count(), 4);
        assert_eq!(s.active_path(), Some("index.html"));
        assert!(s.renderer().documents[3].contains("console.log('one');"));
    }

    #[test]
    fn test_unknown_path_does_not_render() {
        let mut s = session();
        assert!(matches!(
            s.set_content("missing.js", "x"),
            Err(LiveCodeError::UnknownPath { .. })
        ));
        assert!(s.select("missing.js").is_err());
        assert_eq!(s.render_count(), 1);
        assert_eq!(s.snapshot().len(), 3);
    }

    #[test]
    fn test_selection_does_not_change_document() {
        let mut s = session();
        s.select("script.js").unwrap();
        let docs = &s.renderer().documents;
        assert_eq!(docs[0], docs[1]);
    }

    #[test]
    fn test_insecure_config_rejected() {
        let mut config = PreviewConfig::default();
        config.sandbox = SandboxPolicy {
            tokens: vec!["allow-scripts".into(), "allow-same-origin".into()],
        };
        assert!(LivePreview::new(project(), config, RecordingRenderer::default()).is_err());
    }

    #[test]
    fn test_load_lesson() {
        let mut catalog = LessonCatalog::new();
        let other = ProjectSnapshot::from_pairs("index.html", [("index.html", "<p>Other</p>")]).unwrap();
        catalog.insert("html", "paragraphs", other);

        let mut s = session();
        s.load_lesson(&catalog, "html", "paragraphs").unwrap();
        assert_eq!(s.render_count(), 2);
        assert!(s.renderer().documents[1].contains("<p>Other</p>"));

        assert!(matches!(
            s.load_lesson(&catalog, "html", "tables"),
            Err(LiveCodeError::UnknownLesson { .. })
        ));
        assert_eq!(s.render_count(), 2);
    }

    #[test]
    fn test_diagnostics_track_last_build() {
        let mut s = session();
        assert!(s.diagnostics().iter().all(|d| d.code() == "LC-W001"));

        s.load(ProjectSnapshot::from_pairs("index.html", [("other.html", "<p>x</p>")]).unwrap());
        assert!(s
            .diagnostics()
            .contains(&Diagnostic::MissingEntry { path: "index.html".into() }));
    }

    #[test]
    fn test_srcdoc_frame_session() {
        let frame = SrcdocFrame::new(SandboxPolicy::default()).unwrap();
        let mut s = LivePreview::new(project(), PreviewConfig::default(), frame).unwrap();
        s.set_content("index.html", "<h2>Edited</h2>").unwrap();
        let markup = s.renderer().markup().unwrap();
        assert!(markup.contains("&lt;h2&gt;Edited&lt;/h2&gt;"));
        assert!(!markup.contains("&lt;h1&gt;"));
    }
}
