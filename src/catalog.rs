//! Lesson catalog.
//!
//! The content side of the portal ships one project snapshot per
//! `(topic, subtopic)`. The catalog is how a new project enters the preview:
//! selecting a topic looks the snapshot up here and replaces the active one.

use serde::{Deserialize, Serialize};

use crate::error::LiveCodeError;
use crate::vfs::ProjectSnapshot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub topic: String,
    pub subtopic: String,
    pub snapshot: ProjectSnapshot,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonCatalog {
    lessons: Vec<Lesson>,
}

impl LessonCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, LiveCodeError> {
        let catalog: LessonCatalog = serde_json::from_str(json)?;
        tracing::info!("[LiveCode] Catalog loaded with {} lesson(s)", catalog.len());
        Ok(catalog)
    }

    /// Add a lesson, replacing any existing one for the same topic pair.
    pub fn insert(&mut self, topic: &str, subtopic: &str, snapshot: ProjectSnapshot) {
        match self
            .lessons
            .iter_mut()
            .find(|l| l.topic == topic && l.subtopic == subtopic)
        {
            Some(lesson) => lesson.snapshot = snapshot,
            None => self.lessons.push(Lesson {
                topic: topic.to_string(),
                subtopic: subtopic.to_string(),
                snapshot,
            }),
        }
    }

    pub fn get(&self, topic: &str, subtopic: &str) -> Result<&ProjectSnapshot, LiveCodeError> {
        self.lessons
            .iter()
            .find(|l| l.topic == topic && l.subtopic == subtopic)
            .map(|l| &l.snapshot)
            .ok_or_else(|| LiveCodeError::UnknownLesson {
                topic: topic.to_string(),
                subtopic: subtopic.to_string(),
            })
    }

    /// Distinct topics in first-seen order.
    pub fn topics(&self) -> Vec<&str> {
        let mut topics: Vec<&str> = Vec::new();
        for lesson in &self.lessons {
            if !topics.contains(&lesson.topic.as_str()) {
                topics.push(&lesson.topic);
            }
        }
        topics
    }

    pub fn subtopics<'a>(&'a self, topic: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.lessons
            .iter()
            .filter(move |l| l.topic == topic)
            .map(|l| l.subtopic.as_str())
    }

    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "lessons": [
            {
                "topic": "react",
                "subtopic": "components",
                "snapshot": {
                    "entry": "index.html",
                    "files": [{ "path": "index.html", "content": "<div id=\"root\"></div>" }]
                }
            },
            {
                "topic": "css",
                "subtopic": "flexbox",
                "snapshot": { "entry": "index.html", "files": [] }
            },
            {
                "topic": "react",
                "subtopic": "state",
                "snapshot": { "entry": "index.html", "files": [] }
            }
        ]
    }"#;

    #[test]
    fn test_lookup() {
        let catalog = LessonCatalog::from_json(CATALOG).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.topics(), ["react", "css"]);
        assert_eq!(catalog.subtopics("react").collect::<Vec<_>>(), ["components", "state"]);
        let snap = catalog.get("react", "components").unwrap();
        assert!(snap.entry().is_some());
    }

    #[test]
    fn test_unknown_lesson() {
        let catalog = LessonCatalog::from_json(CATALOG).unwrap();
        let err = catalog.get("react", "hooks").unwrap_err();
        assert_eq!(err.to_string(), "no live-code lesson for react/hooks");
    }

    #[test]
    fn test_insert_replaces() {
        let mut catalog = LessonCatalog::new();
        let a = ProjectSnapshot::from_pairs("index.html", [("index.html", "a")]).unwrap();
        let b = ProjectSnapshot::from_pairs("index.html", [("index.html", "b")]).unwrap();
        catalog.insert("html", "basics", a);
        catalog.insert("html", "basics", b.clone());
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("html", "basics").unwrap(), &b);
    }

    #[test]
    fn test_duplicate_path_in_json_rejected() {
        let json = r#"{ "lessons": [{ "topic": "t", "subtopic": "s", "snapshot": {
            "entry": "index.html",
            "files": [{ "path": "a.js", "content": "" }, { "path": "a.js", "content": "" }]
        } }] }"#;
        assert!(LessonCatalog::from_json(json).is_err());
    }
}
