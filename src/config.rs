//! Preview configuration.
//!
//! The conventions the lesson authors rely on (where components live, which
//! import specifiers name the UI library, how the sandbox is locked down) are
//! data rather than constants so a host can load them from JSON.

use serde::{Deserialize, Serialize};

use crate::error::LiveCodeError;
use crate::render::SandboxPolicy;

/// Maps an import specifier to the global the sandbox already provides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryGlobal {
    pub specifier: String,
    pub global: String,
}

impl LibraryGlobal {
    pub fn new(specifier: &str, global: &str) -> Self {
        Self {
            specifier: specifier.to_string(),
            global: global.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PreviewConfig {
    /// Path prefix marking component-module files.
    pub components_prefix: String,
    /// Name of the object component modules publish into.
    pub namespace: String,
    pub libraries: Vec<LibraryGlobal>,
    pub sandbox: SandboxPolicy,
    /// `<title>` of the synthesized shell.
    pub document_title: String,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            components_prefix: "components/".to_string(),
            namespace: "__modules".to_string(),
            libraries: vec![
                LibraryGlobal::new("react", "React"),
                LibraryGlobal::new("react-dom", "ReactDOM"),
                LibraryGlobal::new("react-dom/client", "ReactDOM"),
            ],
            sandbox: SandboxPolicy::default(),
            document_title: "Preview".to_string(),
        }
    }
}

impl PreviewConfig {
    pub fn from_json(json: &str) -> Result<Self, LiveCodeError> {
        let config: PreviewConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LiveCodeError> {
        self.sandbox.validate()
    }

    /// Global name for a UI-library import specifier, if it is one.
    pub fn library_global(&self, specifier: &str) -> Option<&str> {
        self.libraries
            .iter()
            .find(|lib| lib.specifier == specifier)
            .map(|lib| lib.global.as_str())
    }
}
