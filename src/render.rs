//! Sandboxed preview rendering.
//!
//! The renderer is the last stop of the pipeline and has no way to talk back:
//! it takes a finished document and shows it. Whatever the document's scripts
//! do (including throwing) stays inside the sandbox.

use serde::{Deserialize, Serialize};

use crate::document::AssembledDocument;
use crate::error::LiveCodeError;

/// Write-only render surface.
pub trait PreviewRenderer {
    /// Show `document`, replacing whatever was shown before.
    fn render(&mut self, document: &AssembledDocument);
}

// ═══════════════════════════════════════════════════════════════════════════════
// SANDBOX POLICY
// ═══════════════════════════════════════════════════════════════════════════════

/// Tokens for the iframe `sandbox` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxPolicy {
    pub tokens: Vec<String>,
}

impl Default for SandboxPolicy {
    fn default() -> Self {
        Self {
            tokens: vec!["allow-scripts".to_string()],
        }
    }
}

impl SandboxPolicy {
    /// Scripts plus same-origin lets the framed page remove its own sandbox;
    /// top navigation lets it take over the host page.
    pub fn validate(&self) -> Result<(), LiveCodeError> {
        let has = |token: &str| self.tokens.iter().any(|t| t.eq_ignore_ascii_case(token));
        if has("allow-scripts") && has("allow-same-origin") {
            return Err(LiveCodeError::InsecureSandbox {
                reason: "allow-scripts together with allow-same-origin".to_string(),
            });
        }
        if let Some(t) = self
            .tokens
            .iter()
            .find(|t| t.to_ascii_lowercase().starts_with("allow-top-navigation"))
        {
            return Err(LiveCodeError::InsecureSandbox {
                reason: format!("{} lets the preview navigate the host page", t),
            });
        }
        Ok(())
    }

    pub fn attribute_value(&self) -> String {
        self.tokens.join(" ")
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SRCDOC FRAME
// ═══════════════════════════════════════════════════════════════════════════════

const FRAME_TITLE: &str = "Live preview";

/// Renders into an `<iframe sandbox srcdoc>` element for the host page.
///
/// Only the most recent markup is kept. Each render is a full reload.
#[derive(Debug, Clone)]
pub struct SrcdocFrame {
    policy: SandboxPolicy,
    markup: Option<String>,
}

impl SrcdocFrame {
    pub fn new(policy: SandboxPolicy) -> Result<Self, LiveCodeError> {
        policy.validate()?;
        Ok(Self {
            policy,
            markup: None,
        })
    }

    /// Markup of the current frame, if anything was rendered yet.
    pub fn markup(&self) -> Option<&str> {
        self.markup.as_deref()
    }
}

impl PreviewRenderer for SrcdocFrame {
    fn render(&mut self, document: &AssembledDocument) {
        self.markup = Some(format!(
            "<iframe sandbox=\"{}\" title=\"{}\" srcdoc=\"{}\"></iframe>",
            escape_attribute(&self.policy.attribute_value()),
            FRAME_TITLE,
            escape_attribute(document.as_str()),
        ));
    }
}

fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + value.len() / 8);
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
