//! Core domain types for content injected into pages.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ContentKey
// ---------------------------------------------------------------------------

/// Label selecting which content fragments apply to a document (e.g. `"B2B Paris"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentKey(pub String);

impl ContentKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// ContentBlock
// ---------------------------------------------------------------------------

/// How a block's fragments are laid out when rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// One `<li>` per fragment inside a `<ul>`.
    Bullets,
    /// One `<p>` per fragment.
    Paragraphs,
    /// Question/answer pairs, one `<p><strong>label</strong> body</p>` each.
    Faq,
}

/// A single piece of copy inside a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Fragment {
    /// Plain text (a bullet or a paragraph).
    Text(String),
    /// Labelled entry, e.g. a FAQ question and its answer.
    Entry { label: String, body: String },
}

impl Fragment {
    /// The fragment's body text.
    pub fn body(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Entry { body, .. } => body,
        }
    }

    /// The fragment's label, if any.
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Text(_) => None,
            Self::Entry { label, .. } => Some(label),
        }
    }
}

impl From<&str> for Fragment {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// One unit of injected content. Fragment order is the rendered order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    /// Name of the section stage that renders this block.
    pub slot: String,
    /// Layout of the fragments.
    pub kind: BlockKind,
    /// Optional `<h2>` heading rendered above the fragments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    /// Ordered fragments.
    #[serde(default)]
    pub fragments: Vec<Fragment>,
    /// Optional closing paragraph rendered after the fragments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outro: Option<String>,
}

/// `[[content]]` entry: every block registered under one key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentEntry {
    pub key: ContentKey,
    #[serde(default)]
    pub blocks: Vec<ContentBlock>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_key_is_transparent() {
        let key = ContentKey::new("Île-de-France");
        let json = serde_json::to_string(&key).expect("serialize");
        assert_eq!(json, "\"Île-de-France\"");
        assert_eq!(key.to_string(), "Île-de-France");
    }

    #[test]
    fn fragments_accept_text_and_entries() {
        let toml_str = r#"
slot = "faq"
kind = "faq"
heading = "Questions fréquentes"
fragments = [
  { label = "Quels délais ?", body = "De l'urgent immédiat aux créneaux planifiés." },
  "Texte libre",
]
"#;
        let block: ContentBlock = toml::from_str(toml_str).expect("parse");
        assert_eq!(block.kind, BlockKind::Faq);
        assert_eq!(block.fragments.len(), 2);
        assert_eq!(block.fragments[0].label(), Some("Quels délais ?"));
        assert_eq!(block.fragments[1].body(), "Texte libre");
        assert!(block.outro.is_none());
    }
}
