//! Document kinds and the decoded document record.

use crate::markdown::frontmatter;
use crate::model::metadata::Metadata;
use serde::Serialize;

/// File category, decided by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Markdown,
    Bibliography,
    Json,
    Text,
    Image,
}

impl DocumentKind {
    /// Kind for `path`, or `None` for files the editor does not open.
    pub fn from_path(path: &str) -> Option<Self> {
        let (_, extension) = path.rsplit_once('.')?;
        match extension.to_ascii_lowercase().as_str() {
            "md" => Some(Self::Markdown),
            "bib" => Some(Self::Bibliography),
            "json" => Some(Self::Json),
            "txt" => Some(Self::Text),
            "png" | "jpg" | "jpeg" | "svg" | "gif" => Some(Self::Image),
            _ => None,
        }
    }

    /// Only markdown files carry frontmatter.
    pub fn has_frontmatter(self) -> bool {
        self == Self::Markdown
    }

    /// Image documents are view-only.
    pub fn is_editable(self) -> bool {
        self != Self::Image
    }
}

/// One editable document: body plus frontmatter.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Storage path relative to the project root; `None` until first saved.
    pub path: Option<String>,
    pub kind: DocumentKind,
    /// Editable body (markdown for `Markdown`), excluding frontmatter.
    pub content: String,
    pub metadata: Metadata,
}

impl Document {
    /// Empty unsaved markdown document.
    pub fn untitled() -> Self {
        Self {
            path: None,
            kind: DocumentKind::Markdown,
            content: String::new(),
            metadata: Metadata::new(),
        }
    }

    /// Decodes file bytes; invalid UTF-8 is replaced rather than rejected.
    pub fn decode(path: Option<String>, kind: DocumentKind, bytes: &[u8]) -> Self {
        if kind == DocumentKind::Image {
            return Self {
                path,
                kind,
                content: String::new(),
                metadata: Metadata::new(),
            };
        }

        let text = String::from_utf8_lossy(bytes);
        let (metadata, content) = frontmatter::decode_for_kind(kind, &text);
        Self {
            path,
            kind,
            content,
            metadata,
        }
    }

    /// Serializes back to file text (frontmatter only for markdown).
    pub fn encode(&self) -> String {
        if self.kind.has_frontmatter() {
            frontmatter::encode(&self.metadata, &self.content)
        } else {
            self.content.clone()
        }
    }

    /// Last path segment, or `Untitled`.
    pub fn display_name(&self) -> &str {
        self.path
            .as_deref()
            .and_then(|path| path.rsplit('/').next())
            .unwrap_or("Untitled")
    }
}
