//! Render tree produced for the preview.
//!
//! The tree is plain data. Interactive elements carry the `Patch` that the
//! view hands back to the controller when the user toggles them.

use crate::citation::cite::ReferenceEntry;
use crate::model::persona::Persona;
use crate::model::project::CaptionAlignment;
use crate::render::cover::FrontMatter;
use crate::render::patch::Patch;
use crate::render::toc::TocBlock;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedDocument {
    pub persona: Persona,
    pub header: Option<FrontMatter>,
    /// `None` when the persona or document hides the table of contents.
    pub toc: Option<TocBlock>,
    pub sections: Vec<RenderedSection>,
    /// `None` when the reference list is disabled.
    pub references: Option<Vec<ReferenceEntry>>,
    pub cited_keys: BTreeSet<String>,
}

impl RenderedDocument {
    /// Every checkbox in document order, including nested lists.
    pub fn checkboxes(&self) -> Vec<&Checkbox> {
        let mut found = Vec::new();
        for section in &self.sections {
            collect_checkboxes(&section.blocks, &mut found);
        }
        found
    }

    /// Every image reference in document order.
    pub fn images(&self) -> Vec<&ImageRef> {
        let mut found = Vec::new();
        for section in &self.sections {
            collect_images(&section.blocks, &mut found);
        }
        found
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedSection {
    /// Position in `split_sections` output.
    pub index: usize,
    pub title: Option<String>,
    pub start_line: usize,
    /// `false` only for the untitled preamble.
    pub collapsible: bool,
    pub expanded: bool,
    /// Empty while collapsed.
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Block {
    Heading {
        level: u8,
        inlines: Vec<Inline>,
    },
    Paragraph {
        inlines: Vec<Inline>,
    },
    BlockQuote {
        blocks: Vec<Block>,
    },
    CodeBlock {
        language: Option<String>,
        code: String,
    },
    List {
        /// Start number for ordered lists.
        start: Option<u64>,
        items: Vec<ListItem>,
    },
    Table {
        alignments: Vec<ColumnAlignment>,
        header: Vec<Vec<Inline>>,
        rows: Vec<Vec<Vec<Inline>>>,
    },
    Html {
        html: String,
    },
    Rule,
    /// Placeholder for a section whose rendering failed.
    RenderError {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Inline {
    Text { text: String },
    Code { code: String },
    Math { display: bool, tex: String },
    Emphasis { children: Vec<Inline> },
    Strong { children: Vec<Inline> },
    Strikethrough { children: Vec<Inline> },
    Link { url: String, title: Option<String>, children: Vec<Inline> },
    Image(ImageRef),
    Html { html: String },
    SoftBreak,
    HardBreak,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListItem {
    pub checkbox: Option<Checkbox>,
    pub blocks: Vec<Block>,
}

/// Task-list marker with its resolved source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Checkbox {
    pub checked: bool,
    /// Line index into the full body.
    pub line: usize,
    /// `None` when the marker cannot be written back (read-only).
    pub patch: Option<Patch>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnAlignment {
    None,
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    /// Path or URL exactly as written in the markdown.
    pub src: String,
    pub alt: String,
    pub title: Option<String>,
    pub width: Option<String>,
    pub caption_alignment: CaptionAlignment,
    /// Remote or inline sources that need no storage lookup.
    pub external: bool,
}

impl ImageRef {
    pub fn is_external_src(src: &str) -> bool {
        ["http:", "https:", "blob:", "data:"]
            .iter()
            .any(|prefix| src.starts_with(prefix))
    }
}

fn collect_checkboxes<'a>(blocks: &'a [Block], found: &mut Vec<&'a Checkbox>) {
    for block in blocks {
        match block {
            Block::List { items, .. } => {
                for item in items {
                    if let Some(checkbox) = &item.checkbox {
                        found.push(checkbox);
                    }
                    collect_checkboxes(&item.blocks, found);
                }
            }
            Block::BlockQuote { blocks } => collect_checkboxes(blocks, found),
            _ => {}
        }
    }
}

fn collect_images<'a>(blocks: &'a [Block], found: &mut Vec<&'a ImageRef>) {
    for block in blocks {
        match block {
            Block::Heading { inlines, .. } | Block::Paragraph { inlines } => {
                collect_inline_images(inlines, found)
            }
            Block::BlockQuote { blocks } => collect_images(blocks, found),
            Block::List { items, .. } => {
                for item in items {
                    collect_images(&item.blocks, found);
                }
            }
            Block::Table { header, rows, .. } => {
                for cell in header.iter().chain(rows.iter().flatten()) {
                    collect_inline_images(cell, found);
                }
            }
            _ => {}
        }
    }
}

fn collect_inline_images<'a>(inlines: &'a [Inline], found: &mut Vec<&'a ImageRef>) {
    for inline in inlines {
        match inline {
            Inline::Image(image) => found.push(image),
            Inline::Emphasis { children }
            | Inline::Strong { children }
            | Inline::Strikethrough { children }
            | Inline::Link { children, .. } => collect_inline_images(children, found),
            _ => {}
        }
    }
}
