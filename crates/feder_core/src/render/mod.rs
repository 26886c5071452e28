//! Document renderer.
//!
//! # Responsibility
//! - Build the preview tree for one document: persona front matter, table
//!   of contents, per-section body blocks and the reference list.
//!
//! # Invariants
//! - Rendering is pure over `RenderInput`; the body is never modified.
//! - Citations are resolved per section, so section line offsets stay valid.
//! - One failing section never prevents its siblings from rendering.

pub mod body;
pub mod cover;
pub mod patch;
pub mod toc;
pub mod tree;

use crate::citation::bibtex::Bibliography;
use crate::citation::cite::{reference_list, resolve_citations};
use crate::markdown::sections::split_sections;
use crate::model::metadata::Metadata;
use crate::model::persona::{Persona, PersonaMetadata};
use crate::model::project::{CaptionAlignment, ProjectMetadata};
use body::{render_blocks, render_isolated, BodyContext};
use log::debug;
use std::collections::BTreeSet;
use toc::{table_of_contents, TocBlock};
use tree::{Block, RenderedDocument, RenderedSection};

/// Fold state of the preview, owned by the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub collapsed_sections: BTreeSet<usize>,
    pub cover_open: bool,
    pub toc_open: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            collapsed_sections: BTreeSet::new(),
            cover_open: true,
            toc_open: true,
        }
    }
}

impl ViewState {
    /// Flips the fold state of section `index`.
    pub fn toggle_section(&mut self, index: usize) {
        if !self.collapsed_sections.remove(&index) {
            self.collapsed_sections.insert(index);
        }
    }

    pub fn is_expanded(&self, index: usize) -> bool {
        !self.collapsed_sections.contains(&index)
    }
}

/// Everything one render pass reads.
#[derive(Debug, Clone, Copy)]
pub struct RenderInput<'a> {
    pub body: &'a str,
    pub metadata: &'a Metadata,
    pub project: Option<&'a ProjectMetadata>,
    pub persona: Persona,
    pub bibliography: &'a Bibliography,
    pub view: &'a ViewState,
    /// Display date used where a cover always shows one.
    pub today: &'a str,
}

pub fn render_document(input: &RenderInput<'_>) -> RenderedDocument {
    render_document_with(input, render_blocks)
}

fn render_document_with<F>(input: &RenderInput<'_>, render_body: F) -> RenderedDocument
where
    F: Fn(&str, &BodyContext<'_>) -> Vec<Block>,
{
    let record = PersonaMetadata::from_metadata(input.persona, input.metadata);
    let header = cover::front_matter(&record, input.today, input.view.cover_open);
    let toc = table_of_contents_block(input, &record);
    let caption_alignment = caption_alignment(input.metadata, input.project);

    let mut cited_keys = BTreeSet::new();
    let mut sections = Vec::new();
    for (index, section) in split_sections(input.body).iter().enumerate() {
        let resolved = resolve_citations(&section.content(), input.bibliography);
        cited_keys.extend(resolved.cited_keys);

        let collapsible = section.title.is_some();
        if !collapsible && section.is_blank() {
            continue;
        }

        let expanded = !collapsible || input.view.is_expanded(index);
        let blocks = if expanded {
            let ctx = BodyContext {
                source_lines: &section.lines,
                start_line: section.start_line,
                caption_alignment,
            };
            render_isolated(&resolved.text, &ctx, &render_body)
        } else {
            Vec::new()
        };

        sections.push(RenderedSection {
            index,
            title: section.title.clone(),
            start_line: section.start_line,
            collapsible,
            expanded,
            blocks,
        });
    }

    let show_references =
        input.metadata.flag("showReferences") == Some(true) && input.persona != Persona::Journalist;
    let references = show_references.then(|| reference_list(input.bibliography, &cited_keys));

    debug!(
        "event=render_document module=render status=ok persona={} sections={} cited={} bytes={}",
        input.persona,
        sections.len(),
        cited_keys.len(),
        input.body.len()
    );

    RenderedDocument {
        persona: input.persona,
        header,
        toc,
        sections,
        references,
        cited_keys,
    }
}

fn table_of_contents_block(input: &RenderInput<'_>, record: &PersonaMetadata) -> Option<TocBlock> {
    let PersonaMetadata::Engineer(engineer) = record else {
        return None;
    };
    if !engineer.show_toc {
        return None;
    }

    let entries = table_of_contents(input.body);
    if entries.is_empty() {
        return None;
    }
    Some(TocBlock {
        open: input.view.toc_open,
        entries: if input.view.toc_open { entries } else { Vec::new() },
    })
}

/// Document `captionAlignment`, then the project's, then center.
fn caption_alignment(metadata: &Metadata, project: Option<&ProjectMetadata>) -> CaptionAlignment {
    let from_document = metadata
        .text("captionAlignment")
        .and_then(|value| match value.trim().to_ascii_lowercase().as_str() {
            "justify" => Some(CaptionAlignment::Justify),
            "center" => Some(CaptionAlignment::Center),
            _ => None,
        });
    from_document
        .or_else(|| project.and_then(|project| project.caption_alignment))
        .unwrap_or_default()
}
