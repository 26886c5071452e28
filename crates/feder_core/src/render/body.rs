//! Markdown body to render tree.
//!
//! # Responsibility
//! - Turn one section's (citation-resolved) text into `Block`s.
//! - Resolve every task-list marker to its exact body line.
//!
//! # Invariants
//! - Checkbox lines come from parser byte offsets, never from a search.
//! - A marker whose source line is not a plain checkbox line is read-only.
//! - A panic while rendering a section is contained to that section.

use crate::markdown::tasks::checkbox_state;
use crate::model::project::CaptionAlignment;
use crate::render::patch::Patch;
use crate::render::tree::{Block, Checkbox, ColumnAlignment, ImageRef, Inline, ListItem};
use log::warn;
use once_cell::sync::Lazy;
use pulldown_cmark::{Alignment, CodeBlockKind, CowStr, Event, Options, Parser, Tag};
use regex::Regex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

static IMAGE_WIDTH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"!\[(.*?)\]\((.*?)\)\{width=(.*?)\}").expect("valid image width regex")
});

const WIDTH_MARKER: &str = "|width=";

/// Where a section's text sits in the body.
#[derive(Debug, Clone, Copy)]
pub struct BodyContext<'a> {
    /// The section's unresolved lines, used to verify write-back targets.
    pub source_lines: &'a [String],
    /// Body line index of `source_lines[0]`.
    pub start_line: usize,
    pub caption_alignment: CaptionAlignment,
}

pub fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_MATH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options
}

/// Renders `text` into blocks.
///
/// `text` must have the same line layout as `ctx.source_lines`.
pub fn render_blocks(text: &str, ctx: &BodyContext<'_>) -> Vec<Block> {
    // `![alt](src){width=W}` -> `![alt|width=W](src)`; stays on the same line.
    let source = IMAGE_WIDTH_RE.replace_all(text, "![$1|width=$3]($2)");
    let line_starts = line_starts(&source);

    let mut builder = TreeBuilder::new(ctx);
    for (event, range) in Parser::new_ext(&source, parser_options()).into_offset_iter() {
        match event {
            Event::Start(tag) => builder.start(tag),
            Event::End(_) => builder.end(),
            Event::Text(text) => builder.text(text),
            Event::Code(code) => builder.push_inline(Inline::Code {
                code: code.into_string(),
            }),
            Event::InlineMath(tex) => builder.push_inline(Inline::Math {
                display: false,
                tex: tex.into_string(),
            }),
            Event::DisplayMath(tex) => builder.push_inline(Inline::Math {
                display: true,
                tex: tex.into_string(),
            }),
            Event::Html(html) => builder.html(html),
            Event::InlineHtml(html) => builder.push_inline(Inline::Html {
                html: html.into_string(),
            }),
            Event::FootnoteReference(name) => builder.push_inline(Inline::Text {
                text: format!("[^{name}]"),
            }),
            Event::SoftBreak => builder.push_inline(Inline::SoftBreak),
            Event::HardBreak => builder.push_inline(Inline::HardBreak),
            Event::Rule => builder.push_block(Block::Rule),
            Event::TaskListMarker(checked) => {
                builder.checkbox(checked, line_of(&line_starts, range.start))
            }
        }
    }
    builder.finish()
}

/// Runs `render` on one section; a panic becomes a single `Block::RenderError`.
pub fn render_isolated<F>(text: &str, ctx: &BodyContext<'_>, render: F) -> Vec<Block>
where
    F: FnOnce(&str, &BodyContext<'_>) -> Vec<Block>,
{
    match panic::catch_unwind(AssertUnwindSafe(|| render(text, ctx))) {
        Ok(blocks) => blocks,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(
                "event=section_render module=render status=error start_line={} bytes={} error={}",
                ctx.start_line,
                text.len(),
                crate::logging::sanitize_message(&message, 120)
            );
            vec![Block::RenderError { message }]
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "section could not be rendered".to_string()
    }
}

fn line_starts(text: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(text.match_indices('\n').map(|(index, _)| index + 1))
        .collect()
}

fn line_of(line_starts: &[usize], offset: usize) -> usize {
    line_starts
        .partition_point(|&start| start <= offset)
        .saturating_sub(1)
}

enum SpanKind {
    Emphasis,
    Strong,
    Strikethrough,
    Link { url: String, title: Option<String> },
}

impl SpanKind {
    fn into_inline(self, children: Vec<Inline>) -> Inline {
        match self {
            Self::Emphasis => Inline::Emphasis { children },
            Self::Strong => Inline::Strong { children },
            Self::Strikethrough => Inline::Strikethrough { children },
            Self::Link { url, title } => Inline::Link {
                url,
                title,
                children,
            },
        }
    }
}

/// Open container while walking parser events.
enum Frame {
    Root(Vec<Block>),
    Paragraph(Vec<Inline>),
    Heading {
        level: u8,
        inlines: Vec<Inline>,
    },
    BlockQuote(Vec<Block>),
    CodeBlock {
        language: Option<String>,
        code: String,
    },
    HtmlBlock(String),
    List {
        start: Option<u64>,
        items: Vec<ListItem>,
    },
    // Tight list items get inline content without a paragraph.
    Item {
        checkbox: Option<Checkbox>,
        blocks: Vec<Block>,
        inlines: Vec<Inline>,
    },
    Table {
        alignments: Vec<ColumnAlignment>,
        header: Vec<Vec<Inline>>,
        rows: Vec<Vec<Vec<Inline>>>,
    },
    TableHead(Vec<Vec<Inline>>),
    TableRow(Vec<Vec<Inline>>),
    TableCell(Vec<Inline>),
    Span {
        kind: SpanKind,
        children: Vec<Inline>,
    },
    Image {
        src: String,
        title: Option<String>,
        alt: String,
    },
    // Footnote definitions and other containers we do not model.
    Transparent,
}

struct TreeBuilder<'c, 'a> {
    ctx: &'c BodyContext<'a>,
    stack: Vec<Frame>,
}

impl<'c, 'a> TreeBuilder<'c, 'a> {
    fn new(ctx: &'c BodyContext<'a>) -> Self {
        Self {
            ctx,
            stack: vec![Frame::Root(Vec::new())],
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        let frame = match tag {
            Tag::Paragraph => Frame::Paragraph(Vec::new()),
            Tag::Heading { level, .. } => Frame::Heading {
                level: level as u8,
                inlines: Vec::new(),
            },
            Tag::BlockQuote(_) => Frame::BlockQuote(Vec::new()),
            Tag::CodeBlock(kind) => Frame::CodeBlock {
                language: match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(str::to_string),
                    CodeBlockKind::Indented => None,
                },
                code: String::new(),
            },
            Tag::HtmlBlock => Frame::HtmlBlock(String::new()),
            Tag::List(start) => Frame::List {
                start,
                items: Vec::new(),
            },
            Tag::Item => Frame::Item {
                checkbox: None,
                blocks: Vec::new(),
                inlines: Vec::new(),
            },
            Tag::Table(alignments) => Frame::Table {
                alignments: alignments.iter().map(column_alignment).collect(),
                header: Vec::new(),
                rows: Vec::new(),
            },
            Tag::TableHead => Frame::TableHead(Vec::new()),
            Tag::TableRow => Frame::TableRow(Vec::new()),
            Tag::TableCell => Frame::TableCell(Vec::new()),
            Tag::Emphasis => Frame::Span {
                kind: SpanKind::Emphasis,
                children: Vec::new(),
            },
            Tag::Strong => Frame::Span {
                kind: SpanKind::Strong,
                children: Vec::new(),
            },
            Tag::Strikethrough => Frame::Span {
                kind: SpanKind::Strikethrough,
                children: Vec::new(),
            },
            Tag::Link {
                dest_url, title, ..
            } => Frame::Span {
                kind: SpanKind::Link {
                    url: dest_url.into_string(),
                    title: non_empty(title),
                },
                children: Vec::new(),
            },
            Tag::Image {
                dest_url, title, ..
            } => Frame::Image {
                src: dest_url.into_string(),
                title: non_empty(title),
                alt: String::new(),
            },
            _ => Frame::Transparent,
        };
        self.stack.push(frame);
    }

    fn end(&mut self) {
        if self.stack.len() <= 1 {
            return;
        }
        let Some(frame) = self.stack.pop() else {
            return;
        };

        match frame {
            Frame::Root(_) | Frame::Transparent => {}
            Frame::Paragraph(inlines) => self.push_block(Block::Paragraph { inlines }),
            Frame::Heading { level, inlines } => self.push_block(Block::Heading { level, inlines }),
            Frame::BlockQuote(blocks) => self.push_block(Block::BlockQuote { blocks }),
            Frame::CodeBlock { language, code } => self.push_block(Block::CodeBlock { language, code }),
            Frame::HtmlBlock(html) => self.push_block(Block::Html { html }),
            Frame::List { start, items } => self.push_block(Block::List { start, items }),
            Frame::Item {
                checkbox,
                mut blocks,
                inlines,
            } => {
                flush_inlines(&mut blocks, inlines);
                if let Some(Frame::List { items, .. }) = self.target() {
                    items.push(ListItem { checkbox, blocks });
                }
            }
            Frame::Table {
                alignments,
                header,
                rows,
            } => self.push_block(Block::Table {
                alignments,
                header,
                rows,
            }),
            Frame::TableHead(cells) => {
                if let Some(Frame::Table { header, .. }) = self.target() {
                    *header = cells;
                }
            }
            Frame::TableRow(cells) => {
                if let Some(Frame::Table { rows, .. }) = self.target() {
                    rows.push(cells);
                }
            }
            Frame::TableCell(inlines) => match self.target() {
                Some(Frame::TableHead(cells)) | Some(Frame::TableRow(cells)) => cells.push(inlines),
                _ => {}
            },
            Frame::Span { kind, children } => self.push_inline(kind.into_inline(children)),
            Frame::Image { src, title, alt } => {
                let image = self.image_ref(src, title, alt);
                self.push_inline(Inline::Image(image));
            }
        }
    }

    fn text(&mut self, text: CowStr<'_>) {
        match self.target() {
            Some(Frame::CodeBlock { code, .. }) => code.push_str(&text),
            Some(Frame::HtmlBlock(html)) => html.push_str(&text),
            _ => self.push_inline(Inline::Text {
                text: text.into_string(),
            }),
        }
    }

    fn html(&mut self, html: CowStr<'_>) {
        match self.target() {
            Some(Frame::HtmlBlock(block)) => block.push_str(&html),
            _ => self.push_inline(Inline::Html {
                html: html.into_string(),
            }),
        }
    }

    fn push_inline(&mut self, inline: Inline) {
        match self.target() {
            Some(Frame::Paragraph(inlines))
            | Some(Frame::Heading { inlines, .. })
            | Some(Frame::TableCell(inlines))
            | Some(Frame::Span {
                children: inlines, ..
            })
            | Some(Frame::Item { inlines, .. }) => append_inline(inlines, inline),
            Some(Frame::Image { alt, .. }) => alt.push_str(&plain_text(&inline)),
            Some(Frame::CodeBlock { code, .. }) => code.push_str(&plain_text(&inline)),
            _ => self.push_block(Block::Paragraph {
                inlines: vec![inline],
            }),
        }
    }

    fn push_block(&mut self, block: Block) {
        match self.target() {
            Some(Frame::BlockQuote(blocks)) => blocks.push(block),
            Some(Frame::Item {
                blocks, inlines, ..
            }) => {
                flush_inlines(blocks, std::mem::take(inlines));
                blocks.push(block);
            }
            _ => {
                if let Some(Frame::Root(blocks)) = self.stack.first_mut() {
                    blocks.push(block);
                }
            }
        }
    }

    fn checkbox(&mut self, checked: bool, local_line: usize) {
        let line = self.ctx.start_line + local_line;
        let writable = self
            .ctx
            .source_lines
            .get(local_line)
            .and_then(|source| checkbox_state(source))
            == Some(checked);
        let marker = Checkbox {
            checked,
            line,
            patch: writable.then_some(Patch::ToggleCheckbox { line, checked }),
        };

        if let Some(Frame::Item { checkbox, .. }) = self
            .stack
            .iter_mut()
            .rev()
            .find(|frame| matches!(frame, Frame::Item { .. }))
        {
            *checkbox = Some(marker);
        }
    }

    fn image_ref(&self, src: String, title: Option<String>, alt: String) -> ImageRef {
        let (alt, width) = match alt.split_once(WIDTH_MARKER) {
            Some((text, width)) => (text.to_string(), Some(width.trim().to_string())),
            None => (alt.clone(), None),
        };
        ImageRef {
            external: ImageRef::is_external_src(&src),
            src,
            alt,
            title,
            width: width.filter(|value| !value.is_empty()),
            caption_alignment: self.ctx.caption_alignment,
        }
    }

    fn target(&mut self) -> Option<&mut Frame> {
        self.stack
            .iter_mut()
            .rev()
            .find(|frame| !matches!(frame, Frame::Transparent))
    }

    fn finish(mut self) -> Vec<Block> {
        while self.stack.len() > 1 {
            self.end();
        }
        match self.stack.pop() {
            Some(Frame::Root(blocks)) => blocks,
            _ => Vec::new(),
        }
    }
}

fn append_inline(inlines: &mut Vec<Inline>, inline: Inline) {
    if let (Some(Inline::Text { text: last }), Inline::Text { text }) = (inlines.last_mut(), &inline) {
        last.push_str(text);
        return;
    }
    inlines.push(inline);
}

fn flush_inlines(blocks: &mut Vec<Block>, inlines: Vec<Inline>) {
    if !inlines.is_empty() {
        blocks.push(Block::Paragraph { inlines });
    }
}

fn plain_text(inline: &Inline) -> String {
    match inline {
        Inline::Text { text } => text.clone(),
        Inline::Code { code } => code.clone(),
        Inline::Math { tex, .. } => tex.clone(),
        Inline::Emphasis { children }
        | Inline::Strong { children }
        | Inline::Strikethrough { children }
        | Inline::Link { children, .. } => children.iter().map(plain_text).collect(),
        Inline::Image(image) => image.alt.clone(),
        Inline::Html { .. } => String::new(),
        Inline::SoftBreak | Inline::HardBreak => " ".to_string(),
    }
}

fn non_empty(value: CowStr<'_>) -> Option<String> {
    (!value.is_empty()).then(|| value.into_string())
}

fn column_alignment(alignment: &Alignment) -> ColumnAlignment {
    match alignment {
        Alignment::None => ColumnAlignment::None,
        Alignment::Left => ColumnAlignment::Left,
        Alignment::Center => ColumnAlignment::Center,
        Alignment::Right => ColumnAlignment::Right,
    }
}
