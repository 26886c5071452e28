//! Level-1 section splitter.
//!
//! # Invariants
//! - `join_sections(&split_sections(body)) == body` for every body.
//! - Headings inside fenced code blocks never start a section.
//! - An empty body yields no sections.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static H1_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*#\s+(.+)$").expect("valid h1 regex"));

const FENCE: &str = "```";

/// Contiguous body span under one level-1 heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    /// Trimmed heading text; `None` for the preamble before the first heading.
    pub title: Option<String>,
    /// Heading line as written, kept for exact reconstruction.
    #[serde(skip)]
    pub heading_line: Option<String>,
    /// Section lines, excluding the heading.
    pub lines: Vec<String>,
    /// Index into the full body of the first line in `lines`.
    pub start_line: usize,
}

impl Section {
    fn preamble() -> Self {
        Self {
            title: None,
            heading_line: None,
            lines: Vec::new(),
            start_line: 0,
        }
    }

    /// Section text with lines joined by `\n`.
    pub fn content(&self) -> String {
        self.lines.join("\n")
    }

    pub fn is_blank(&self) -> bool {
        self.lines.iter().all(|line| line.trim().is_empty())
    }

    /// Body line index of `local` within this section.
    pub fn body_line(&self, local: usize) -> usize {
        self.start_line + local
    }
}

/// Splits `body` into sections at level-1 headings outside code fences.
pub fn split_sections(body: &str) -> Vec<Section> {
    if body.is_empty() {
        return Vec::new();
    }

    let mut sections = Vec::new();
    let mut current = Section::preamble();
    let mut in_code_block = false;

    for (index, line) in body.split('\n').enumerate() {
        if line.trim().starts_with(FENCE) {
            in_code_block = !in_code_block;
        }

        let heading = if in_code_block {
            None
        } else {
            H1_RE.captures(line)
        };

        match heading {
            Some(caps) => {
                if !current.lines.is_empty() || current.title.is_some() {
                    sections.push(current);
                }
                current = Section {
                    title: Some(caps[1].trim().to_string()),
                    heading_line: Some(line.to_string()),
                    lines: Vec::new(),
                    start_line: index + 1,
                };
            }
            None => current.lines.push(line.to_string()),
        }
    }

    if !current.lines.is_empty() || current.title.is_some() {
        sections.push(current);
    }

    sections
}

/// Reassembles a body from sections, reinserting heading lines.
///
/// Sections built by hand (without `heading_line`) get `# <title>`.
pub fn join_sections(sections: &[Section]) -> String {
    let mut lines: Vec<String> = Vec::new();
    for section in sections {
        if let Some(title) = &section.title {
            lines.push(
                section
                    .heading_line
                    .clone()
                    .unwrap_or_else(|| format!("# {title}")),
            );
        }
        lines.extend(section.lines.iter().cloned());
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::{join_sections, split_sections};

    #[test]
    fn empty_body_has_no_sections() {
        assert!(split_sections("").is_empty());
    }

    #[test]
    fn splits_on_level_one_only() {
        let body = "intro\n# One\ntext\n## Sub\nmore\n# Two\nend";
        let sections = split_sections(body);
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].title, None);
        assert_eq!(sections[0].lines, vec!["intro"]);
        assert_eq!(sections[1].title.as_deref(), Some("One"));
        assert_eq!(sections[1].lines, vec!["text", "## Sub", "more"]);
        assert_eq!(sections[1].start_line, 2);
        assert_eq!(sections[2].start_line, 6);
        assert_eq!(join_sections(&sections), body);
    }

    #[test]
    fn body_starting_with_heading_has_no_preamble() {
        let sections = split_sections("# Only\nline");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title.as_deref(), Some("Only"));
        assert_eq!(sections[0].start_line, 1);
    }

    #[test]
    fn empty_titled_sections_are_kept() {
        let body = "# A\n# B\nx";
        let sections = split_sections(body);
        assert_eq!(sections.len(), 2);
        assert!(sections[0].lines.is_empty());
        assert_eq!(join_sections(&sections), body);
    }

    #[test]
    fn fenced_code_hides_headings_and_rules() {
        let body = "# Code\n```sh\n# fake heading\n---\n```\n# Next\nx";
        let sections = split_sections(body);
        assert_eq!(sections.len(), 2);
        assert_eq!(
            sections[0].lines,
            vec!["```sh", "# fake heading", "---", "```"]
        );
        assert_eq!(join_sections(&sections), body);
    }

    #[test]
    fn indented_heading_round_trips_exactly() {
        let body = "  #   Spaced  \nline\n";
        let sections = split_sections(body);
        assert_eq!(sections[0].title.as_deref(), Some("Spaced"));
        assert_eq!(join_sections(&sections), body);
    }

    #[test]
    fn hash_without_space_is_not_a_heading() {
        let sections = split_sections("#tag\ntext");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, None);
    }
}
