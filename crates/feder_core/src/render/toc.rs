//! Table of contents over the whole body.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("valid heading regex"));

/// Table of contents block; `entries` is empty while folded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocBlock {
    pub open: bool,
    pub entries: Vec<TocEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    /// 1 to 6.
    pub level: u8,
    pub text: String,
    /// Line index of the heading in the body.
    pub line: usize,
}

/// Collects headings of levels 1 to 6 in document order, skipping fenced code.
pub fn table_of_contents(body: &str) -> Vec<TocEntry> {
    let mut entries = Vec::new();
    let mut in_code_block = false;

    for (line_index, line) in body.split('\n').enumerate() {
        if line.trim().starts_with("```") {
            in_code_block = !in_code_block;
            continue;
        }
        if in_code_block {
            continue;
        }
        if let Some(caps) = HEADING_RE.captures(line.trim_end_matches('\r')) {
            entries.push(TocEntry {
                level: caps[1].len() as u8,
                text: caps[2].trim().to_string(),
                line: line_index,
            });
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::table_of_contents;

    #[test]
    fn lists_headings_with_levels() {
        let toc = table_of_contents("# A\ntext\n## B\n###### F\n####### too deep");
        let summary: Vec<(u8, &str, usize)> = toc
            .iter()
            .map(|entry| (entry.level, entry.text.as_str(), entry.line))
            .collect();
        assert_eq!(summary, vec![(1, "A", 0), (2, "B", 2), (6, "F", 3)]);
    }

    #[test]
    fn skips_headings_in_code_fences() {
        let toc = table_of_contents("```\n# not a heading\n```\n## Real");
        assert_eq!(toc.len(), 1);
        assert_eq!(toc[0].text, "Real");
    }
}
