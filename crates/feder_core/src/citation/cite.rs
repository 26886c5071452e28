//! Inline citation formatting and reference list generation.

use crate::citation::bibtex::{Bibliography, BibliographyEntry};
use log::debug;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::BTreeSet;

static NARRATIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[text@([a-zA-Z0-9_\-]+)\]").expect("valid narrative citation regex")
});
static PARENTHETICAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[@([a-zA-Z0-9_\-]+)\]").expect("valid parenthetical citation regex")
});

const NO_DATE: &str = "n.d.";
const UNKNOWN_AUTHOR: &str = "Unknown Author";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CitationStyle {
    /// `(Smith, 1999)`
    Parenthetical,
    /// `Smith (1999)`
    Narrative,
}

/// Body text with markers expanded, plus every key that was referenced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedCitations {
    pub text: String,
    pub cited_keys: BTreeSet<String>,
}

/// One line of the trailing reference list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceEntry {
    pub key: String,
    pub text: String,
}

/// Formats one citation.
///
/// Without an entry the key itself is shown so broken references stay
/// visible: `(key)` for parenthetical, bare `key` for narrative.
pub fn format_citation(key: &str, entry: Option<&BibliographyEntry>, style: CitationStyle) -> String {
    let Some(entry) = entry else {
        return match style {
            CitationStyle::Parenthetical => format!("({key})"),
            CitationStyle::Narrative => key.to_string(),
        };
    };

    let label = entry
        .author()
        .map(author_label)
        .unwrap_or_else(|| key.to_string());
    let year = entry.year().unwrap_or(NO_DATE);

    match style {
        CitationStyle::Parenthetical => format!("({label}, {year})"),
        CitationStyle::Narrative => format!("{label} ({year})"),
    }
}

/// Expands `[text@key]` then `[@key]` markers in `body`.
///
/// Unresolved narrative markers render as
/// `key (n.d.)`, unresolved parenthetical ones as `(key)`.
pub fn resolve_citations(body: &str, bibliography: &Bibliography) -> ResolvedCitations {
    let mut cited_keys = BTreeSet::new();
    let mut misses = 0usize;

    let narrative = NARRATIVE_RE.replace_all(body, |caps: &Captures| {
        let key = &caps[1];
        cited_keys.insert(key.to_string());
        match bibliography.get(key) {
            Some(entry) => format_citation(key, Some(entry), CitationStyle::Narrative),
            None => {
                misses += 1;
                format_citation(key, Some(&BibliographyEntry::new(key)), CitationStyle::Narrative)
            }
        }
    });

    let text = PARENTHETICAL_RE
        .replace_all(&narrative, |caps: &Captures| {
            let key = &caps[1];
            cited_keys.insert(key.to_string());
            let entry = bibliography.get(key);
            if entry.is_none() {
                misses += 1;
            }
            format_citation(key, entry, CitationStyle::Parenthetical)
        })
        .into_owned();

    if misses > 0 {
        debug!(
            "event=citation_resolve module=citation status=miss cited={} misses={}",
            cited_keys.len(),
            misses
        );
    }

    ResolvedCitations { text, cited_keys }
}

/// Reference list for `cited_keys`, sorted by author string.
pub fn reference_list(bibliography: &Bibliography, cited_keys: &BTreeSet<String>) -> Vec<ReferenceEntry> {
    let mut entries: Vec<&BibliographyEntry> = bibliography
        .entries()
        .filter(|entry| cited_keys.contains(&entry.key))
        .collect();
    entries.sort_by(|a, b| {
        a.author()
            .unwrap_or_default()
            .cmp(b.author().unwrap_or_default())
            .then_with(|| a.key.cmp(&b.key))
    });

    entries
        .into_iter()
        .map(|entry| ReferenceEntry {
            key: entry.key.clone(),
            text: format_reference(entry),
        })
        .collect()
}

/// APA-like reference line; missing parts are left out.
pub fn format_reference(entry: &BibliographyEntry) -> String {
    let authors = entry
        .author()
        .map(reference_authors)
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
    let year = entry.year().unwrap_or(NO_DATE);

    let mut line = format!("{authors} ({year}).");
    if let Some(title) = entry.field("title") {
        line.push(' ');
        line.push_str(title);
        line.push('.');
    }

    let mut venue = String::new();
    if let Some(journal) = entry.field("journal") {
        venue.push_str(journal);
    }
    if let Some(volume) = entry.field("volume") {
        if !venue.is_empty() {
            venue.push_str(", ");
        }
        venue.push_str(volume);
    }
    if let Some(issue) = entry.field("issue") {
        venue.push_str(&format!("({issue})"));
    }
    if let Some(pages) = entry.field("pages") {
        if !venue.is_empty() {
            venue.push_str(", ");
        }
        venue.push_str(pages);
    }
    if !venue.is_empty() {
        line.push(' ');
        line.push_str(&venue);
        line.push('.');
    }

    if let Some(doi) = entry.field("doi") {
        line.push_str(&format!(" https://doi.org/{doi}"));
    }
    line
}

fn author_names(field: &str) -> Vec<&str> {
    field
        .split(" and ")
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect()
}

fn surname(name: &str) -> &str {
    match name.split_once(',') {
        Some((last, _)) => last.trim(),
        None => name.split_whitespace().last().unwrap_or(name),
    }
}

fn author_label(field: &str) -> String {
    let names = author_names(field);
    match names.as_slice() {
        [] => field.trim().to_string(),
        [only] => surname(only).to_string(),
        [first, second] => format!("{} & {}", surname(first), surname(second)),
        [first, ..] => format!("{} et al.", surname(first)),
    }
}

// "John Ronald Tolkien" -> "Tolkien, J. R."; names with a comma are kept.
fn reference_name(name: &str) -> String {
    if name.contains(',') {
        return name.to_string();
    }
    let mut parts: Vec<&str> = name.split_whitespace().collect();
    let Some(last) = parts.pop() else {
        return name.to_string();
    };
    if parts.is_empty() {
        return last.to_string();
    }
    let initials: Vec<String> = parts
        .iter()
        .filter_map(|part| part.chars().next())
        .map(|initial| format!("{initial}."))
        .collect();
    format!("{last}, {}", initials.join(" "))
}

fn reference_authors(field: &str) -> String {
    let names: Vec<String> = author_names(field).into_iter().map(reference_name).collect();
    match names.len() {
        0 => UNKNOWN_AUTHOR.to_string(),
        1 => names[0].clone(),
        n => {
            let (head, tail) = names.split_at(n - 1);
            format!("{}, & {}", head.join(", "), tail[0])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{format_citation, format_reference, reference_list, resolve_citations, CitationStyle};
    use crate::citation::bibtex::{parse_bibliography, Bibliography, BibliographyEntry};
    use std::collections::BTreeSet;

    fn smith() -> BibliographyEntry {
        BibliographyEntry::new("smith99")
            .with_field("author", "Smith, John")
            .with_field("year", "1999")
    }

    #[test]
    fn formats_both_styles() {
        let entry = smith();
        assert_eq!(
            format_citation("smith99", Some(&entry), CitationStyle::Parenthetical),
            "(Smith, 1999)"
        );
        assert_eq!(
            format_citation("smith99", Some(&entry), CitationStyle::Narrative),
            "Smith (1999)"
        );
    }

    #[test]
    fn missing_entry_shows_key() {
        assert_eq!(
            format_citation("missing", None, CitationStyle::Parenthetical),
            "(missing)"
        );
        assert_eq!(format_citation("missing", None, CitationStyle::Narrative), "missing");
    }

    #[test]
    fn author_label_by_count() {
        let two = BibliographyEntry::new("k").with_field("author", "Jane Doe and Max Mustermann");
        assert_eq!(
            format_citation("k", Some(&two), CitationStyle::Parenthetical),
            "(Doe & Mustermann, n.d.)"
        );
        let three = BibliographyEntry::new("k")
            .with_field("author", "Curie, Marie and Pierre Curie and Paul Langevin")
            .with_field("year", "1910");
        assert_eq!(
            format_citation("k", Some(&three), CitationStyle::Narrative),
            "Curie et al. (1910)"
        );
    }

    #[test]
    fn entry_without_author_uses_key_label() {
        let entry = BibliographyEntry::new("anon").with_field("year", "2020");
        assert_eq!(
            format_citation("anon", Some(&entry), CitationStyle::Parenthetical),
            "(anon, 2020)"
        );
    }

    #[test]
    fn resolves_markers_and_tracks_keys() {
        let bib: Bibliography = [BibliographyEntry::new("a")
            .with_field("author", "X")
            .with_field("year", "2000")]
        .into_iter()
        .collect();

        let resolved = resolve_citations("See [@a] and [text@b] for details.", &bib);
        assert_eq!(
            resolved.cited_keys,
            ["a", "b"].into_iter().map(String::from).collect::<BTreeSet<_>>()
        );
        assert!(resolved.text.contains("(X, 2000)"));
        assert!(resolved.text.contains("b (n.d.)"));
        assert_eq!(resolved.text, "See (X, 2000) and b (n.d.) for details.");
    }

    #[test]
    fn unresolved_parenthetical_marker_stays_visible() {
        let resolved = resolve_citations("as shown [@ghost].", &Bibliography::new());
        assert_eq!(resolved.text, "as shown (ghost).");
    }

    #[test]
    fn resolution_keeps_line_count() {
        let body = "a [@x]\nb\n[text@y] c";
        let resolved = resolve_citations(body, &Bibliography::new());
        assert_eq!(resolved.text.lines().count(), body.lines().count());
    }

    #[test]
    fn reference_list_is_cited_only_and_sorted() {
        let bib = parse_bibliography(
            "@article{z,\n author = {Zeta, Zoe},\n year = {2001},\n title = {Last}\n}\n\
             @article{a,\n author = {Alpha Beta},\n year = {1990},\n title = {First},\n journal = {J. Things},\n volume = {4},\n issue = {2},\n pages = {1-9},\n doi = {10.1/x}\n}\n\
             @misc{unused,\n author = {Nobody}\n}\n",
        );
        let cited: BTreeSet<String> = ["z", "a"].into_iter().map(String::from).collect();
        let refs = reference_list(&bib, &cited);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].key, "a");
        assert_eq!(
            refs[0].text,
            "Beta, A. (1990). First. J. Things, 4(2), 1-9. https://doi.org/10.1/x"
        );
        assert_eq!(refs[1].text, "Zeta, Zoe (2001). Last.");
    }

    #[test]
    fn reference_line_joins_multiple_authors() {
        let entry = BibliographyEntry::new("k")
            .with_field("author", "Ada Lovelace and Charles Babbage and Alan Mathison Turing");
        assert_eq!(
            format_reference(&entry),
            "Lovelace, A., Babbage, C., & Turing, A. M. (n.d.)."
        );
        let anonymous = BibliographyEntry::new("k").with_field("title", "Anon");
        assert_eq!(format_reference(&anonymous), "Unknown Author (n.d.). Anon.");
    }
}
