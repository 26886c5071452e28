//! Bibliography source parser.
//!
//! Records start with `@` as the first character of a line. Field values are
//! matched up to the first `}`, so nested or escaped braces truncate the
//! value; that is a limitation of the format as written by the editor.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

static RECORD_START_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^@").expect("valid record start regex"));
static FIELD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([a-zA-Z0-9_\-]+)\s*=\s*\{([^}]+)\}").expect("valid bib field regex")
});

/// One bibliographic record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BibliographyEntry {
    pub key: String,
    /// Field values keyed by lower-cased field name.
    pub fields: BTreeMap<String, String>,
}

impl BibliographyEntry {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter; the name is lower-cased.
    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Non-blank field value.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    pub fn author(&self) -> Option<&str> {
        self.field("author")
    }

    pub fn year(&self) -> Option<&str> {
        self.field("year")
    }
}

/// Parsed bibliography keyed by citation key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Bibliography {
    entries: BTreeMap<String, BibliographyEntry>,
}

impl Bibliography {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `entry`, replacing any entry with the same key.
    pub fn insert(&mut self, entry: BibliographyEntry) {
        self.entries.insert(entry.key.clone(), entry);
    }

    pub fn get(&self, key: &str) -> Option<&BibliographyEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &BibliographyEntry> {
        self.entries.values()
    }
}

impl FromIterator<BibliographyEntry> for Bibliography {
    fn from_iter<T: IntoIterator<Item = BibliographyEntry>>(iter: T) -> Self {
        let mut bibliography = Self::new();
        for entry in iter {
            bibliography.insert(entry);
        }
        bibliography
    }
}

/// Parses a bibliography source. Later records win on duplicate keys.
pub fn parse_bibliography(source: &str) -> Bibliography {
    let mut bibliography = Bibliography::new();
    let mut skipped = 0usize;

    for block in RECORD_START_RE.split(source).skip(1) {
        match parse_record(block) {
            Some(entry) => bibliography.insert(entry),
            None => skipped += 1,
        }
    }

    debug!(
        "event=bibliography_parse module=citation status=ok entries={} skipped={} bytes={}",
        bibliography.len(),
        skipped,
        source.len()
    );
    bibliography
}

fn parse_record(block: &str) -> Option<BibliographyEntry> {
    let open_brace = block.find('{')?;
    let after_type = &block[open_brace + 1..];
    let comma = after_type.find(',')?;
    let key = after_type[..comma].trim();
    if key.is_empty() {
        return None;
    }

    let mut entry = BibliographyEntry::new(key);
    for caps in FIELD_RE.captures_iter(&after_type[comma + 1..]) {
        entry
            .fields
            .insert(caps[1].to_ascii_lowercase(), caps[2].to_string());
    }
    Some(entry)
}

#[cfg(test)]
mod tests {
    use super::parse_bibliography;

    const SAMPLE: &str = "@article{smith99,\n  Author = {Smith, John},\n  year = {1999},\n  title = {On Things}\n}\n\n@book{doe2001,\n  author = {Jane Doe and Max Mustermann},\n  year = {2001}\n}\n";

    #[test]
    fn parses_records_and_lowercases_field_names() {
        let bib = parse_bibliography(SAMPLE);
        assert_eq!(bib.len(), 2);
        let smith = bib.get("smith99").unwrap();
        assert_eq!(smith.author(), Some("Smith, John"));
        assert_eq!(smith.year(), Some("1999"));
        assert_eq!(smith.field("title"), Some("On Things"));
    }

    #[test]
    fn duplicate_keys_keep_last_record() {
        let source = "@misc{k,\n year = {1}\n}\n@misc{k,\n year = {2}\n}\n";
        let bib = parse_bibliography(source);
        assert_eq!(bib.len(), 1);
        assert_eq!(bib.get("k").unwrap().year(), Some("2"));
    }

    #[test]
    fn malformed_records_are_skipped() {
        let source = "@broken no brace\n@nocomma{key}\n@misc{ok,\n title = {Fine}\n}\n";
        let bib = parse_bibliography(source);
        assert_eq!(bib.len(), 1);
        assert!(bib.get("ok").is_some());
    }

    #[test]
    fn embedded_at_sign_does_not_start_record() {
        let source = "@misc{mail,\n note = {write to a@b.org}\n}\n";
        let bib = parse_bibliography(source);
        assert_eq!(bib.get("mail").unwrap().field("note"), Some("write to a@b.org"));
    }

    #[test]
    fn nested_braces_truncate_value() {
        let source = "@misc{n,\n title = {The {RNA} World}\n}\n";
        let bib = parse_bibliography(source);
        assert_eq!(bib.get("n").unwrap().field("title"), Some("The {RNA"));
    }
}
