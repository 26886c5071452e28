//! Schema-less frontmatter mapping.
//!
//! Frontmatter keys depend on the persona and are not statically typed, so
//! the raw mapping is kept as an ordered YAML mapping. Typed access goes
//! through `persona::PersonaMetadata`.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

/// Ordered frontmatter mapping. Key order is preserved through encode/decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(Mapping);

impl Metadata {
    pub fn new() -> Self {
        Self(Mapping::new())
    }

    pub fn from_mapping(mapping: Mapping) -> Self {
        Self(mapping)
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.0
    }

    pub fn into_mapping(self) -> Mapping {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    /// Inserts or replaces `key`, keeping its position when it already exists.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(Value::String(key.to_string()), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// String keys in document order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().filter_map(Value::as_str)
    }

    /// Display text for a scalar field; blank strings count as absent.
    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key)
            .and_then(display_text)
            .filter(|value| !value.trim().is_empty())
    }

    /// Boolean flag; `None` when absent or not a boolean.
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Sequence of scalars rendered as strings; non-sequences yield empty.
    pub fn string_list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(Value::Sequence(items)) => items
                .iter()
                .map(|item| display_text(item).unwrap_or_default())
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl From<Mapping> for Metadata {
    fn from(value: Mapping) -> Self {
        Self(value)
    }
}

/// Renders a YAML value as display text.
///
/// Scalars render as-is, mappings and sequences as compact JSON, `null` as
/// nothing.
pub fn display_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::String(text) => Some(text.clone()),
        Value::Sequence(_) | Value::Mapping(_) => serde_json::to_string(value).ok(),
        Value::Tagged(tagged) => display_text(&tagged.value),
    }
}

#[cfg(test)]
mod tests {
    use super::Metadata;
    use serde_yaml::Value;

    fn parse(yaml: &str) -> Metadata {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn text_renders_scalars_and_skips_blank_values() {
        let meta = parse("title: Report\nrevision: 2\ndraft: true\nsubtitle: '  '\n");
        assert_eq!(meta.text("title").as_deref(), Some("Report"));
        assert_eq!(meta.text("revision").as_deref(), Some("2"));
        assert_eq!(meta.text("draft").as_deref(), Some("true"));
        assert_eq!(meta.text("subtitle"), None);
        assert_eq!(meta.text("missing"), None);
    }

    #[test]
    fn set_keeps_existing_key_position() {
        let mut meta = parse("title: A\nauthor: B\ndate: C\n");
        meta.set("author", "Z");
        let keys: Vec<&str> = meta.keys().collect();
        assert_eq!(keys, vec!["title", "author", "date"]);
        assert_eq!(meta.get("author"), Some(&Value::String("Z".to_string())));
    }

    #[test]
    fn string_list_reads_sequences_only() {
        let meta = parse("objectives:\n  - one\n  - 2\ntitle: x\n");
        assert_eq!(meta.string_list("objectives"), vec!["one", "2"]);
        assert!(meta.string_list("title").is_empty());
    }
}
