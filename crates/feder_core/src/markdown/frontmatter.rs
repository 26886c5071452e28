//! Frontmatter codec.
//!
//! Wire format: `---\n<yaml>---\n\n<body>`.
//!
//! # Invariants
//! - `decode(encode(m, b)) == (m, b)` for trimmed bodies and metadata whose
//!   serialized form contains no `---`.
//! - Decoding never fails; a broken YAML block leaves the whole text as body.

use crate::model::document::DocumentKind;
use crate::model::metadata::Metadata;
use log::warn;
use serde_yaml::Value;

const DELIMITER: &str = "---";

/// Splits raw markdown into `(metadata, body)`.
///
/// The text is split on every `---`; with fewer than three parts, or with
/// non-blank text before the opening delimiter, there is no frontmatter.
/// Parts after the second are rejoined so horizontal rules in the body
/// survive.
pub fn decode(raw: &str) -> (Metadata, String) {
    let parts: Vec<&str> = raw.split(DELIMITER).collect();
    if parts.len() < 3 || !parts[0].trim().is_empty() {
        return (Metadata::new(), raw.to_string());
    }

    let body = parts[2..].join(DELIMITER).trim().to_string();
    match serde_yaml::from_str::<Value>(parts[1]) {
        Ok(Value::Mapping(mapping)) => (Metadata::from_mapping(mapping), body),
        Ok(Value::Null) => (Metadata::new(), body),
        Ok(_) => {
            warn!(
                "event=frontmatter_decode module=markdown status=fallback reason=not_a_mapping bytes={}",
                raw.len()
            );
            (Metadata::new(), raw.to_string())
        }
        Err(err) => {
            warn!(
                "event=frontmatter_decode module=markdown status=fallback reason=yaml_error bytes={} error={}",
                raw.len(),
                crate::logging::sanitize_message(&err.to_string(), 120)
            );
            (Metadata::new(), raw.to_string())
        }
    }
}

/// Decodes markdown only; other kinds keep the raw text as body.
pub fn decode_for_kind(kind: DocumentKind, raw: &str) -> (Metadata, String) {
    if kind.has_frontmatter() {
        decode(raw)
    } else {
        (Metadata::new(), raw.to_string())
    }
}

/// Joins metadata and body back into file text.
///
/// Empty metadata yields the body unchanged.
pub fn encode(metadata: &Metadata, body: &str) -> String {
    if metadata.is_empty() {
        return body.to_string();
    }

    match serde_yaml::to_string(metadata.as_mapping()) {
        Ok(serialized) => format!("{DELIMITER}\n{serialized}{DELIMITER}\n\n{body}"),
        Err(err) => {
            warn!(
                "event=frontmatter_encode module=markdown status=error keys={} error={}",
                metadata.len(),
                err
            );
            body.to_string()
        }
    }
}
