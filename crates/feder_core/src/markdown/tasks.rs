//! Checkbox (task list) line patching.

use once_cell::sync::Lazy;
use regex::Regex;

static CHECKBOX_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*[-*+]\s+)\[([ xX])\]").expect("valid checkbox regex"));

/// State of a checkbox line, or `None` when `line` is not a checkbox item.
pub fn checkbox_state(line: &str) -> Option<bool> {
    CHECKBOX_LINE_RE
        .captures(line)
        .map(|caps| !caps[2].trim().is_empty())
}

/// Flips the checkbox on `line_index` of `body`.
///
/// With `expected = Some(state)` the line must currently be in `state`.
/// Returns `None` when the line is missing, is not a checkbox, or has an
/// unexpected state. Every other line is kept byte-identical.
pub fn toggle_checkbox_line(body: &str, line_index: usize, expected: Option<bool>) -> Option<String> {
    let mut lines: Vec<&str> = body.split('\n').collect();
    let line = *lines.get(line_index)?;
    let caps = CHECKBOX_LINE_RE.captures(line)?;

    let checked = !caps[2].trim().is_empty();
    if expected.is_some_and(|state| state != checked) {
        return None;
    }

    let marker = caps.get(2)?;
    let flipped = if checked { " " } else { "x" };
    let patched = format!("{}{}{}", &line[..marker.start()], flipped, &line[marker.end()..]);
    lines[line_index] = patched.as_str();
    Some(lines.join("\n"))
}
