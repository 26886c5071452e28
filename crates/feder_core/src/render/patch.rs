//! Write-back patches emitted by interactive render elements.
//!
//! # Invariants
//! - A patch carries the exact state it was rendered from; applying it to
//!   text that no longer matches is a no-op (`None`).
//! - Applying a checkbox patch leaves every other line byte-identical.
//! - A checkbox patch only moves to another buffer when exactly one line
//!   there can be the rendered checkbox.

use crate::markdown::sections::{split_sections, Section};
use crate::markdown::tasks::{checkbox_state, toggle_checkbox_line};
use crate::model::metadata::Metadata;
use crate::model::persona::toggle_objective;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Patch {
    /// Flip the body checkbox on `line`, expected to be in state `checked`.
    ToggleCheckbox { line: usize, checked: bool },
    /// Flip `objectives[index]` in the frontmatter.
    ToggleObjective { index: usize },
}

/// Applies a body patch, returning the new body.
///
/// Metadata patches and stale targets return `None`.
pub fn apply_to_body(patch: &Patch, body: &str) -> Option<String> {
    match *patch {
        Patch::ToggleCheckbox { line, checked } => {
            let patched = toggle_checkbox_line(body, line, Some(checked));
            if patched.is_none() {
                debug!(
                    "event=write_back module=render status=miss line={} expected_checked={}",
                    line, checked
                );
            }
            patched
        }
        Patch::ToggleObjective { .. } => None,
    }
}

/// Moves a checkbox patch rendered from `from_body` onto `to_body`.
///
/// The checkbox is found by its section title and by its rank among the
/// section's checkbox lines with identical text. The two sections must hold
/// the same number of such lines. Returns `None` when no single line of
/// `to_body` matches.
pub fn rebase_checkbox(patch: &Patch, from_body: &str, to_body: &str) -> Option<Patch> {
    let Patch::ToggleCheckbox { line, checked } = *patch else {
        return None;
    };
    if from_body == to_body {
        return Some(*patch);
    }

    let from_sections = split_sections(from_body);
    let source = unique_section(&from_sections, |section| {
        (section.start_line..section.start_line + section.lines.len()).contains(&line)
    })?;
    let local = line - source.start_line;
    let text = source.lines.get(local)?;
    if checkbox_state(text) != Some(checked) {
        return None;
    }
    let same_text = |section: &Section| -> Vec<usize> {
        checkbox_lines(section)
            .into_iter()
            .filter(|&index| section.lines[index] == *text)
            .collect()
    };
    let source_matches = same_text(source);
    let rank = source_matches.iter().position(|&index| index == local)?;

    let to_sections = split_sections(to_body);
    let title = source.title.as_deref();
    let source_title_count = from_sections
        .iter()
        .filter(|section| section.title.as_deref() == title)
        .count();
    if source_title_count != 1 {
        return None;
    }
    let target = unique_section(&to_sections, |section| section.title.as_deref() == title)?;
    let target_matches = same_text(target);
    if target_matches.len() != source_matches.len() {
        return None;
    }
    Some(Patch::ToggleCheckbox {
        line: target.body_line(target_matches[rank]),
        checked,
    })
}

fn unique_section<'a>(sections: &'a [Section], accept: impl Fn(&Section) -> bool) -> Option<&'a Section> {
    let mut found = sections.iter().filter(|section| accept(section));
    let section = found.next()?;
    found.next().is_none().then_some(section)
}

/// Local indices of checkbox lines outside code fences.
fn checkbox_lines(section: &Section) -> Vec<usize> {
    let mut in_code_block = false;
    let mut indices = Vec::new();
    for (index, line) in section.lines.iter().enumerate() {
        if line.trim().starts_with("```") {
            in_code_block = !in_code_block;
            continue;
        }
        if !in_code_block && checkbox_state(line).is_some() {
            indices.push(index);
        }
    }
    indices
}

/// Applies a metadata patch in place. Returns `true` when `meta` changed.
pub fn apply_to_metadata(patch: &Patch, meta: &mut Metadata) -> bool {
    match *patch {
        Patch::ToggleObjective { index } => {
            let changed = toggle_objective(meta, index);
            if !changed {
                debug!(
                    "event=write_back module=render status=miss objective_index={}",
                    index
                );
            }
            changed
        }
        Patch::ToggleCheckbox { .. } => false,
    }
}
