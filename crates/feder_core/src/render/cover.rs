//! Persona cover pages and headers.
//!
//! Each persona reads its own subset of frontmatter fields. Missing fields
//! fall back to the placeholders shown on an empty cover.

use crate::model::persona::{AuthorCard, PersonaMetadata};
use crate::render::patch::Patch;
use serde::Serialize;

const PLACEHOLDER: &str = "---";

/// Front matter block above the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontMatter {
    /// Researcher headers are always shown inline; covers can fold.
    pub collapsible: bool,
    pub open: bool,
    /// `None` while folded.
    pub block: Option<FrontMatterBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "layout", rename_all = "camelCase")]
pub enum FrontMatterBlock {
    #[serde(rename_all = "camelCase")]
    ResearchHeader {
        title: Option<String>,
        subtitle: Option<String>,
        authors: Vec<AuthorCard>,
        profession: Option<String>,
        date: Option<String>,
        abstract_text: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    EngineeringCover {
        client: String,
        title: String,
        project_number: String,
        date: String,
        revision: String,
        prepared_by: Vec<AuthorCard>,
        checked_by: String,
        approved_by: String,
        executive_summary: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    CourseCover {
        course: String,
        title: String,
        student: String,
        date: String,
        objectives: Vec<ObjectiveItem>,
        accent_color: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ScriptCover {
        title: String,
        written_by: Option<String>,
        based_on: Option<String>,
        date: Option<String>,
        contact: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    PressHeader {
        dateline: String,
        category: String,
        title: String,
        subtitle: Option<String>,
        byline: String,
        profession: Option<String>,
    },
}

/// Scholar objective with its toggle patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectiveItem {
    pub text: String,
    pub checked: bool,
    pub patch: Patch,
}

/// Builds the front matter for `record`, or `None` when the persona shows
/// nothing for this metadata.
///
/// `today` stands in for a missing date where the layout always shows one.
pub fn front_matter(record: &PersonaMetadata, today: &str, cover_open: bool) -> Option<FrontMatter> {
    if let PersonaMetadata::Researcher(meta) = record {
        let has_header = meta.title.is_some()
            || meta.display_authors.is_some()
            || meta.abstract_text.is_some()
            || meta.subtitle.is_some();
        if !has_header {
            return None;
        }
        return Some(FrontMatter {
            collapsible: false,
            open: true,
            block: Some(FrontMatterBlock::ResearchHeader {
                title: meta.title.clone(),
                subtitle: meta.subtitle.clone(),
                authors: meta.authors.clone(),
                profession: meta.profession.clone(),
                date: meta.date.clone(),
                abstract_text: meta.abstract_text.clone(),
            }),
        });
    }

    if let PersonaMetadata::Scholar(meta) = record {
        if !meta.show_cover {
            return None;
        }
    }

    let block = cover_open.then(|| cover_block(record, today)).flatten();
    Some(FrontMatter {
        collapsible: true,
        open: cover_open,
        block,
    })
}

fn cover_block(record: &PersonaMetadata, today: &str) -> Option<FrontMatterBlock> {
    let or = |value: &Option<String>, fallback: &str| {
        value.clone().unwrap_or_else(|| fallback.to_string())
    };

    let block = match record {
        PersonaMetadata::Researcher(_) => return None,
        PersonaMetadata::Engineer(meta) => FrontMatterBlock::EngineeringCover {
            client: or(&meta.client, PLACEHOLDER),
            title: or(&meta.title, "CALCULATION REPORT"),
            project_number: or(&meta.project_number, PLACEHOLDER),
            date: or(&meta.date, today),
            revision: or(&meta.revision, "Rev 0"),
            prepared_by: meta.authors.clone(),
            checked_by: or(&meta.checked_by, PLACEHOLDER),
            approved_by: or(&meta.approved_by, PLACEHOLDER),
            executive_summary: meta.abstract_text.clone(),
        },
        PersonaMetadata::Scholar(meta) => FrontMatterBlock::CourseCover {
            course: or(&meta.course, "COURSE NAME"),
            title: or(&meta.title, "LECTURE NOTES"),
            student: or(&meta.student, ""),
            date: or(&meta.date, today),
            objectives: meta
                .objectives
                .iter()
                .enumerate()
                .map(|(index, objective)| ObjectiveItem {
                    text: objective.text.clone(),
                    checked: objective.checked,
                    patch: Patch::ToggleObjective { index },
                })
                .collect(),
            accent_color: meta.accent_color.clone(),
        },
        PersonaMetadata::Scriptwriter(meta) => FrontMatterBlock::ScriptCover {
            title: or(&meta.title, "UNTITLED SCRIPT"),
            written_by: meta.author.clone(),
            based_on: meta.based_on.clone(),
            date: meta.date.clone(),
            contact: meta.contact.clone(),
        },
        PersonaMetadata::Journalist(meta) => FrontMatterBlock::PressHeader {
            dateline: or(&meta.date, today),
            category: "PRESS RELEASE / NEWS".to_string(),
            title: or(&meta.title, "UNTITLED ARTICLE"),
            subtitle: meta.subtitle.clone(),
            byline: or(&meta.byline, "Anonymous"),
            profession: meta.profession.clone(),
        },
    };
    Some(block)
}

#[cfg(test)]
mod tests {
    use super::{front_matter, FrontMatterBlock};
    use crate::model::metadata::Metadata;
    use crate::model::persona::{Persona, PersonaMetadata};
    use crate::render::patch::Patch;

    fn record(persona: Persona, yaml: &str) -> PersonaMetadata {
        let meta: Metadata = if yaml.is_empty() {
            Metadata::new()
        } else {
            serde_yaml::from_str(yaml).unwrap()
        };
        PersonaMetadata::from_metadata(persona, &meta)
    }

    #[test]
    fn researcher_header_needs_content() {
        assert!(front_matter(&record(Persona::Researcher, ""), "2026-01-01", true).is_none());
        let header = front_matter(
            &record(Persona::Researcher, "abstract: Short\n"),
            "2026-01-01",
            false,
        )
        .unwrap();
        assert!(!header.collapsible);
        assert!(matches!(
            header.block,
            Some(FrontMatterBlock::ResearchHeader { abstract_text: Some(_), .. })
        ));
    }

    #[test]
    fn engineering_cover_uses_placeholders() {
        let cover = front_matter(&record(Persona::Engineer, ""), "2026-01-01", true).unwrap();
        let Some(FrontMatterBlock::EngineeringCover {
            title,
            revision,
            client,
            date,
            ..
        }) = cover.block
        else {
            panic!("expected engineering cover");
        };
        assert_eq!(title, "CALCULATION REPORT");
        assert_eq!(revision, "Rev 0");
        assert_eq!(client, "---");
        assert_eq!(date, "2026-01-01");
    }

    #[test]
    fn folded_cover_has_no_block() {
        let cover = front_matter(&record(Persona::Scriptwriter, ""), "d", false).unwrap();
        assert!(cover.collapsible);
        assert!(!cover.open);
        assert!(cover.block.is_none());
    }

    #[test]
    fn scholar_cover_carries_objective_patches_and_can_be_hidden() {
        let cover = front_matter(
            &record(Persona::Scholar, "objectives:\n  - One\n  - '[x] Two'\n"),
            "d",
            true,
        )
        .unwrap();
        let Some(FrontMatterBlock::CourseCover { objectives, course, .. }) = cover.block else {
            panic!("expected course cover");
        };
        assert_eq!(course, "COURSE NAME");
        assert_eq!(objectives.len(), 2);
        assert!(objectives[1].checked);
        assert_eq!(objectives[1].text, "Two");
        assert_eq!(objectives[1].patch, Patch::ToggleObjective { index: 1 });

        assert!(front_matter(&record(Persona::Scholar, "showCover: false\n"), "d", true).is_none());
    }

    #[test]
    fn press_header_defaults() {
        let cover = front_matter(&record(Persona::Journalist, ""), "2026-02-03", true).unwrap();
        let Some(FrontMatterBlock::PressHeader {
            byline,
            title,
            dateline,
            category,
            ..
        }) = cover.block
        else {
            panic!("expected press header");
        };
        assert_eq!(byline, "Anonymous");
        assert_eq!(title, "UNTITLED ARTICLE");
        assert_eq!(dateline, "2026-02-03");
        assert_eq!(category, "PRESS RELEASE / NEWS");
    }
}
