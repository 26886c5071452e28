//! Persona enum and typed per-persona metadata records.
//!
//! # Responsibility
//! - Map the schema-less frontmatter onto one fixed record per persona.
//! - Write typed fields back without disturbing keys the record does not own.
//!
//! # Invariants
//! - Reading never fails: missing or mistyped fields become `None`/defaults.
//! - `write_into` only touches keys owned by the record.

use crate::model::metadata::{display_text, Metadata};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

static OBJECTIVE_CHECKED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[[xX]\]\s+").expect("valid objective regex"));

/// Authoring profile selecting templates, metadata schema and layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    #[default]
    Researcher,
    Engineer,
    Scholar,
    Scriptwriter,
    Journalist,
}

impl Persona {
    pub const ALL: [Persona; 5] = [
        Persona::Researcher,
        Persona::Engineer,
        Persona::Scholar,
        Persona::Scriptwriter,
        Persona::Journalist,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Researcher => "researcher",
            Self::Engineer => "engineer",
            Self::Scholar => "scholar",
            Self::Scriptwriter => "scriptwriter",
            Self::Journalist => "journalist",
        }
    }
}

impl Display for Persona {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown persona name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPersona(pub String);

impl Display for UnknownPersona {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown persona `{}`; expected researcher|engineer|scholar|scriptwriter|journalist",
            self.0
        )
    }
}

impl Error for UnknownPersona {}

impl FromStr for Persona {
    type Err = UnknownPersona;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Persona::ALL
            .into_iter()
            .find(|persona| persona.as_str() == normalized)
            .ok_or_else(|| UnknownPersona(value.trim().to_string()))
    }
}

/// One entry of an `authors` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorCard {
    pub name: String,
    pub affiliation: Option<String>,
    pub email: Option<String>,
}

/// Scholar objective with its checked prefix split off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Objective {
    pub text: String,
    pub checked: bool,
}

impl Objective {
    pub fn parse(raw: &str) -> Self {
        match OBJECTIVE_CHECKED_RE.find(raw) {
            Some(prefix) => Self {
                text: raw[prefix.end()..].to_string(),
                checked: true,
            },
            None => Self {
                text: raw.to_string(),
                checked: false,
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResearcherMeta {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub authors: Vec<AuthorCard>,
    pub display_authors: Option<String>,
    pub profession: Option<String>,
    pub date: Option<String>,
    pub abstract_text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineerMeta {
    pub title: Option<String>,
    pub client: Option<String>,
    pub project_number: Option<String>,
    pub date: Option<String>,
    pub revision: Option<String>,
    pub authors: Vec<AuthorCard>,
    pub display_authors: Option<String>,
    pub checked_by: Option<String>,
    pub approved_by: Option<String>,
    pub abstract_text: Option<String>,
    pub show_toc: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScholarMeta {
    pub title: Option<String>,
    pub course: Option<String>,
    pub student: Option<String>,
    pub date: Option<String>,
    pub objectives: Vec<Objective>,
    pub show_cover: bool,
    pub accent_color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScriptwriterMeta {
    pub title: Option<String>,
    pub author: Option<String>,
    pub based_on: Option<String>,
    pub date: Option<String>,
    pub contact: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JournalistMeta {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub byline: Option<String>,
    pub profession: Option<String>,
    pub date: Option<String>,
}

/// Typed view of a document's frontmatter for one persona.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "persona", rename_all = "lowercase")]
pub enum PersonaMetadata {
    Researcher(ResearcherMeta),
    Engineer(EngineerMeta),
    Scholar(ScholarMeta),
    Scriptwriter(ScriptwriterMeta),
    Journalist(JournalistMeta),
}

impl PersonaMetadata {
    /// Reads the record for `persona` from generic frontmatter.
    pub fn from_metadata(persona: Persona, meta: &Metadata) -> Self {
        match persona {
            Persona::Researcher => Self::Researcher(ResearcherMeta {
                title: meta.text("title"),
                subtitle: meta.text("subtitle"),
                authors: author_cards(meta),
                display_authors: display_authors(meta),
                profession: meta.text("profession"),
                date: meta.text("date"),
                abstract_text: meta.text("abstract"),
            }),
            Persona::Engineer => Self::Engineer(EngineerMeta {
                title: meta.text("title"),
                client: meta.text("client"),
                project_number: meta.text("projectNumber"),
                date: meta.text("date"),
                revision: meta.text("revision"),
                authors: author_cards(meta),
                display_authors: display_authors(meta),
                checked_by: meta.text("checkedBy"),
                approved_by: meta.text("approvedBy"),
                abstract_text: meta.text("abstract"),
                show_toc: meta.flag("showToC").unwrap_or(true),
            }),
            Persona::Scholar => Self::Scholar(ScholarMeta {
                title: meta.text("title"),
                course: meta.text("course"),
                student: display_authors(meta),
                date: meta.text("date"),
                objectives: meta
                    .string_list("objectives")
                    .iter()
                    .map(|raw| Objective::parse(raw))
                    .collect(),
                show_cover: meta.flag("showCover").unwrap_or(true),
                accent_color: meta.text("accentColor"),
            }),
            Persona::Scriptwriter => Self::Scriptwriter(ScriptwriterMeta {
                title: meta.text("title"),
                author: meta.text("author"),
                based_on: meta.text("basedOn"),
                date: meta.text("date"),
                contact: meta.text("contact"),
            }),
            Persona::Journalist => Self::Journalist(JournalistMeta {
                title: meta.text("title"),
                subtitle: meta.text("subtitle"),
                byline: display_authors(meta),
                profession: meta.text("profession"),
                date: meta.text("date"),
            }),
        }
    }

    pub fn persona(&self) -> Persona {
        match self {
            Self::Researcher(_) => Persona::Researcher,
            Self::Engineer(_) => Persona::Engineer,
            Self::Scholar(_) => Persona::Scholar,
            Self::Scriptwriter(_) => Persona::Scriptwriter,
            Self::Journalist(_) => Persona::Journalist,
        }
    }

    /// Writes owned scalar fields back into `meta`.
    ///
    /// Author lists and bylines are projections of `authors`/`author` and are
    /// left untouched; edit those through `Metadata` directly.
    pub fn write_into(&self, meta: &mut Metadata) {
        match self {
            Self::Researcher(record) => {
                put_text(meta, "title", &record.title);
                put_text(meta, "subtitle", &record.subtitle);
                put_text(meta, "profession", &record.profession);
                put_text(meta, "date", &record.date);
                put_text(meta, "abstract", &record.abstract_text);
            }
            Self::Engineer(record) => {
                put_text(meta, "title", &record.title);
                put_text(meta, "client", &record.client);
                put_text(meta, "projectNumber", &record.project_number);
                put_text(meta, "date", &record.date);
                put_text(meta, "revision", &record.revision);
                put_text(meta, "checkedBy", &record.checked_by);
                put_text(meta, "approvedBy", &record.approved_by);
                put_text(meta, "abstract", &record.abstract_text);
                meta.set("showToC", record.show_toc);
            }
            Self::Scholar(record) => {
                put_text(meta, "title", &record.title);
                put_text(meta, "course", &record.course);
                put_text(meta, "date", &record.date);
                put_text(meta, "accentColor", &record.accent_color);
                let objectives: Vec<Value> = record
                    .objectives
                    .iter()
                    .map(|objective| Value::String(objective_source(objective)))
                    .collect();
                meta.set("objectives", Value::Sequence(objectives));
                meta.set("showCover", record.show_cover);
            }
            Self::Scriptwriter(record) => {
                put_text(meta, "title", &record.title);
                put_text(meta, "author", &record.author);
                put_text(meta, "basedOn", &record.based_on);
                put_text(meta, "date", &record.date);
                put_text(meta, "contact", &record.contact);
            }
            Self::Journalist(record) => {
                put_text(meta, "title", &record.title);
                put_text(meta, "subtitle", &record.subtitle);
                put_text(meta, "profession", &record.profession);
                put_text(meta, "date", &record.date);
            }
        }
    }
}

/// Flips the `[x] ` prefix of `objectives[index]`.
///
/// Returns `false` (and leaves `meta` unchanged) when the index does not
/// address a string objective.
pub fn toggle_objective(meta: &mut Metadata, index: usize) -> bool {
    let Some(Value::Sequence(items)) = meta.get_mut("objectives") else {
        return false;
    };
    let Some(Value::String(current)) = items.get_mut(index) else {
        return false;
    };

    let objective = Objective::parse(current);
    *current = if objective.checked {
        objective.text
    } else {
        format!("[x] {current}")
    };
    true
}

/// Joins author names for bylines: `authors[*].name` first, then `author`.
pub fn display_authors(meta: &Metadata) -> Option<String> {
    if let Some(Value::Sequence(authors)) = meta.get("authors") {
        let names: Vec<String> = authors
            .iter()
            .filter_map(|author| match author {
                Value::Mapping(fields) => fields
                    .get("name")
                    .and_then(display_text)
                    .or_else(|| display_text(author)),
                other => display_text(other),
            })
            .collect();
        let joined = names.join(", ");
        return (!joined.trim().is_empty()).then_some(joined);
    }

    match meta.get("author") {
        Some(Value::Mapping(fields)) => fields
            .get("name")
            .and_then(display_text)
            .or_else(|| meta.get("author").and_then(display_text)),
        Some(other) => display_text(other).filter(|value| !value.trim().is_empty()),
        None => None,
    }
}

fn author_cards(meta: &Metadata) -> Vec<AuthorCard> {
    let Some(Value::Sequence(authors)) = meta.get("authors") else {
        return Vec::new();
    };

    authors
        .iter()
        .map(|author| match author {
            Value::Mapping(fields) => {
                let field = |key: &str| {
                    fields
                        .get(key)
                        .and_then(display_text)
                        .filter(|value| !value.trim().is_empty())
                };
                AuthorCard {
                    name: field("name").unwrap_or_else(|| "Unknown".to_string()),
                    affiliation: field("affiliation").or_else(|| field("company")),
                    email: field("email"),
                }
            }
            other => AuthorCard {
                name: display_text(other).unwrap_or_else(|| "Unknown".to_string()),
                affiliation: None,
                email: None,
            },
        })
        .collect()
}

fn objective_source(objective: &Objective) -> String {
    if objective.checked {
        format!("[x] {}", objective.text)
    } else {
        objective.text.clone()
    }
}

fn put_text(meta: &mut Metadata, key: &str, value: &Option<String>) {
    match value {
        Some(text) => meta.set(key, text.as_str()),
        None => {
            meta.remove(key);
        }
    }
}
