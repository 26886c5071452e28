//! Persona document templates and default frontmatter.

use crate::config::UserSettings;
use crate::markdown::frontmatter;
use crate::model::metadata::Metadata;
use crate::model::persona::Persona;
use chrono::Local;
use serde_yaml::{Mapping, Value};

/// Files and folders written when a project is created from a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectTemplate {
    pub containers: Vec<String>,
    /// `(path, content)` pairs, written in order.
    pub documents: Vec<(String, String)>,
    /// Document opened after creation.
    pub open_path: String,
}

/// Default frontmatter for a new markdown file in `mode`.
pub fn default_metadata(mode: Persona, settings: &UserSettings, today: &str) -> Metadata {
    let mut meta = Metadata::new();
    match mode {
        Persona::Engineer => {
            meta.set("authors", author_list(settings));
            meta.set("showToC", true);
            meta.set("client", "");
            meta.set("projectNumber", "");
            meta.set("revision", "Rev 0");
            meta.set("date", today);
        }
        Persona::Researcher | Persona::Scholar => {
            meta.set("authors", author_list(settings));
        }
        Persona::Journalist => {
            meta.set("author", settings.name.as_str());
            meta.set("profession", settings.profession.as_str());
            meta.set("email", settings.email.as_str());
            meta.set("phone", settings.phone.as_str());
            meta.set("date", today);
        }
        Persona::Scriptwriter => {
            meta.set("author", settings.name.as_str());
            meta.set("profession", settings.profession.as_str());
            meta.set("email", settings.email.as_str());
            meta.set("phone", settings.phone.as_str());
            meta.set("basedOn", "");
            meta.set("date", today);
        }
    }
    meta
}

/// Initial text for a file created inside a project.
///
/// Markdown files get the persona's default frontmatter and a heading named
/// after the file; anything else starts empty.
pub fn new_file_content(file_name: &str, mode: Persona, settings: &UserSettings, today: &str) -> String {
    let Some(stem) = file_name.strip_suffix(".md") else {
        return String::new();
    };
    let stem = stem.rsplit('/').next().unwrap_or(stem);
    let meta = default_metadata(mode, settings, today);
    frontmatter::encode(&meta, &format!("# {stem}\n\n"))
}

/// Template tree for a new project named `name`.
pub fn project_template(name: &str, mode: Persona, settings: &UserSettings, today: &str) -> ProjectTemplate {
    match mode {
        Persona::Researcher => ProjectTemplate {
            containers: vec!["figures".to_string()],
            documents: vec![
                ("main.md".to_string(), format!("# {name}\n\nStart writing...")),
                ("references.bib".to_string(), String::new()),
            ],
            open_path: "main.md".to_string(),
        },
        Persona::Journalist => {
            let mut documents = Vec::new();
            for category in ["Category 1", "Category 2"] {
                for (file, title) in [("pressNote1.md", "Press Note 1"), ("pressNote2.md", "Press Note 2")] {
                    documents.push((format!("{category}/{file}"), press_note(title, settings, today)));
                }
            }
            documents.push(("notes.md".to_string(), format!("# Notes: {name}\n\nKey points...")));
            ProjectTemplate {
                containers: vec![
                    "figures".to_string(),
                    "Category 1".to_string(),
                    "Category 2".to_string(),
                ],
                documents,
                open_path: "notes.md".to_string(),
            }
        }
        Persona::Engineer => ProjectTemplate {
            containers: vec!["figures".to_string()],
            documents: vec![("report.md".to_string(), engineering_report(name, today))],
            open_path: "report.md".to_string(),
        },
        Persona::Scholar => ProjectTemplate {
            containers: vec![
                "course 1".to_string(),
                "course 2".to_string(),
                "me".to_string(),
            ],
            documents: vec![
                ("course 1/lecture1.md".to_string(), "# Lecture 1\n\nNotes...".to_string()),
                ("course 2/lecture2.md".to_string(), "# Lecture 2\n\nNotes...".to_string()),
                ("me/todo.md".to_string(), "# To Do\n\n- [ ] Task 1".to_string()),
            ],
            open_path: "me/todo.md".to_string(),
        },
        Persona::Scriptwriter => ProjectTemplate {
            containers: Vec::new(),
            documents: vec![("script.md".to_string(), screenplay(name, today))],
            open_path: "script.md".to_string(),
        },
    }
}

/// Current local date as `YYYY-MM-DD`.
pub fn today_iso() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

fn author_list(settings: &UserSettings) -> Value {
    let mut author = Mapping::new();
    for (key, value) in [
        ("name", &settings.name),
        ("affiliation", &settings.affiliation),
        ("company", &settings.company),
        ("email", &settings.email),
        ("phone", &settings.phone),
    ] {
        author.insert(Value::from(key), Value::from(value.as_str()));
    }
    Value::Sequence(vec![Value::Mapping(author)])
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() {
        placeholder
    } else {
        value
    }
}

fn press_note(title: &str, settings: &UserSettings, today: &str) -> String {
    let mut meta = Metadata::new();
    meta.set("title", title);
    meta.set("subtitle", "Subtitle...");
    meta.set("author", or_placeholder(&settings.name, "Author Name"));
    meta.set("profession", or_placeholder(&settings.profession, "Profession"));
    meta.set("email", settings.email.as_str());
    meta.set("phone", settings.phone.as_str());
    meta.set("date", today);
    frontmatter::encode(&meta, &format!("# {title}\n\nContent..."))
}

fn engineering_report(name: &str, today: &str) -> String {
    let year = today.get(..4).unwrap_or(today);
    let mut engineer = Mapping::new();
    engineer.insert(Value::from("name"), Value::from("Engineer Name"));
    engineer.insert(Value::from("affiliation"), Value::from("Structural Department"));

    let mut meta = Metadata::new();
    meta.set("title", name);
    meta.set("client", "Placeholder Client");
    meta.set("projectNumber", format!("ENG-{year}-001"));
    meta.set("date", today);
    meta.set("revision", "Rev 0");
    meta.set("authors", Value::Sequence(vec![Value::Mapping(engineer)]));
    frontmatter::encode(
        &meta,
        &format!(
            "# Engineer's Report: {name}\n\n## Summary\n\nThis report presents calculation results..."
        ),
    )
}

fn screenplay(name: &str, today: &str) -> String {
    let mut meta = Metadata::new();
    meta.set("title", name);
    meta.set("author", "Writer Name");
    meta.set("basedOn", "");
    meta.set("date", today);
    meta.set("contact", "Agent Name\nAgency Name\nPhone / Email\n");
    frontmatter::encode(
        &meta,
        "# PRELUDE\n[ACTION, LOCATION, ATMOSPHERE]\n\n**CHARACTER NAME**\n(Parenthetical)\nDialogue\n\n\
         **CHARACTER NAME 2**\nDialogue \n\n---\n\n# SCENE 1\n\n...\n\n---\n\n# SCENE 2\n...\n\n---\n\n# THE END",
    )
}
