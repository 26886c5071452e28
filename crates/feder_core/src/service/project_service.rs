//! Project-level use cases over a storage root.
//!
//! # Responsibility
//! - Load and persist the `project_metadata.json` sidecar.
//! - Pick the document opened by default for a project.
//! - Create new projects from persona templates.
//!
//! # Invariants
//! - A missing or malformed sidecar never blocks opening a project.
//! - Template creation writes the sidecar before any document.

use crate::config::UserSettings;
use crate::model::persona::Persona;
use crate::model::project::{ProjectMetadata, PROJECT_METADATA_FILE};
use crate::service::templates::project_template;
use crate::storage::{Storage, StorageError, StorageResult};
use log::{info, warn};

/// Reads the sidecar, falling back to `{ name: fallback_name, mode: researcher }`.
pub fn load_project_metadata<S: Storage>(storage: &S, fallback_name: &str) -> ProjectMetadata {
    let bytes = match storage.read_document(PROJECT_METADATA_FILE) {
        Ok(bytes) => bytes,
        Err(StorageError::NotFound(_)) => {
            info!("event=project_metadata_load module=service status=absent");
            return ProjectMetadata::new(fallback_name, Persona::Researcher);
        }
        Err(err) => {
            warn!(
                "event=project_metadata_load module=service status=error error={}",
                err
            );
            return ProjectMetadata::new(fallback_name, Persona::Researcher);
        }
    };

    match serde_json::from_slice::<ProjectMetadata>(&bytes) {
        Ok(meta) => {
            info!(
                "event=project_metadata_load module=service status=ok mode={} live_preview={}",
                meta.mode, meta.live_preview
            );
            meta
        }
        Err(err) => {
            warn!(
                "event=project_metadata_load module=service status=fallback reason=invalid_json error={}",
                err
            );
            ProjectMetadata::new(fallback_name, Persona::Researcher)
        }
    }
}

/// Writes the sidecar as pretty JSON.
pub fn save_project_metadata<S: Storage>(storage: &mut S, meta: &ProjectMetadata) -> StorageResult<()> {
    let json = meta.to_json_pretty().map_err(|err| StorageError::Io {
        path: PROJECT_METADATA_FILE.to_string(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, err),
    })?;
    storage.write_document(PROJECT_METADATA_FILE, json.as_bytes())
}

/// Preferred document per persona.
pub fn preferred_document(mode: Persona) -> &'static str {
    match mode {
        Persona::Researcher => "main.md",
        Persona::Journalist => "notes.md",
        Persona::Engineer => "report.md",
        Persona::Scriptwriter => "script.md",
        Persona::Scholar => "me/todo.md",
    }
}

/// Document to open for a project in `mode`.
///
/// Order: the persona's preferred document, then `main.md`, then the first
/// `.md` document in the root by name. `None` for a project without any.
pub fn default_document_path<S: Storage>(storage: &S, mode: Persona) -> Option<String> {
    for candidate in [preferred_document(mode), "main.md"] {
        if storage.read_document(candidate).is_ok() {
            return Some(candidate.to_string());
        }
    }

    storage
        .list_children("")
        .ok()?
        .into_iter()
        .find(|entry| !entry.is_container && entry.name.ends_with(".md"))
        .map(|entry| entry.name)
}

/// Initializes a project in an empty storage root.
///
/// Returns the document to open, or `None` for an untemplated project.
pub fn create_project<S: Storage>(
    storage: &mut S,
    name: &str,
    mode: Persona,
    use_template: bool,
    settings: &UserSettings,
    today: &str,
) -> StorageResult<(ProjectMetadata, Option<String>)> {
    let name = match name.trim() {
        "" => "Untitled Project",
        trimmed => trimmed,
    };
    let meta = ProjectMetadata::new(name, mode);
    save_project_metadata(storage, &meta)?;

    if !use_template {
        info!(
            "event=project_create module=service status=ok mode={} template=false",
            mode
        );
        return Ok((meta, None));
    }

    let template = project_template(name, mode, settings, today);
    for container in &template.containers {
        storage.create_container(container)?;
    }
    for (path, content) in &template.documents {
        storage.write_document(path, content.as_bytes())?;
    }

    info!(
        "event=project_create module=service status=ok mode={} template=true documents={}",
        mode,
        template.documents.len()
    );
    Ok((meta, Some(template.open_path)))
}

#[cfg(test)]
mod tests {
    use super::{create_project, default_document_path, load_project_metadata};
    use crate::config::UserSettings;
    use crate::model::persona::Persona;
    use crate::model::project::PROJECT_METADATA_FILE;
    use crate::storage::{MemoryStorage, Storage};

    #[test]
    fn missing_or_broken_sidecar_defaults_to_researcher() {
        let storage = MemoryStorage::new();
        let meta = load_project_metadata(&storage, "Thesis");
        assert_eq!(meta.name, "Thesis");
        assert_eq!(meta.mode, Persona::Researcher);

        let broken = MemoryStorage::with_documents([(PROJECT_METADATA_FILE, "{not json")]).unwrap();
        assert_eq!(load_project_metadata(&broken, "X").mode, Persona::Researcher);
    }

    #[test]
    fn default_document_prefers_persona_file() {
        let storage =
            MemoryStorage::with_documents([("main.md", ""), ("me/todo.md", ""), ("b.md", "")]).unwrap();
        assert_eq!(
            default_document_path(&storage, Persona::Scholar).as_deref(),
            Some("me/todo.md")
        );
        assert_eq!(
            default_document_path(&storage, Persona::Engineer).as_deref(),
            Some("main.md")
        );
    }

    #[test]
    fn default_document_falls_back_to_first_markdown() {
        let storage =
            MemoryStorage::with_documents([("z.md", ""), ("a.txt", ""), ("b.md", "")]).unwrap();
        assert_eq!(
            default_document_path(&storage, Persona::Journalist).as_deref(),
            Some("b.md")
        );
        assert_eq!(default_document_path(&MemoryStorage::new(), Persona::Journalist), None);
    }

    #[test]
    fn create_project_writes_sidecar_and_template() {
        let mut storage = MemoryStorage::new();
        let (meta, open) = create_project(
            &mut storage,
            "  ",
            Persona::Journalist,
            true,
            &UserSettings::default(),
            "2026-03-01",
        )
        .unwrap();
        assert_eq!(meta.name, "Untitled Project");
        assert_eq!(open.as_deref(), Some("notes.md"));
        assert!(storage.read_document("Category 2/pressNote2.md").is_ok());

        let sidecar: serde_json::Value =
            serde_json::from_slice(&storage.read_document(PROJECT_METADATA_FILE).unwrap()).unwrap();
        assert_eq!(sidecar["mode"], "journalist");
        assert_eq!(sidecar["livePreview"], false);
    }
}
