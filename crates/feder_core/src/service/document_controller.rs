//! Editing session over one project storage.
//!
//! # Responsibility
//! - Own the editable state: content, metadata, project metadata and the
//!   `NoDocument | Clean | Dirty` state.
//! - Decide when the preview buffer follows the editor buffer.
//! - Persist documents and the project sidecar through `Storage`.
//!
//! # Invariants
//! - Loads populate state directly and finish `Clean`; only the public
//!   mutators can make a document dirty.
//! - Every document switch saves a dirty document first, and proceeds even
//!   when that save is cancelled or fails.
//! - Autosave never prompts for a destination.
//! - Timers only advance through the `Instant` values passed in.

use crate::citation::bibtex::{parse_bibliography, Bibliography};
use crate::config::{CoreConfig, UserSettings};
use crate::markdown::latex::{latex_to_markdown, IMPORTED_FILE_NAME};
use crate::model::document::{Document, DocumentKind};
use crate::model::metadata::Metadata;
use crate::model::persona::Persona;
use crate::model::project::ProjectMetadata;
use crate::render::patch::{apply_to_body, apply_to_metadata, rebase_checkbox, Patch};
use crate::render::tree::{ImageRef, RenderedDocument};
use crate::render::{render_document, RenderInput, ViewState};
use crate::service::images::{ImageCache, ResolvedImage};
use crate::service::project_service;
use crate::service::templates::new_file_content;
use crate::storage::{join_path, normalize_path, Storage, StorageError};
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type ControllerResult<T> = Result<T, ControllerError>;

/// Failures surfaced to the user.
#[derive(Debug)]
pub enum ControllerError {
    Storage(StorageError),
    /// Operation needs an open project.
    NoProject,
    /// Operation needs an open document.
    NoDocument,
    /// The current document is view-only (images).
    NotEditable(String),
    /// File extension the editor does not open.
    UnsupportedFile(String),
}

impl ControllerError {
    /// Message for the UI; `None` when nothing should be shown.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::Storage(StorageError::Cancelled) => None,
            Self::Storage(err) => Some(format!("Storage operation failed: {err}")),
            Self::NoProject => Some("Open or create a project first.".to_string()),
            Self::NoDocument => Some("No document is open.".to_string()),
            Self::NotEditable(path) => Some(format!("{path} cannot be edited.")),
            Self::UnsupportedFile(path) => Some(format!("Unsupported file type: {path}")),
        }
    }
}

impl Display for ControllerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(err) => write!(f, "{err}"),
            Self::NoProject => write!(f, "no project is open"),
            Self::NoDocument => write!(f, "no document is open"),
            Self::NotEditable(path) => write!(f, "document is not editable: `{path}`"),
            Self::UnsupportedFile(path) => write!(f, "unsupported file type: `{path}`"),
        }
    }
}

impl Error for ControllerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for ControllerError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    NoDocument,
    Clean,
    Dirty,
}

/// Interactive destination picker used by explicit saves.
pub trait SavePrompt {
    /// Returns a project-relative path, or `StorageError::Cancelled`.
    fn choose_save_path(&mut self, suggested_name: &str) -> Result<String, StorageError>;
}

/// Prompt that always declines; used where prompting is not allowed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrompt;

impl SavePrompt for NoPrompt {
    fn choose_save_path(&mut self, _suggested_name: &str) -> Result<String, StorageError> {
        Err(StorageError::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(String),
    /// Nothing to save, or no silent target.
    Skipped,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    Opened(String),
    /// The project has no document to open.
    NoDocument,
    Cancelled,
}

/// What one `tick` did.
#[derive(Debug, Default)]
pub struct TickReport {
    pub preview_synced: bool,
    /// Set when the autosave period elapsed.
    pub autosave: Option<ControllerResult<SaveOutcome>>,
}

pub struct DocumentController<S: Storage> {
    config: CoreConfig,
    settings: UserSettings,
    storage: S,
    project: Option<ProjectMetadata>,
    document: Option<Document>,
    state: DocumentState,
    preview_content: String,
    preview_deadline: Option<Instant>,
    next_autosave: Instant,
    bibliography: Option<(String, Bibliography)>,
    view: ViewState,
    images: ImageCache,
}

impl<S: Storage> DocumentController<S> {
    /// Session without a project; `storage` receives untitled saves.
    pub fn new(storage: S, config: CoreConfig, settings: UserSettings, now: Instant) -> Self {
        let next_autosave = now + config.autosave_interval();
        Self {
            config,
            settings,
            storage,
            project: None,
            document: None,
            state: DocumentState::NoDocument,
            preview_content: String::new(),
            preview_deadline: None,
            next_autosave,
            bibliography: None,
            view: ViewState::default(),
            images: ImageCache::new(),
        }
    }

    pub fn state(&self) -> DocumentState {
        self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.state == DocumentState::Dirty
    }

    pub fn content(&self) -> &str {
        self.document.as_ref().map_or("", |doc| doc.content.as_str())
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.document.as_ref().map(|doc| &doc.metadata)
    }

    /// Buffer the preview renders from.
    pub fn preview_content(&self) -> &str {
        &self.preview_content
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn current_path(&self) -> Option<&str> {
        self.document.as_ref().and_then(|doc| doc.path.as_deref())
    }

    pub fn project(&self) -> Option<&ProjectMetadata> {
        self.project.as_ref()
    }

    pub fn persona(&self) -> Persona {
        self.project.as_ref().map(|meta| meta.mode).unwrap_or_default()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    /// Saves the current document if needed, then switches to `storage`.
    pub fn open_project(
        &mut self,
        storage: S,
        fallback_name: &str,
        prompt: &mut dyn SavePrompt,
    ) -> ControllerResult<OpenOutcome> {
        self.leave_document(prompt);
        self.reset_document();
        self.storage = storage;
        self.bibliography = None;

        let meta = project_service::load_project_metadata(&self.storage, fallback_name);
        let default_path = project_service::default_document_path(&self.storage, meta.mode);
        info!(
            "event=project_open module=service status=ok mode={} has_default={}",
            meta.mode,
            default_path.is_some()
        );
        self.project = Some(meta);

        match default_path {
            Some(path) => self.load_document(&path),
            None => Ok(OpenOutcome::NoDocument),
        }
    }

    /// Initializes a project in `storage` and opens its starting document.
    pub fn create_project(
        &mut self,
        storage: S,
        name: &str,
        mode: Persona,
        use_template: bool,
        today: &str,
        prompt: &mut dyn SavePrompt,
    ) -> ControllerResult<OpenOutcome> {
        self.leave_document(prompt);
        self.reset_document();
        self.storage = storage;
        self.bibliography = None;

        let (meta, open_path) = project_service::create_project(
            &mut self.storage,
            name,
            mode,
            use_template,
            &self.settings,
            today,
        )?;
        self.project = Some(meta);

        match open_path {
            Some(path) => self.load_document(&path),
            None => Ok(OpenOutcome::NoDocument),
        }
    }

    pub fn open_document(&mut self, path: &str, prompt: &mut dyn SavePrompt) -> ControllerResult<OpenOutcome> {
        let path = normalize_path(path)?;
        if DocumentKind::from_path(&path).is_none() {
            return Err(ControllerError::UnsupportedFile(path));
        }
        if self.current_path() == Some(path.as_str()) {
            return Ok(OpenOutcome::Opened(path));
        }
        self.leave_document(prompt);
        self.load_document(&path)
    }

    /// Returns to the neutral state, saving a dirty document first.
    pub fn close_document(&mut self, prompt: &mut dyn SavePrompt) {
        self.leave_document(prompt);
        self.reset_document();
    }

    /// Starts an unsaved markdown document.
    pub fn new_untitled(&mut self, prompt: &mut dyn SavePrompt) {
        self.leave_document(prompt);
        self.reset_document();
        self.document = Some(Document::untitled());
        self.state = DocumentState::Clean;
    }

    /// Creates `parent/name` with persona defaults. Returns its path.
    pub fn create_file(&mut self, parent: &str, name: &str, today: &str) -> ControllerResult<String> {
        let mode = self.project.as_ref().ok_or(ControllerError::NoProject)?.mode;
        let path = normalize_path(&join_path(parent, name))?;
        if path.is_empty() {
            return Err(StorageError::InvalidPath(name.to_string()).into());
        }
        if self.storage.exists(&path) {
            return Err(StorageError::AlreadyExists(path).into());
        }

        let content = new_file_content(&path, mode, &self.settings, today);
        self.storage.write_document(&path, content.as_bytes())?;
        info!(
            "event=file_create module=service status=ok path={} mode={}",
            path, mode
        );
        Ok(path)
    }

    /// Writes the document to its path, asking `prompt` when it has none.
    pub fn save(&mut self, prompt: &mut dyn SavePrompt) -> ControllerResult<SaveOutcome> {
        let Some(document) = self.document.as_ref() else {
            return Ok(SaveOutcome::Skipped);
        };
        let target = match &document.path {
            Some(path) => path.clone(),
            None => match prompt.choose_save_path(document.display_name()) {
                Ok(path) => path,
                Err(StorageError::Cancelled) => {
                    info!("event=document_save module=service status=cancelled");
                    return Ok(SaveOutcome::Cancelled);
                }
                Err(err) => return Err(err.into()),
            },
        };
        self.write_to(&target)
    }

    /// Always asks `prompt` for a new destination.
    pub fn save_as(&mut self, prompt: &mut dyn SavePrompt) -> ControllerResult<SaveOutcome> {
        let Some(document) = self.document.as_ref() else {
            return Ok(SaveOutcome::Skipped);
        };
        match prompt.choose_save_path(document.display_name()) {
            Ok(path) => self.write_to(&path),
            Err(StorageError::Cancelled) => {
                info!("event=document_save module=service status=cancelled");
                Ok(SaveOutcome::Cancelled)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Silent save of a dirty document that already has a path.
    pub fn autosave(&mut self) -> ControllerResult<SaveOutcome> {
        if !self.is_dirty() {
            return Ok(SaveOutcome::Skipped);
        }
        match self.current_path().map(str::to_string) {
            Some(path) => self.write_to(&path),
            None => {
                debug!("event=autosave module=service status=skip reason=no_target");
                Ok(SaveOutcome::Skipped)
            }
        }
    }

    /// Replaces the editor buffer.
    pub fn set_content(&mut self, content: impl Into<String>, now: Instant) -> ControllerResult<()> {
        let document = self.editable_document()?;
        document.content = content.into();
        self.state = DocumentState::Dirty;
        if self.live_preview() {
            self.preview_deadline = Some(now + self.config.preview_debounce());
        }
        Ok(())
    }

    pub fn set_metadata(&mut self, metadata: Metadata) -> ControllerResult<()> {
        let document = self.editable_document()?;
        document.metadata = metadata;
        self.state = DocumentState::Dirty;
        Ok(())
    }

    /// Replaces the project settings.
    ///
    /// Turning live preview on syncs the preview immediately. Without an
    /// open document the sidecar is written right away.
    pub fn set_project_metadata(&mut self, meta: ProjectMetadata) -> ControllerResult<()> {
        let previous = self.project.as_ref().ok_or(ControllerError::NoProject)?;
        let enabling_live = meta.live_preview && !previous.live_preview;
        if previous.bib_file != meta.bib_file {
            self.bibliography = None;
        }
        if previous.figures_folder() != meta.figures_folder() {
            self.images.clear();
        }
        self.project = Some(meta);

        if enabling_live {
            self.sync_preview();
        }

        match self.state {
            DocumentState::NoDocument => {
                if let Some(meta) = &self.project {
                    project_service::save_project_metadata(&mut self.storage, meta)?;
                }
            }
            DocumentState::Clean | DocumentState::Dirty => self.state = DocumentState::Dirty,
        }
        Ok(())
    }

    /// Advances the debounce and autosave timers to `now`.
    pub fn tick(&mut self, now: Instant) -> TickReport {
        let mut report = TickReport::default();

        if self.preview_deadline.is_some_and(|deadline| now >= deadline) {
            self.sync_preview();
            report.preview_synced = true;
        }

        if now >= self.next_autosave {
            self.next_autosave = now + self.config.autosave_interval();
            let outcome = self.autosave();
            if let Err(err) = &outcome {
                warn!("event=autosave module=service status=error error={}", err);
            }
            report.autosave = Some(outcome);
        }
        report
    }

    /// Converts LaTeX source and opens the result.
    ///
    /// Inside a project the markdown is stored as `main_imported.md`;
    /// otherwise it becomes an unsaved document.
    pub fn import_latex(&mut self, source: &str, prompt: &mut dyn SavePrompt) -> ControllerResult<OpenOutcome> {
        let markdown = latex_to_markdown(source);
        self.leave_document(prompt);

        if self.project.is_none() {
            self.reset_document();
            let mut document = Document::untitled();
            document.content = markdown;
            self.preview_content = document.content.clone();
            self.document = Some(document);
            self.state = DocumentState::Dirty;
            info!("event=latex_import module=service status=ok target=untitled");
            return Ok(OpenOutcome::Opened(String::new()));
        }

        self.storage
            .write_document(IMPORTED_FILE_NAME, markdown.as_bytes())?;
        info!(
            "event=latex_import module=service status=ok target={}",
            IMPORTED_FILE_NAME
        );
        self.load_document(IMPORTED_FILE_NAME)
    }

    /// Renders the preview buffer, or `None` when no markdown is open.
    pub fn render(&mut self, today: &str) -> Option<RenderedDocument> {
        if self.document.as_ref()?.kind != DocumentKind::Markdown {
            return None;
        }
        self.refresh_bibliography();

        let document = self.document.as_ref()?;
        let empty = Bibliography::new();
        let bibliography = self
            .bibliography
            .as_ref()
            .map_or(&empty, |(_, bibliography)| bibliography);
        let rendered = render_document(&RenderInput {
            body: &self.preview_content,
            metadata: &document.metadata,
            project: self.project.as_ref(),
            persona: self.persona(),
            bibliography,
            view: &self.view,
            today,
        });
        self.images.retain_referenced(&rendered);
        Some(rendered)
    }

    pub fn resolve_image<'a>(&'a mut self, image: &'a ImageRef) -> ResolvedImage<'a> {
        let figures_folder = self.project.as_ref().map(ProjectMetadata::figures_folder);
        self.images.resolve(&self.storage, image, figures_folder)
    }

    /// Applies a patch handed back by the rendered view.
    ///
    /// Checkbox lines refer to the preview buffer. When the editor buffer
    /// has diverged the patch is moved onto the matching editor line, and
    /// nothing changes unless exactly one line matches. Returns `true` when
    /// the document changed.
    pub fn apply_patch(&mut self, patch: &Patch) -> ControllerResult<bool> {
        self.editable_document()?;
        let Some(document) = self.document.as_mut() else {
            return Err(ControllerError::NoDocument);
        };
        let changed = match patch {
            Patch::ToggleCheckbox { line, .. } => {
                let patched_content =
                    rebase_checkbox(patch, &self.preview_content, &document.content)
                        .and_then(|target| apply_to_body(&target, &document.content));
                match patched_content {
                    Some(content) => {
                        document.content = content;
                        if let Some(preview) = apply_to_body(patch, &self.preview_content) {
                            self.preview_content = preview;
                        }
                        true
                    }
                    None => {
                        debug!(
                            "event=write_back module=service status=miss path={} preview_line={}",
                            document.path.as_deref().unwrap_or("<untitled>"),
                            line
                        );
                        false
                    }
                }
            }
            Patch::ToggleObjective { .. } => apply_to_metadata(patch, &mut document.metadata),
        };
        if changed {
            self.state = DocumentState::Dirty;
        }
        Ok(changed)
    }

    fn live_preview(&self) -> bool {
        self.project.as_ref().is_some_and(|meta| meta.live_preview)
    }

    fn sync_preview(&mut self) {
        self.preview_content = self.content().to_string();
        self.preview_deadline = None;
    }

    fn editable_document(&mut self) -> ControllerResult<&mut Document> {
        let document = self.document.as_mut().ok_or(ControllerError::NoDocument)?;
        if !document.kind.is_editable() {
            return Err(ControllerError::NotEditable(
                document.display_name().to_string(),
            ));
        }
        Ok(document)
    }

    fn reset_document(&mut self) {
        self.document = None;
        self.state = DocumentState::NoDocument;
        self.preview_content.clear();
        self.preview_deadline = None;
        self.view = ViewState::default();
        self.images.clear();
    }

    // Save-if-dirty before a switch. Never blocks the switch.
    fn leave_document(&mut self, prompt: &mut dyn SavePrompt) {
        if !self.is_dirty() {
            return;
        }
        match self.save(prompt) {
            Ok(SaveOutcome::Saved(_)) => {}
            Ok(_) => info!("event=navigation_save module=service status=skip reason=not_saved"),
            Err(err) => warn!(
                "event=navigation_save module=service status=error error={}",
                err
            ),
        }
    }

    fn load_document(&mut self, path: &str) -> ControllerResult<OpenOutcome> {
        let kind = DocumentKind::from_path(path)
            .ok_or_else(|| ControllerError::UnsupportedFile(path.to_string()))?;
        let bytes = match self.storage.read_document(path) {
            Ok(bytes) => bytes,
            Err(StorageError::Cancelled) => return Ok(OpenOutcome::Cancelled),
            Err(err) => {
                warn!(
                    "event=document_open module=service status=error path={} error={}",
                    path, err
                );
                return Err(err.into());
            }
        };

        let document = Document::decode(Some(path.to_string()), kind, &bytes);
        self.reset_document();
        self.preview_content = document.content.clone();
        info!(
            "event=document_open module=service status=ok path={} kind={:?} bytes={} metadata_keys={}",
            path,
            kind,
            bytes.len(),
            document.metadata.len()
        );
        self.document = Some(document);
        self.state = DocumentState::Clean;
        Ok(OpenOutcome::Opened(path.to_string()))
    }

    fn write_to(&mut self, target: &str) -> ControllerResult<SaveOutcome> {
        let target = normalize_path(target)?;
        let Some(document) = self.document.as_mut() else {
            return Ok(SaveOutcome::Skipped);
        };
        if document.path.as_deref() != Some(target.as_str()) {
            document.kind = DocumentKind::from_path(&target).unwrap_or(DocumentKind::Markdown);
        }
        let encoded = document.encode();
        if let Err(err) = self.storage.write_document(&target, encoded.as_bytes()) {
            warn!(
                "event=document_save module=service status=error path={} error={}",
                target, err
            );
            return Err(err.into());
        }
        document.path = Some(target.clone());

        if let Some(meta) = &self.project {
            if let Err(err) = project_service::save_project_metadata(&mut self.storage, meta) {
                warn!(
                    "event=project_metadata_save module=service status=error error={}",
                    err
                );
            }
        }

        self.state = DocumentState::Clean;
        self.sync_preview();
        info!(
            "event=document_save module=service status=ok path={} bytes={}",
            target,
            encoded.len()
        );
        Ok(SaveOutcome::Saved(target))
    }

    fn refresh_bibliography(&mut self) {
        let Some(project) = &self.project else {
            self.bibliography = None;
            return;
        };
        let path = project.bib_file_or(&self.config.default_bib_file).to_string();
        let source = match self.storage.read_document(&path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(StorageError::NotFound(_)) => String::new(),
            Err(err) => {
                warn!(
                    "event=bibliography_load module=service status=error path={} error={}",
                    path, err
                );
                String::new()
            }
        };

        let unchanged = self
            .bibliography
            .as_ref()
            .is_some_and(|(cached, _)| *cached == source);
        if !unchanged {
            let bibliography = parse_bibliography(&source);
            self.bibliography = Some((source, bibliography));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ControllerError, DocumentController, DocumentState, NoPrompt, OpenOutcome, SaveOutcome,
        SavePrompt,
    };
    use crate::config::{CoreConfig, UserSettings};
    use crate::model::persona::Persona;
    use crate::model::project::PROJECT_METADATA_FILE;
    use crate::render::patch::Patch;
    use crate::service::images::ResolvedImage;
    use crate::storage::{MemoryStorage, Storage, StorageError};
    use std::time::{Duration, Instant};

    struct FixedPrompt(&'static str);

    impl SavePrompt for FixedPrompt {
        fn choose_save_path(&mut self, _suggested_name: &str) -> Result<String, StorageError> {
            Ok(self.0.to_string())
        }
    }

    fn controller(documents: &[(&str, &str)], now: Instant) -> DocumentController<MemoryStorage> {
        let storage = MemoryStorage::with_documents(documents.iter().copied()).unwrap();
        let mut controller = DocumentController::new(
            MemoryStorage::new(),
            CoreConfig::default(),
            UserSettings::default(),
            now,
        );
        controller
            .open_project(storage, "Test", &mut NoPrompt)
            .unwrap();
        controller
    }

    fn read(controller: &DocumentController<MemoryStorage>, path: &str) -> String {
        String::from_utf8(controller.storage().read_document(path).unwrap()).unwrap()
    }

    #[test]
    fn opening_a_project_loads_the_default_document_clean() {
        let now = Instant::now();
        let controller = controller(
            &[("main.md", "---\ntitle: Report\n---\n\nBody text")],
            now,
        );
        assert_eq!(controller.current_path(), Some("main.md"));
        assert_eq!(controller.state(), DocumentState::Clean);
        assert_eq!(controller.content(), "Body text");
        assert_eq!(controller.preview_content(), "Body text");
        assert_eq!(controller.persona(), Persona::Researcher);
    }

    #[test]
    fn preview_waits_for_save_without_live_preview() {
        let now = Instant::now();
        let mut controller = controller(&[("main.md", "old")], now);
        controller.set_content("new", now).unwrap();
        assert!(controller.is_dirty());

        let report = controller.tick(now + Duration::from_secs(5));
        assert!(!report.preview_synced);
        assert_eq!(controller.preview_content(), "old");

        assert_eq!(
            controller.save(&mut NoPrompt).unwrap(),
            SaveOutcome::Saved("main.md".to_string())
        );
        assert_eq!(controller.preview_content(), "new");
        assert_eq!(read(&controller, "main.md"), "new");
        assert!(controller.storage().exists(PROJECT_METADATA_FILE));
    }

    #[test]
    fn live_preview_debounces_edits() {
        let now = Instant::now();
        let mut controller = controller(&[("main.md", "a")], now);
        let mut meta = controller.project().unwrap().clone();
        meta.live_preview = true;
        controller.set_project_metadata(meta).unwrap();

        controller.set_content("ab", now).unwrap();
        controller
            .set_content("abc", now + Duration::from_millis(300))
            .unwrap();
        assert!(!controller.tick(now + Duration::from_millis(600)).preview_synced);
        assert_eq!(controller.preview_content(), "a");
        assert!(controller.tick(now + Duration::from_millis(800)).preview_synced);
        assert_eq!(controller.preview_content(), "abc");
    }

    #[test]
    fn enabling_live_preview_syncs_immediately() {
        let now = Instant::now();
        let mut controller = controller(&[("main.md", "a")], now);
        controller.set_content("edited", now).unwrap();
        let mut meta = controller.project().unwrap().clone();
        meta.live_preview = true;
        controller.set_project_metadata(meta).unwrap();
        assert_eq!(controller.preview_content(), "edited");
    }

    #[test]
    fn autosave_is_silent_and_periodic() {
        let now = Instant::now();
        let mut controller = controller(&[("main.md", "a")], now);
        controller.set_content("b", now).unwrap();
        assert!(controller.tick(now + Duration::from_secs(30)).autosave.is_none());

        let report = controller.tick(now + Duration::from_secs(60));
        assert!(matches!(report.autosave, Some(Ok(SaveOutcome::Saved(_)))));
        assert_eq!(controller.state(), DocumentState::Clean);
        assert_eq!(read(&controller, "main.md"), "b");
    }

    #[test]
    fn autosave_never_prompts_for_untitled_documents() {
        let now = Instant::now();
        let mut controller = DocumentController::new(
            MemoryStorage::new(),
            CoreConfig::default(),
            UserSettings::default(),
            now,
        );
        controller.new_untitled(&mut NoPrompt);
        controller.set_content("draft", now).unwrap();
        assert_eq!(controller.autosave().unwrap(), SaveOutcome::Skipped);
        assert!(controller.is_dirty());

        assert_eq!(
            controller.save(&mut FixedPrompt("draft.md")).unwrap(),
            SaveOutcome::Saved("draft.md".to_string())
        );
        assert_eq!(read(&controller, "draft.md"), "draft");
    }

    #[test]
    fn cancelled_save_does_not_block_navigation() {
        let now = Instant::now();
        let mut controller = DocumentController::new(
            MemoryStorage::with_documents([("other.md", "other")]).unwrap(),
            CoreConfig::default(),
            UserSettings::default(),
            now,
        );
        controller.new_untitled(&mut NoPrompt);
        controller.set_content("unsaved", now).unwrap();
        assert_eq!(controller.save(&mut NoPrompt).unwrap(), SaveOutcome::Cancelled);

        let outcome = controller.open_document("other.md", &mut NoPrompt).unwrap();
        assert_eq!(outcome, OpenOutcome::Opened("other.md".to_string()));
        assert_eq!(controller.content(), "other");
        assert_eq!(controller.state(), DocumentState::Clean);
    }

    #[test]
    fn switching_documents_saves_dirty_changes() {
        let now = Instant::now();
        let mut controller = controller(&[("main.md", "a"), ("notes.md", "n")], now);
        controller.set_content("a2", now).unwrap();
        controller.open_document("notes.md", &mut NoPrompt).unwrap();
        assert_eq!(read(&controller, "main.md"), "a2");
        assert_eq!(controller.current_path(), Some("notes.md"));
    }

    #[test]
    fn failed_save_is_reported_with_a_message() {
        let now = Instant::now();
        let mut storage = MemoryStorage::with_documents([("main.md", "a")]).unwrap();
        storage.set_read_only(true);
        let mut controller = DocumentController::new(
            MemoryStorage::new(),
            CoreConfig::default(),
            UserSettings::default(),
            now,
        );
        controller.open_project(storage, "RO", &mut NoPrompt).unwrap();
        controller.set_content("b", now).unwrap();

        let err = controller.save(&mut NoPrompt).unwrap_err();
        assert!(matches!(err, ControllerError::Storage(StorageError::PermissionDenied(_))));
        assert!(err.user_message().is_some());
        assert!(controller.is_dirty());
        assert_eq!(ControllerError::Storage(StorageError::Cancelled).user_message(), None);
    }

    #[test]
    fn checkbox_patch_updates_content_and_preview() {
        let now = Instant::now();
        let mut controller = controller(&[("main.md", "# Tasks\n- [ ] one\n- [ ] two")], now);
        let rendered = controller.render("2026-03-01").unwrap();
        let patch = rendered.checkboxes()[1].patch.unwrap();
        assert_eq!(
            patch,
            Patch::ToggleCheckbox {
                line: 2,
                checked: false
            }
        );

        assert!(controller.apply_patch(&patch).unwrap());
        assert_eq!(controller.content(), "# Tasks\n- [ ] one\n- [x] two");
        assert_eq!(controller.preview_content(), controller.content());
        assert!(controller.is_dirty());
        assert!(!controller.apply_patch(&patch).unwrap());
    }

    #[test]
    fn checkbox_patch_targets_the_clicked_task_after_unsaved_edits() {
        let now = Instant::now();
        let mut controller = controller(&[("main.md", "# T\n- [ ] alpha\n- [ ] beta")], now);
        controller
            .set_content("# T\n- [ ] new\n- [ ] alpha\n- [ ] beta", now)
            .unwrap();
        let rendered = controller.render("2026-03-01").unwrap();
        let beta = rendered.checkboxes()[1].patch.unwrap();

        assert!(controller.apply_patch(&beta).unwrap());
        assert_eq!(controller.content(), "# T\n- [ ] new\n- [ ] alpha\n- [x] beta");
        assert_eq!(controller.preview_content(), "# T\n- [ ] alpha\n- [x] beta");
    }

    #[test]
    fn checkbox_patch_without_a_unique_target_changes_nothing() {
        let now = Instant::now();
        let mut controller = controller(&[("main.md", "# T\n- [ ] alpha\n- [ ] beta")], now);
        controller
            .set_content("# T\n- [ ] alpha\n- [ ] beta renamed", now)
            .unwrap();
        let rendered = controller.render("2026-03-01").unwrap();
        let beta = rendered.checkboxes()[1].patch.unwrap();

        assert!(!controller.apply_patch(&beta).unwrap());
        assert_eq!(controller.content(), "# T\n- [ ] alpha\n- [ ] beta renamed");
        assert_eq!(controller.preview_content(), "# T\n- [ ] alpha\n- [ ] beta");
    }

    #[test]
    fn render_uses_project_bibliography() {
        let now = Instant::now();
        let controller_docs = [
            ("main.md", "---\nshowReferences: true\n---\n\nSee [@a]."),
            ("references.bib", "@article{a, author = {Xu, Li}, year = {2001}, title = {T}}"),
        ];
        let mut controller = controller(&controller_docs, now);
        let rendered = controller.render("2026-03-01").unwrap();
        assert!(rendered.cited_keys.contains("a"));
        assert_eq!(rendered.references.map(|refs| refs.len()), Some(1));
    }

    #[test]
    fn create_project_and_file_use_persona_templates() {
        let now = Instant::now();
        let mut controller = DocumentController::new(
            MemoryStorage::new(),
            CoreConfig::default(),
            UserSettings::default(),
            now,
        );
        let outcome = controller
            .create_project(
                MemoryStorage::new(),
                "Bridge",
                Persona::Engineer,
                true,
                "2026-03-01",
                &mut NoPrompt,
            )
            .unwrap();
        assert_eq!(outcome, OpenOutcome::Opened("report.md".to_string()));
        assert_eq!(controller.metadata().unwrap().text("title").as_deref(), Some("Bridge"));

        let path = controller.create_file("figures", "calc.md", "2026-03-01").unwrap();
        assert_eq!(path, "figures/calc.md");
        assert!(read(&controller, &path).contains("showToC: true"));
        assert!(matches!(
            controller.create_file("figures", "calc.md", "2026-03-01"),
            Err(ControllerError::Storage(StorageError::AlreadyExists(_)))
        ));
    }

    #[test]
    fn latex_import_opens_imported_file() {
        let now = Instant::now();
        let mut controller = controller(&[("main.md", "a")], now);
        let outcome = controller
            .import_latex("\\section{Intro}\nHello \\textbf{world}", &mut NoPrompt)
            .unwrap();
        assert_eq!(outcome, OpenOutcome::Opened("main_imported.md".to_string()));
        assert!(controller.content().contains("# Intro"));
        assert_eq!(controller.state(), DocumentState::Clean);
    }

    #[test]
    fn images_resolve_from_the_project_figures_folder() {
        let now = Instant::now();
        let mut controller = controller(
            &[("main.md", "![Plot](plot.png)"), ("art/plot.png", "png")],
            now,
        );
        let rendered = controller.render("2026-03-01").unwrap();
        let plot = rendered.images()[0].clone();
        assert_eq!(controller.resolve_image(&plot), ResolvedImage::Unavailable);

        let mut meta = controller.project().unwrap().clone();
        meta.figures_folder = Some("art".to_string());
        controller.set_project_metadata(meta).unwrap();
        match controller.resolve_image(&plot) {
            ResolvedImage::Resource(resource) => assert_eq!(resource.bytes, b"png"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn images_are_view_only() {
        let now = Instant::now();
        let mut controller = controller(&[("figures/a.png", "png")], now);
        controller.open_document("figures/a.png", &mut NoPrompt).unwrap();
        assert!(matches!(
            controller.set_content("x", now),
            Err(ControllerError::NotEditable(_))
        ));
        assert!(controller.render("2026-03-01").is_none());
    }
}
