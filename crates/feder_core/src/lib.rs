//! Core domain logic for Feder.
//! Parsing, rendering and the editing session live here; front ends only
//! supply storage and draw the render tree.

pub mod citation;
pub mod config;
pub mod logging;
pub mod markdown;
pub mod model;
pub mod render;
pub mod service;
pub mod storage;

pub use citation::bibtex::{parse_bibliography, Bibliography, BibliographyEntry};
pub use citation::cite::{
    format_citation, reference_list, resolve_citations, CitationStyle, ResolvedCitations,
};
pub use config::{load_core_config, load_user_settings, CoreConfig, UserSettings};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use markdown::sections::{join_sections, split_sections, Section};
pub use model::document::{Document, DocumentKind};
pub use model::metadata::Metadata;
pub use model::persona::{Persona, PersonaMetadata};
pub use model::project::ProjectMetadata;
pub use render::patch::Patch;
pub use render::tree::RenderedDocument;
pub use render::{render_document, RenderInput, ViewState};
pub use service::document_controller::{
    ControllerError, ControllerResult, DocumentController, DocumentState, NoPrompt, OpenOutcome,
    SaveOutcome, SavePrompt,
};
pub use storage::{FsStorage, MemoryStorage, Storage, StorageError, StorageResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
