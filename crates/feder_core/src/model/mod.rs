//! Document, metadata, persona and project records.
//!
//! # Responsibility
//! - Define the shapes that flow between codec, renderer and controller.
//! - Adapt schema-less frontmatter into typed per-persona records.
//!
//! # Invariants
//! - Unknown frontmatter keys and unknown sidecar keys survive a round trip.
//! - Only `DocumentKind::Markdown` carries frontmatter.

pub mod document;
pub mod metadata;
pub mod persona;
pub mod project;
