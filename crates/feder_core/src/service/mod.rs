//! Editing use cases over a project storage.
//!
//! # Responsibility
//! - Drive the edit/preview/save cycle of one document (`document_controller`).
//! - Create and open projects from persona templates (`project_service`).
//! - Resolve project images for the preview (`images`).
//! - Keep UI layers decoupled from storage details.

pub mod document_controller;
pub mod images;
pub mod project_service;
pub mod templates;
