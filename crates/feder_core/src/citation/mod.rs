//! Bibliography parsing and inline citation resolution.
//!
//! # Responsibility
//! - Parse the `@type{key, field = {value}}` bibliography format.
//! - Rewrite `[@key]` / `[text@key]` markers into display text for the view.
//!
//! # Invariants
//! - One malformed record never aborts parsing of the rest.
//! - Resolution only produces view text; the body keeps its markers.
//! - Unknown keys stay visible in the output.

pub mod bibtex;
pub mod cite;
