//! Line-oriented markdown transforms.
//!
//! # Responsibility
//! - Split raw file text into frontmatter and body, and join it back.
//! - Split a body into level-1 sections with line offsets.
//! - Patch checkbox lines in place.
//!
//! # Invariants
//! - All transforms are pure and never fail; bad input degrades to
//!   "treat as plain body".
//! - Structural splitting is line/regex based, not a full markdown AST.

pub mod frontmatter;
pub mod latex;
pub mod sections;
pub mod tasks;
