//! Storage port for project files.
//!
//! # Responsibility
//! - Define the contract the core uses to read and write named byte streams
//!   in a hierarchical project directory.
//! - Provide the native directory adapter and an in-memory adapter.
//!
//! # Invariants
//! - Paths are relative, `/`-separated and never escape the project root.
//! - `Cancelled` means the user backed out; callers must not report it.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod fs;
mod memory;

pub use fs::FsStorage;
pub use memory::MemoryStorage;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug)]
pub enum StorageError {
    NotFound(String),
    PermissionDenied(String),
    /// The user dismissed a picker or permission prompt.
    Cancelled,
    /// Absolute, escaping or otherwise unusable path.
    InvalidPath(String),
    AlreadyExists(String),
    /// Non-recursive removal of a container that still has children.
    NotEmpty(String),
    Io {
        path: String,
        source: std::io::Error,
    },
}

impl StorageError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub(crate) fn from_io(path: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_string()),
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists(path.to_string()),
            _ => Self::Io {
                path: path.to_string(),
                source: err,
            },
        }
    }
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "not found: `{path}`"),
            Self::PermissionDenied(path) => write!(f, "permission denied: `{path}`"),
            Self::Cancelled => write!(f, "operation cancelled"),
            Self::InvalidPath(path) => write!(f, "invalid path: `{path}`"),
            Self::AlreadyExists(path) => write!(f, "already exists: `{path}`"),
            Self::NotEmpty(path) => write!(f, "container is not empty: `{path}`"),
            Self::Io { path, source } => write!(f, "io error at `{path}`: {source}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// One entry of a container listing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ChildEntry {
    pub name: String,
    pub is_container: bool,
}

/// Hierarchical directory of named byte streams.
///
/// `""` addresses the root container.
pub trait Storage {
    /// Reads the whole document at `path`.
    fn read_document(&self, path: &str) -> StorageResult<Vec<u8>>;
    /// Replaces the document at `path`, creating missing parent containers.
    fn write_document(&mut self, path: &str, bytes: &[u8]) -> StorageResult<()>;
    /// Lists direct children sorted by name.
    fn list_children(&self, path: &str) -> StorageResult<Vec<ChildEntry>>;
    /// Creates `path` and any missing parents. Existing containers are fine.
    fn create_container(&mut self, path: &str) -> StorageResult<()>;
    fn remove_path(&mut self, path: &str, recursive: bool) -> StorageResult<()>;
    /// Moves a document or container. The target must not exist.
    fn rename_path(&mut self, old_path: &str, new_path: &str) -> StorageResult<()>;

    fn exists(&self, path: &str) -> bool {
        self.read_document(path).is_ok() || self.list_children(path).is_ok()
    }
}

/// Splits `path` into validated components.
///
/// Backslashes count as separators; empty and `.` components are dropped.
pub fn path_components(path: &str) -> StorageResult<Vec<String>> {
    let normalized = path.replace('\\', "/");
    let looks_absolute = normalized.starts_with('/')
        || normalized
            .split('/')
            .next()
            .is_some_and(|first| first.len() == 2 && first.ends_with(':'));
    if looks_absolute {
        return Err(StorageError::InvalidPath(path.to_string()));
    }

    let mut components = Vec::new();
    for component in normalized.split('/') {
        match component {
            "" | "." => {}
            ".." => return Err(StorageError::InvalidPath(path.to_string())),
            name => components.push(name.to_string()),
        }
    }
    Ok(components)
}

/// Canonical `a/b/c` form of `path`.
pub fn normalize_path(path: &str) -> StorageResult<String> {
    Ok(path_components(path)?.join("/"))
}

/// Joins a container path and a child name.
pub fn join_path(parent: &str, name: &str) -> String {
    let parent = parent.trim_end_matches('/');
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

/// Parent container of `path` (`""` for top-level entries).
pub fn parent_path(path: &str) -> &str {
    path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}

/// Last component of `path`.
pub fn file_name(path: &str) -> &str {
    path.rsplit_once('/').map(|(_, name)| name).unwrap_or(path)
}
