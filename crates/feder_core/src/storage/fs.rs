use crate::storage::{path_components, ChildEntry, Storage, StorageError, StorageResult};
use log::debug;
use std::path::{Path, PathBuf};

/// Native directory adapter rooted at a project folder.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    /// Opens an existing directory as the storage root.
    pub fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(StorageError::NotFound(root.display().to_string()));
        }
        debug!(
            "event=storage_open module=storage status=ok backend=fs root={}",
            root.display()
        );
        Ok(Self { root })
    }

    /// Creates the directory if needed, then opens it.
    pub fn create(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .map_err(|err| StorageError::from_io(&root.display().to_string(), err))?;
        Self::open(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> StorageResult<PathBuf> {
        let mut resolved = self.root.clone();
        for component in path_components(path)? {
            resolved.push(component);
        }
        Ok(resolved)
    }
}

impl Storage for FsStorage {
    fn read_document(&self, path: &str) -> StorageResult<Vec<u8>> {
        let target = self.resolve(path)?;
        if target.is_dir() {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        std::fs::read(&target).map_err(|err| StorageError::from_io(path, err))
    }

    fn write_document(&mut self, path: &str, bytes: &[u8]) -> StorageResult<()> {
        if path_components(path)?.is_empty() {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        let target = self.resolve(path)?;
        if target.is_dir() {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|err| StorageError::from_io(path, err))?;
        }
        std::fs::write(&target, bytes).map_err(|err| StorageError::from_io(path, err))
    }

    fn list_children(&self, path: &str) -> StorageResult<Vec<ChildEntry>> {
        let target = self.resolve(path)?;
        if target.is_file() {
            return Err(StorageError::InvalidPath(path.to_string()));
        }

        let mut children = Vec::new();
        for entry in std::fs::read_dir(&target).map_err(|err| StorageError::from_io(path, err))? {
            let entry = entry.map_err(|err| StorageError::from_io(path, err))?;
            let file_type = entry
                .file_type()
                .map_err(|err| StorageError::from_io(path, err))?;
            children.push(ChildEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_container: file_type.is_dir(),
            });
        }
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }

    fn create_container(&mut self, path: &str) -> StorageResult<()> {
        let target = self.resolve(path)?;
        if target.is_file() {
            return Err(StorageError::AlreadyExists(path.to_string()));
        }
        std::fs::create_dir_all(&target).map_err(|err| StorageError::from_io(path, err))
    }

    fn remove_path(&mut self, path: &str, recursive: bool) -> StorageResult<()> {
        if path_components(path)?.is_empty() {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        let target = self.resolve(path)?;
        let metadata =
            std::fs::symlink_metadata(&target).map_err(|err| StorageError::from_io(path, err))?;

        let result = if metadata.is_dir() {
            if recursive {
                std::fs::remove_dir_all(&target)
            } else {
                let mut entries =
                    std::fs::read_dir(&target).map_err(|err| StorageError::from_io(path, err))?;
                if entries.next().is_some() {
                    return Err(StorageError::NotEmpty(path.to_string()));
                }
                std::fs::remove_dir(&target)
            }
        } else {
            std::fs::remove_file(&target)
        };
        result.map_err(|err| StorageError::from_io(path, err))
    }

    fn rename_path(&mut self, old_path: &str, new_path: &str) -> StorageResult<()> {
        if path_components(old_path)?.is_empty() || path_components(new_path)?.is_empty() {
            return Err(StorageError::InvalidPath(old_path.to_string()));
        }
        let source = self.resolve(old_path)?;
        let target = self.resolve(new_path)?;
        if !source.exists() {
            return Err(StorageError::NotFound(old_path.to_string()));
        }
        if target.exists() {
            return Err(StorageError::AlreadyExists(new_path.to_string()));
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|err| StorageError::from_io(new_path, err))?;
        }
        std::fs::rename(&source, &target).map_err(|err| StorageError::from_io(old_path, err))
    }
}

#[cfg(test)]
mod tests {
    use super::FsStorage;
    use crate::storage::{ChildEntry, Storage, StorageError};

    #[test]
    fn write_read_list_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FsStorage::open(dir.path()).unwrap();

        storage.write_document("me/todo.md", b"- [ ] a").unwrap();
        storage.write_document("main.md", b"# Main").unwrap();
        assert_eq!(storage.read_document("me/todo.md").unwrap(), b"- [ ] a");
        assert_eq!(
            storage.list_children("").unwrap(),
            vec![
                ChildEntry {
                    name: "main.md".to_string(),
                    is_container: false
                },
                ChildEntry {
                    name: "me".to_string(),
                    is_container: true
                },
            ]
        );
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::open(dir.path()).unwrap();
        assert!(matches!(
            storage.read_document("nope.md"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn paths_cannot_escape_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FsStorage::open(dir.path()).unwrap();
        assert!(matches!(
            storage.write_document("../escape.md", b"x"),
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn remove_and_rename() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FsStorage::open(dir.path()).unwrap();
        storage.write_document("a/b.md", b"x").unwrap();

        assert!(matches!(
            storage.remove_path("a", false),
            Err(StorageError::NotEmpty(_))
        ));
        storage.rename_path("a/b.md", "c.md").unwrap();
        assert_eq!(storage.read_document("c.md").unwrap(), b"x");
        storage.remove_path("a", false).unwrap();
        assert!(!storage.exists("a"));
    }
}
