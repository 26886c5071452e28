use crate::storage::{path_components, ChildEntry, Storage, StorageError, StorageResult};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Document(Vec<u8>),
    Container,
}

/// Sandboxed in-memory tree with the same contract as `FsStorage`.
///
/// Keys are normalized `a/b/c` paths; the root container is implicit.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    nodes: BTreeMap<String, Node>,
    read_only: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds documents, creating parent containers as needed.
    pub fn with_documents<'a>(documents: impl IntoIterator<Item = (&'a str, &'a str)>) -> StorageResult<Self> {
        let mut storage = Self::new();
        for (path, content) in documents {
            storage.write_document(path, content.as_bytes())?;
        }
        Ok(storage)
    }

    /// When set, every mutation fails with `PermissionDenied`.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    fn key(path: &str) -> StorageResult<String> {
        Ok(path_components(path)?.join("/"))
    }

    fn writable(&self, path: &str) -> StorageResult<()> {
        if self.read_only {
            return Err(StorageError::PermissionDenied(path.to_string()));
        }
        Ok(())
    }

    fn is_container(&self, key: &str) -> bool {
        key.is_empty() || matches!(self.nodes.get(key), Some(Node::Container))
    }

    fn ensure_containers(&mut self, key: &str) -> StorageResult<()> {
        let mut prefix = String::new();
        for component in key.split('/').filter(|component| !component.is_empty()) {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(component);
            match self.nodes.get(&prefix) {
                Some(Node::Document(_)) => return Err(StorageError::AlreadyExists(prefix)),
                Some(Node::Container) => {}
                None => {
                    self.nodes.insert(prefix.clone(), Node::Container);
                }
            }
        }
        Ok(())
    }

    fn descendant_keys(&self, key: &str) -> Vec<String> {
        let prefix = format!("{key}/");
        self.nodes
            .range(prefix.clone()..)
            .take_while(|(candidate, _)| candidate.starts_with(&prefix))
            .map(|(candidate, _)| candidate.clone())
            .collect()
    }
}

impl Storage for MemoryStorage {
    fn read_document(&self, path: &str) -> StorageResult<Vec<u8>> {
        let key = Self::key(path)?;
        match self.nodes.get(&key) {
            Some(Node::Document(bytes)) => Ok(bytes.clone()),
            Some(Node::Container) => Err(StorageError::InvalidPath(path.to_string())),
            None if key.is_empty() => Err(StorageError::InvalidPath(path.to_string())),
            None => Err(StorageError::NotFound(path.to_string())),
        }
    }

    fn write_document(&mut self, path: &str, bytes: &[u8]) -> StorageResult<()> {
        self.writable(path)?;
        let key = Self::key(path)?;
        if self.is_container(&key) {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        if let Some((parent, _)) = key.rsplit_once('/') {
            self.ensure_containers(parent)?;
        }
        self.nodes.insert(key, Node::Document(bytes.to_vec()));
        Ok(())
    }

    fn list_children(&self, path: &str) -> StorageResult<Vec<ChildEntry>> {
        let key = Self::key(path)?;
        if !self.is_container(&key) {
            return match self.nodes.get(&key) {
                Some(_) => Err(StorageError::InvalidPath(path.to_string())),
                None => Err(StorageError::NotFound(path.to_string())),
            };
        }

        let prefix = if key.is_empty() {
            String::new()
        } else {
            format!("{key}/")
        };
        let children = self
            .nodes
            .iter()
            .filter_map(|(candidate, node)| {
                let rest = candidate.strip_prefix(&prefix)?;
                (!rest.is_empty() && !rest.contains('/')).then(|| ChildEntry {
                    name: rest.to_string(),
                    is_container: matches!(node, Node::Container),
                })
            })
            .collect();
        Ok(children)
    }

    fn create_container(&mut self, path: &str) -> StorageResult<()> {
        self.writable(path)?;
        let key = Self::key(path)?;
        self.ensure_containers(&key)
    }

    fn remove_path(&mut self, path: &str, recursive: bool) -> StorageResult<()> {
        self.writable(path)?;
        let key = Self::key(path)?;
        if key.is_empty() {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        if !self.nodes.contains_key(&key) {
            return Err(StorageError::NotFound(path.to_string()));
        }

        let descendants = self.descendant_keys(&key);
        if !descendants.is_empty() && !recursive {
            return Err(StorageError::NotEmpty(path.to_string()));
        }
        for descendant in descendants {
            self.nodes.remove(&descendant);
        }
        self.nodes.remove(&key);
        Ok(())
    }

    fn rename_path(&mut self, old_path: &str, new_path: &str) -> StorageResult<()> {
        self.writable(old_path)?;
        let old_key = Self::key(old_path)?;
        let new_key = Self::key(new_path)?;
        if old_key.is_empty() || new_key.is_empty() || new_key.starts_with(&format!("{old_key}/")) {
            return Err(StorageError::InvalidPath(new_path.to_string()));
        }
        if !self.nodes.contains_key(&old_key) {
            return Err(StorageError::NotFound(old_path.to_string()));
        }
        if self.nodes.contains_key(&new_key) {
            return Err(StorageError::AlreadyExists(new_path.to_string()));
        }
        if let Some((parent, _)) = new_key.rsplit_once('/') {
            self.ensure_containers(parent)?;
        }

        let mut moved = self.descendant_keys(&old_key);
        moved.push(old_key.clone());
        for key in moved {
            if let Some(node) = self.nodes.remove(&key) {
                let renamed = format!("{new_key}{}", &key[old_key.len()..]);
                self.nodes.insert(renamed, node);
            }
        }
        Ok(())
    }
}
