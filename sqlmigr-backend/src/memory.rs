use crate::generic::{DirEntry, EntryKind, StorageError, StorageTrait};
use parking_lot::RwLock;
use std::{
    collections::BTreeMap,
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

#[derive(Clone, Debug)]
enum Node {
    File(Vec<u8>),
    Dir,
}

/// In-memory directory tree. Clones share the same tree.
#[derive(Clone, Debug, Default)]
pub struct MemoryFs {
    nodes: Arc<RwLock<BTreeMap<PathBuf, Node>>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the parent directories of `path` and writes `bytes` to it.
    pub fn with_file(self, path: impl AsRef<Path>, bytes: impl Into<Vec<u8>>) -> Self {
        let path = path.as_ref();
        {
            let mut nodes = self.nodes.write();
            if let Some(parent) = path.parent() {
                insert_dirs(&mut nodes, parent);
            }
            nodes.insert(path.to_path_buf(), Node::File(bytes.into()));
        }
        self
    }

    pub fn with_dir(self, path: impl AsRef<Path>) -> Self {
        insert_dirs(&mut self.nodes.write(), path.as_ref());
        self
    }
}

fn insert_dirs(nodes: &mut BTreeMap<PathBuf, Node>, path: &Path) {
    path.ancestors()
        .filter(|dir| !dir.as_os_str().is_empty())
        .for_each(|dir| {
            nodes.entry(dir.to_path_buf()).or_insert(Node::Dir);
        });
}

fn is_dir(nodes: &BTreeMap<PathBuf, Node>, path: &Path) -> bool {
    path.as_os_str().is_empty() || matches!(nodes.get(path), Some(Node::Dir))
}

impl StorageTrait for MemoryFs {
    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>, StorageError> {
        let nodes = self.nodes.read();
        match nodes.get(path) {
            Some(Node::Dir) => {}
            Some(Node::File(_)) => return Err(StorageError::NotADirectory(path.to_path_buf())),
            None => return Err(StorageError::NotFound(path.to_path_buf())),
        }
        nodes
            .iter()
            .filter(|(child, _)| child.parent() == Some(path))
            .map(|(child, node)| {
                let name = child
                    .file_name()
                    .and_then(|name| name.to_str())
                    .ok_or_else(|| StorageError::NonUtf8Name(path.to_path_buf()))?
                    .to_owned();
                let kind = match node {
                    Node::File(_) => EntryKind::File,
                    Node::Dir => EntryKind::Dir,
                };
                Ok(DirEntry { name, kind })
            })
            .collect()
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        match self.nodes.read().get(path) {
            Some(Node::File(bytes)) => Ok(bytes.clone()),
            Some(Node::Dir) => Err(StorageError::io(
                path,
                io::Error::other("is a directory"),
            )),
            None => Err(StorageError::NotFound(path.to_path_buf())),
        }
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
        let mut nodes = self.nodes.write();
        let parent = path.parent().unwrap_or(Path::new(""));
        if !is_dir(&nodes, parent) {
            return Err(StorageError::NotFound(parent.to_path_buf()));
        }
        if let Some(Node::Dir) = nodes.get(path) {
            return Err(StorageError::io(path, io::Error::other("is a directory")));
        }
        nodes.insert(path.to_path_buf(), Node::File(bytes.to_vec()));
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.nodes.read().contains_key(path)
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), StorageError> {
        let mut nodes = self.nodes.write();
        if let Some(file) = path
            .ancestors()
            .find(|dir| matches!(nodes.get(*dir), Some(Node::File(_))))
        {
            return Err(StorageError::NotADirectory(file.to_path_buf()));
        }
        insert_dirs(&mut nodes, path);
        Ok(())
    }
}
