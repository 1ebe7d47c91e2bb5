use std::{
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{} not found", .0.display())]
    NotFound(PathBuf),
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("entry in {} has a non UTF-8 name", .0.display())]
    NonUtf8Name(PathBuf),
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path),
            _ => Self::Io { path, source },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Dir,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// The filesystem operations the migrator consumes.
///
/// Every call is blocking and whole-file; nothing is streamed and nothing is
/// cached between calls.
pub trait StorageTrait: Send + Sync {
    /// Entries directly under `path`, in no particular order.
    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>, StorageError>;

    fn read(&self, path: &Path) -> Result<Vec<u8>, StorageError>;

    /// Creates or truncates `path`. The parent directory must already exist.
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), StorageError>;

    fn exists(&self, path: &Path) -> bool;

    fn create_dir_all(&self, path: &Path) -> Result<(), StorageError>;

    fn join(&self, base: &Path, name: &str) -> PathBuf {
        base.join(name)
    }
}

impl<S: StorageTrait + ?Sized> StorageTrait for &S {
    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>, StorageError> {
        (**self).read_dir(path)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        (**self).read(path)
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
        (**self).write(path, bytes)
    }

    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), StorageError> {
        (**self).create_dir_all(path)
    }

    fn join(&self, base: &Path, name: &str) -> PathBuf {
        (**self).join(base, name)
    }
}
