use crate::generic::{DirEntry, EntryKind, StorageError, StorageTrait};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Clone, Copy, Debug, Default)]
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        Self
    }
}

impl StorageTrait for LocalFs {
    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>, StorageError> {
        let entries = fs::read_dir(path).map_err(|err| StorageError::io(path, err))?;
        entries
            .map(|entry| {
                let entry = entry.map_err(|err| StorageError::io(path, err))?;
                let file_type = entry
                    .file_type()
                    .map_err(|err| StorageError::io(entry.path(), err))?;
                let name = entry
                    .file_name()
                    .into_string()
                    .map_err(|_| StorageError::NonUtf8Name(PathBuf::from(path)))?;
                let kind = if file_type.is_dir() {
                    EntryKind::Dir
                } else {
                    EntryKind::File
                };
                Ok(DirEntry { name, kind })
            })
            .collect()
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        fs::read(path).map_err(|err| StorageError::io(path, err))
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
        tracing::trace!(path = %path.display(), len = bytes.len(), "writing file");
        fs::write(path, bytes).map_err(|err| StorageError::io(path, err))
    }

    fn exists(&self, path: &Path) -> bool {
        fs::metadata(path).is_ok()
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), StorageError> {
        fs::create_dir_all(path).map_err(|err| StorageError::io(path, err))
    }
}
