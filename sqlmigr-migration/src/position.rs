use std::path::{Path, PathBuf};

use sqlmigr_backend::{StorageError, StorageTrait};

use crate::{codec::MigrationRecord, migrator::MigrationError};

/// The marker file holding the name of the last applied migration.
///
/// The marker is a single pointer, not a history: every write replaces it.
#[derive(Debug)]
pub struct PositionStore<S> {
    storage: S,
    path: PathBuf,
}

impl<S: StorageTrait> PositionStore<S> {
    pub fn new(storage: S, base_dir: &Path, file_name: &str) -> Self {
        let path = storage.join(base_dir, file_name);
        Self { storage, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.storage.exists(&self.path)
    }

    /// Name of the last applied migration.
    pub fn read(&self) -> Result<String, MigrationError> {
        let bytes = self.storage.read(&self.path).map_err(|err| match err {
            StorageError::NotFound(path) => MigrationError::NotFound(path),
            other => other.into(),
        })?;
        let name = String::from_utf8(bytes).map_err(|err| {
            MigrationError::invalid_format(
                String::from_utf8_lossy(err.as_bytes()),
                "position marker is not valid UTF-8",
            )
        })?;
        Ok(name.trim_end_matches(['\r', '\n']).to_owned())
    }

    pub fn read_record(
        &self,
        date_format: &str,
        separator: &str,
    ) -> Result<MigrationRecord, MigrationError> {
        MigrationRecord::parse(&self.read()?, date_format, separator)
    }

    pub fn write(&self, name: &str) -> Result<(), MigrationError> {
        self.storage.write(&self.path, name.as_bytes())?;
        tracing::info!(marker = %self.path.display(), position = name, "position updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_DATE_FORMAT, DEFAULT_POSITION_FILE, DEFAULT_SEPARATOR};
    use sqlmigr_backend::{LocalFs, MemoryFs};
    use tempfile::tempdir;

    #[test]
    fn absent_marker_is_not_found() {
        let fs = MemoryFs::new().with_dir("base");
        let store = PositionStore::new(&fs, Path::new("base"), DEFAULT_POSITION_FILE);
        assert!(!store.exists());
        assert!(matches!(store.read(), Err(MigrationError::NotFound(path)) if path == store.path()));
    }

    #[test]
    fn write_then_read_on_disk() {
        let tmp = tempdir().unwrap();
        let store = PositionStore::new(LocalFs, tmp.path(), DEFAULT_POSITION_FILE);
        for name in ["mig1", "mig2", "mig3"] {
            store.write(name).unwrap();
            assert_eq!(store.read().unwrap(), name);
        }
        assert_eq!(
            std::fs::read(tmp.path().join(DEFAULT_POSITION_FILE)).unwrap(),
            b"mig3"
        );
    }

    #[test]
    fn trailing_newline_is_ignored() {
        let fs = MemoryFs::new().with_file("base/last_mig.pos", "20240101000000_act1.sql\r\n");
        let store = PositionStore::new(&fs, Path::new("base"), DEFAULT_POSITION_FILE);
        assert_eq!(store.read().unwrap(), "20240101000000_act1.sql");
    }

    #[test]
    fn read_record_parses_marker() {
        let fs = MemoryFs::new().with_dir("base");
        let store = PositionStore::new(&fs, Path::new("base"), DEFAULT_POSITION_FILE);
        for (name, label) in [
            ("20240101000000_act1.sql", "act1"),
            ("20241231235959_act2.sql", "act2"),
            ("20200101100059_act3.sql", "act3"),
        ] {
            store.write(name).unwrap();
            let record = store
                .read_record(DEFAULT_DATE_FORMAT, DEFAULT_SEPARATOR)
                .unwrap();
            assert_eq!(record.name(), name);
            assert_eq!(record.label(), label);
        }
    }

    #[test]
    fn garbage_marker_is_invalid_format() {
        let fs = MemoryFs::new().with_file("base/last_mig.pos", "not a migration");
        let store = PositionStore::new(&fs, Path::new("base"), DEFAULT_POSITION_FILE);
        assert!(matches!(
            store.read_record(DEFAULT_DATE_FORMAT, DEFAULT_SEPARATOR),
            Err(MigrationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn write_into_missing_base_is_storage_error() {
        let fs = MemoryFs::new();
        let store = PositionStore::new(&fs, Path::new("missing"), DEFAULT_POSITION_FILE);
        assert!(matches!(
            store.write("x"),
            Err(MigrationError::Storage(StorageError::NotFound(_)))
        ));
    }
}
