use std::path::Path;

use chrono::NaiveDateTime;
use sqlmigr_backend::StorageTrait;

use crate::{
    codec::{self, MigrationRecord},
    migrator::{Direction, MigrationError},
};

/// Reads a direction's directory into migration records.
#[derive(Debug)]
pub struct DirectoryLister<'a, S> {
    storage: S,
    date_format: &'a str,
    separator: &'a str,
}

impl<'a, S: StorageTrait> DirectoryLister<'a, S> {
    pub fn new(storage: S, date_format: &'a str, separator: &'a str) -> Self {
        Self {
            storage,
            date_format,
            separator,
        }
    }

    /// One record per regular file of `dir`, in directory order.
    ///
    /// Subdirectories are skipped. Any other entry that is not a migration
    /// name fails the whole scan.
    pub fn scan(&self, dir: &Path) -> Result<Vec<MigrationRecord>, MigrationError> {
        let records = self
            .storage
            .read_dir(dir)?
            .into_iter()
            .filter(|entry| !entry.is_dir())
            .map(|entry| codec::parse_file_name(&entry.name, self.date_format, self.separator))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(dir = %dir.display(), count = records.len(), "scanned migrations");
        Ok(records)
    }

    /// Every record of `dir`, in traversal order for `direction`.
    pub fn list(
        &self,
        dir: &Path,
        direction: Direction,
    ) -> Result<Vec<MigrationRecord>, MigrationError> {
        let mut records = self.scan(dir)?;
        sort_for(&mut records, direction);
        Ok(records)
    }
}

/// Keeps the records strictly after `pivot`.
pub fn select_after(records: Vec<MigrationRecord>, pivot: NaiveDateTime) -> Vec<MigrationRecord> {
    records
        .into_iter()
        .filter(|record| record.position() > pivot)
        .collect()
}

/// Ascending by position for `Up`, descending for `Down`. Equal positions
/// fall back to the name.
pub fn sort_for(records: &mut [MigrationRecord], direction: Direction) {
    records.sort_by(|a, b| {
        let ord = a
            .position()
            .cmp(&b.position())
            .then_with(|| a.name().cmp(b.name()));
        match direction {
            Direction::Up => ord,
            Direction::Down => ord.reverse(),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_DATE_FORMAT as FMT, DEFAULT_SEPARATOR as SEP};
    use sqlmigr_backend::{LocalFs, MemoryFs, StorageError};
    use tempfile::tempdir;

    const NAMES: [&str; 4] = [
        "20240101000000_act3.sql",
        "20241231235959_act4.sql",
        "20200101100058_act2.sql",
        "20190101100058_act1.sql",
    ];

    fn fixture() -> MemoryFs {
        NAMES
            .iter()
            .fold(MemoryFs::new().with_dir("base/up/archive"), |fs, name| {
                fs.with_file(Path::new("base/up").join(name), "")
            })
    }

    fn names(records: &[MigrationRecord]) -> Vec<&str> {
        records.iter().map(MigrationRecord::name).collect()
    }

    fn record(name: &str) -> MigrationRecord {
        MigrationRecord::parse(name, FMT, SEP).unwrap()
    }

    #[test]
    fn up_listing_is_ascending() {
        let fs = fixture();
        let records = DirectoryLister::new(&fs, FMT, SEP)
            .list(Path::new("base/up"), Direction::Up)
            .unwrap();
        assert_eq!(
            names(&records),
            vec![
                "20190101100058_act1.sql",
                "20200101100058_act2.sql",
                "20240101000000_act3.sql",
                "20241231235959_act4.sql",
            ]
        );
        assert!(records.windows(2).all(|w| w[0].position() < w[1].position()));
    }

    #[test]
    fn down_listing_is_descending() {
        let fs = fixture();
        let records = DirectoryLister::new(&fs, FMT, SEP)
            .list(Path::new("base/up"), Direction::Down)
            .unwrap();
        assert_eq!(
            names(&records),
            vec![
                "20241231235959_act4.sql",
                "20240101000000_act3.sql",
                "20200101100058_act2.sql",
                "20190101100058_act1.sql",
            ]
        );
        assert!(records.windows(2).all(|w| w[0].position() > w[1].position()));
    }

    #[test]
    fn scan_skips_subdirectories() {
        let fs = fixture();
        let records = DirectoryLister::new(&fs, FMT, SEP)
            .scan(Path::new("base/up"))
            .unwrap();
        assert_eq!(records.len(), NAMES.len());
    }

    #[test]
    fn foreign_file_fails_listing() {
        let fs = fixture().with_file("base/up/README.md", "notes");
        let err = DirectoryLister::new(&fs, FMT, SEP)
            .list(Path::new("base/up"), Direction::Up)
            .unwrap_err();
        assert!(matches!(err, MigrationError::InvalidFormat { ref name, .. } if name == "README.md"));
    }

    #[test]
    fn missing_directory_is_storage_error() {
        let fs = MemoryFs::new();
        let err = DirectoryLister::new(&fs, FMT, SEP)
            .scan(Path::new("base/down"))
            .unwrap_err();
        assert!(matches!(
            err,
            MigrationError::Storage(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn scans_real_directory() {
        let tmp = tempdir().unwrap();
        for name in NAMES {
            std::fs::write(tmp.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(tmp.path().join("nested")).unwrap();

        let records = DirectoryLister::new(LocalFs, FMT, SEP)
            .list(tmp.path(), Direction::Up)
            .unwrap();
        assert_eq!(records.first().map(MigrationRecord::name), Some(NAMES[3]));
        assert_eq!(records.last().map(MigrationRecord::name), Some(NAMES[1]));
    }

    #[test]
    fn select_after_excludes_pivot() {
        let records = NAMES.iter().map(|name| record(name)).collect();
        let pivot = record("20200101100058_act2.sql").position();
        let mut after = select_after(records, pivot);
        sort_for(&mut after, Direction::Up);
        assert_eq!(
            names(&after),
            vec!["20240101000000_act3.sql", "20241231235959_act4.sql"]
        );
    }

    #[test]
    fn equal_positions_sort_by_name() {
        let mut records = vec![
            record("20240101000000_b.sql"),
            record("20240101000000_a.sql"),
        ];
        sort_for(&mut records, Direction::Up);
        assert_eq!(
            names(&records),
            vec!["20240101000000_a.sql", "20240101000000_b.sql"]
        );
        sort_for(&mut records, Direction::Down);
        assert_eq!(
            names(&records),
            vec!["20240101000000_b.sql", "20240101000000_a.sql"]
        );
    }
}
