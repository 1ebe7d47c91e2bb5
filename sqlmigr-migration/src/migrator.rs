use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use chrono::NaiveDateTime;
use sqlmigr_backend::{LocalFs, StorageError, StorageTrait};
use thiserror::Error;

use crate::{
    codec::{self, MigrationRecord},
    config::{MigratorConfig, MigratorConfigBuilderError},
    lister::{self, DirectoryLister},
    position::PositionStore,
};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("invalid migration name `{name}`: {reason}")]
    InvalidFormat { name: String, reason: String },
    #[error("{} not found", .0.display())]
    NotFound(PathBuf),
    #[error("no {0} migration available")]
    NoMigrationAvailable(Direction),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl MigrationError {
    pub(crate) fn invalid_format(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// True for the end-of-traversal sentinel, false for real failures.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::NoMigrationAvailable(_))
    }
}

impl From<MigratorConfigBuilderError> for MigrationError {
    fn from(err: MigratorConfigBuilderError) -> Self {
        Self::Config(err.to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Up => "up",
            Direction::Down => "down",
        })
    }
}

#[derive(Debug, Error)]
#[error("unknown direction `{0}`, expected `up` or `down`")]
pub struct ParseDirectionError(String);

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            _ => Err(ParseDirectionError(s.to_owned())),
        }
    }
}

/// Outcome of asking for the next migration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Next {
    Ready(MigrationRecord),
    /// Nothing left in this direction. Expected at the end of a traversal.
    Exhausted(Direction),
}

impl Next {
    pub fn record(&self) -> Option<&MigrationRecord> {
        match self {
            Next::Ready(record) => Some(record),
            Next::Exhausted(_) => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Next::Exhausted(_))
    }

    pub fn into_record(self) -> Result<MigrationRecord, MigrationError> {
        match self {
            Next::Ready(record) => Ok(record),
            Next::Exhausted(direction) => Err(MigrationError::NoMigrationAvailable(direction)),
        }
    }
}

/// Decides which script comes next and creates new ones.
///
/// Holds no state besides its configuration: the position lives in the
/// marker file and the scripts in the up/down directories. The caller runs
/// the scripts and moves the marker with [`Migrator::set_position`].
#[derive(Debug)]
pub struct Migrator<S = LocalFs> {
    config: MigratorConfig,
    storage: S,
}

impl Migrator<LocalFs> {
    /// Default conventions on the local filesystem.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            config: MigratorConfig::with_base_dir(base_dir),
            storage: LocalFs,
        }
    }

    pub fn from_config(config: MigratorConfig) -> Result<Self, MigrationError> {
        Self::with_storage(config, LocalFs)
    }
}

impl<S: StorageTrait> Migrator<S> {
    pub fn with_storage(config: MigratorConfig, storage: S) -> Result<Self, MigrationError> {
        config.validate().map_err(MigrationError::Config)?;
        Ok(Self { config, storage })
    }

    pub fn config(&self) -> &MigratorConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn dir(&self, direction: Direction) -> PathBuf {
        let sub = match direction {
            Direction::Up => &self.config.up_dir,
            Direction::Down => &self.config.down_dir,
        };
        self.storage.join(&self.config.base_dir, sub)
    }

    pub fn up_dir(&self) -> PathBuf {
        self.dir(Direction::Up)
    }

    pub fn down_dir(&self) -> PathBuf {
        self.dir(Direction::Down)
    }

    pub fn script_path(&self, direction: Direction, name: &str) -> PathBuf {
        self.storage.join(&self.dir(direction), name)
    }

    /// Name a migration created at `position` with `label` gets.
    pub fn file_name(&self, position: &NaiveDateTime, label: &str) -> Result<String, MigrationError> {
        codec::format_file_name(
            position,
            label,
            &self.config.date_format,
            &self.config.separator,
            &self.config.extension,
        )
    }

    pub fn parse_name(&self, name: &str) -> Result<MigrationRecord, MigrationError> {
        codec::parse_file_name(name, &self.config.date_format, &self.config.separator)
    }

    pub fn position_store(&self) -> PositionStore<&S> {
        PositionStore::new(
            &self.storage,
            &self.config.base_dir,
            &self.config.position_file,
        )
    }

    pub fn lister(&self) -> DirectoryLister<'_, &S> {
        DirectoryLister::new(
            &self.storage,
            &self.config.date_format,
            &self.config.separator,
        )
    }

    /// Raw marker contents.
    pub fn position(&self) -> Result<String, MigrationError> {
        self.position_store().read()
    }

    /// The last applied migration, parsed.
    pub fn current(&self) -> Result<MigrationRecord, MigrationError> {
        self.position_store()
            .read_record(&self.config.date_format, &self.config.separator)
    }

    /// Records `name` as the last applied migration.
    pub fn set_position(&self, name: &str) -> Result<(), MigrationError> {
        self.position_store().write(name)
    }

    /// Every script of `direction`, in traversal order, ignoring the marker.
    pub fn listing(&self, direction: Direction) -> Result<Vec<MigrationRecord>, MigrationError> {
        self.lister().list(&self.dir(direction), direction)
    }

    /// Scripts of `direction` past the marker, in traversal order.
    ///
    /// Both directions keep what lies strictly after the marker: a down
    /// script is named after the forward position it undoes.
    pub fn pending(&self, direction: Direction) -> Result<Vec<MigrationRecord>, MigrationError> {
        let pivot = self.current()?;
        let candidates = self.lister().scan(&self.dir(direction))?;
        let mut pending = lister::select_after(candidates, pivot.position());
        lister::sort_for(&mut pending, direction);
        tracing::debug!(
            %direction,
            pivot = pivot.name(),
            count = pending.len(),
            "pending migrations"
        );
        Ok(pending)
    }

    pub fn next_migration(&self, direction: Direction) -> Result<Next, MigrationError> {
        Ok(self
            .pending(direction)?
            .into_iter()
            .next()
            .map_or(Next::Exhausted(direction), Next::Ready))
    }

    pub fn up(&self) -> Result<Next, MigrationError> {
        self.next_migration(Direction::Up)
    }

    pub fn down(&self) -> Result<Next, MigrationError> {
        self.next_migration(Direction::Down)
    }

    /// Writes `content` as the `direction` script of a new migration and
    /// returns its file name.
    ///
    /// An existing script with the same name is overwritten.
    pub fn add(
        &self,
        position: &NaiveDateTime,
        label: &str,
        direction: Direction,
        content: &[u8],
    ) -> Result<String, MigrationError> {
        let name = self.file_name(position, label)?;
        let path = self.script_path(direction, &name);
        self.storage.write(&path, content)?;
        tracing::info!(%direction, path = %path.display(), "migration script created");
        Ok(name)
    }

    /// Writes both scripts of a new migration.
    pub fn add_pair(
        &self,
        position: &NaiveDateTime,
        label: &str,
        up: &[u8],
        down: &[u8],
    ) -> Result<String, MigrationError> {
        let name = self.add(position, label, Direction::Up, up)?;
        self.add(position, label, Direction::Down, down)?;
        Ok(name)
    }

    /// Creates the base, up and down directories.
    pub fn init(&self) -> Result<(), MigrationError> {
        [self.up_dir(), self.down_dir()]
            .iter()
            .try_for_each(|dir| self.storage.create_dir_all(dir))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_DATE_FORMAT, DEFAULT_DOWN_DIR, DEFAULT_UP_DIR};
    use sqlmigr_backend::MemoryFs;
    use tempfile::tempdir;

    const ACT1: &str = "20190101100058_act1.sql";
    const ACT2: &str = "20200101100058_act2.sql";
    const ACT3: &str = "20240101000000_act3.sql";
    const ACT4: &str = "20241231235959_act4.sql";

    fn at(raw: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(raw, DEFAULT_DATE_FORMAT).unwrap()
    }

    fn memory_migrator(direction: Direction) -> Migrator<MemoryFs> {
        let fs = [ACT3, ACT4, ACT2, ACT1]
            .iter()
            .fold(MemoryFs::new().with_dir("db/up").with_dir("db/down"), |fs, name| {
                fs.with_file(Path::new("db").join(direction.to_string()).join(name), "")
            });
        Migrator::with_storage(MigratorConfig::with_base_dir("db"), fs).unwrap()
    }

    fn expect_next(migrator: &Migrator<impl StorageTrait>, direction: Direction, marker: &str) -> Option<String> {
        migrator.set_position(marker).unwrap();
        migrator
            .next_migration(direction)
            .unwrap()
            .record()
            .map(|record| record.name().to_owned())
    }

    #[test]
    fn directories() {
        for base in ["dir1", "/home/u1/dir1"] {
            let migrator = Migrator::new(base);
            assert_eq!(migrator.config().base_dir(), Path::new(base));
            assert_eq!(migrator.up_dir(), Path::new(base).join(DEFAULT_UP_DIR));
            assert_eq!(migrator.down_dir(), Path::new(base).join(DEFAULT_DOWN_DIR));
            assert_eq!(
                migrator.script_path(Direction::Down, ACT1),
                Path::new(base).join(DEFAULT_DOWN_DIR).join(ACT1)
            );
        }
    }

    #[test]
    fn up_walks_forward() {
        let migrator = memory_migrator(Direction::Up);
        assert_eq!(expect_next(&migrator, Direction::Up, ACT2).as_deref(), Some(ACT3));
        assert_eq!(expect_next(&migrator, Direction::Up, ACT3).as_deref(), Some(ACT4));
        assert_eq!(expect_next(&migrator, Direction::Up, ACT1).as_deref(), Some(ACT2));
        assert_eq!(expect_next(&migrator, Direction::Up, ACT4), None);
    }

    #[test]
    fn down_takes_latest_after_marker() {
        let migrator = memory_migrator(Direction::Down);
        assert_eq!(expect_next(&migrator, Direction::Down, ACT1).as_deref(), Some(ACT4));
        assert_eq!(expect_next(&migrator, Direction::Down, ACT3).as_deref(), Some(ACT4));
        assert_eq!(expect_next(&migrator, Direction::Down, ACT4), None);
    }

    #[test]
    fn marker_is_never_returned() {
        for direction in [Direction::Up, Direction::Down] {
            let migrator = memory_migrator(direction);
            for marker in [ACT1, ACT2, ACT3, ACT4] {
                assert_ne!(expect_next(&migrator, direction, marker).as_deref(), Some(marker));
            }
        }
    }

    #[test]
    fn exhausted_is_distinct_from_failure() {
        let migrator = memory_migrator(Direction::Up);
        migrator.set_position(ACT4).unwrap();

        let next = migrator.up().unwrap();
        assert_eq!(next, Next::Exhausted(Direction::Up));
        let err = next.into_record().unwrap_err();
        assert!(err.is_exhausted());
        assert!(matches!(err, MigrationError::NoMigrationAvailable(Direction::Up)));
    }

    #[test]
    fn missing_marker_is_not_found() {
        let migrator = memory_migrator(Direction::Up);
        let err = migrator.up().unwrap_err();
        assert!(matches!(err, MigrationError::NotFound(_)));
        assert!(!err.is_exhausted());
    }

    #[test]
    fn marker_outside_listing_still_pivots() {
        let migrator = memory_migrator(Direction::Up);
        migrator.set_position("20220606000000_elsewhere.sql").unwrap();
        assert_eq!(migrator.up().unwrap().record().map(MigrationRecord::name), Some(ACT3));
    }

    #[test]
    fn pending_and_listing() {
        let migrator = memory_migrator(Direction::Up);
        migrator.set_position(ACT2).unwrap();
        let pending: Vec<_> = migrator
            .pending(Direction::Up)
            .unwrap()
            .into_iter()
            .map(|record| record.name().to_owned())
            .collect();
        assert_eq!(pending, vec![ACT3, ACT4]);
        assert_eq!(migrator.listing(Direction::Up).unwrap().len(), 4);
        assert_eq!(migrator.current().unwrap().label(), "act2");
        assert_eq!(migrator.position().unwrap(), ACT2);
    }

    #[test]
    fn up_on_disk() {
        let tmp = tempdir().unwrap();
        let migrator = Migrator::new(tmp.path());
        migrator.init().unwrap();
        for name in [ACT3, ACT4, ACT2, ACT1] {
            std::fs::write(migrator.script_path(Direction::Up, name), b"").unwrap();
        }
        assert_eq!(expect_next(&migrator, Direction::Up, ACT2).as_deref(), Some(ACT3));
        assert_eq!(expect_next(&migrator, Direction::Up, ACT4), None);
    }

    #[test]
    fn add_writes_exact_content() {
        let tmp = tempdir().unwrap();
        let migrator = Migrator::new(tmp.path());
        migrator.init().unwrap();

        let cases = [
            (ACT3, "20240101000000", "act3", Direction::Up, &b""[..]),
            (ACT4, "20241231235959", "act4", Direction::Up, &b"create table t (id int);"[..]),
            (ACT2, "20200101100058", "act2", Direction::Down, &b"drop table t;"[..]),
        ];
        for (expected, stamp, label, direction, content) in cases {
            let name = migrator.add(&at(stamp), label, direction, content).unwrap();
            assert_eq!(name, expected);
            let meta = std::fs::metadata(tmp.path().join(direction.to_string()).join(expected)).unwrap();
            assert_eq!(meta.len(), content.len() as u64);
        }
    }

    #[test]
    fn add_overwrites_same_name() {
        let fs = MemoryFs::new().with_dir("db/up");
        let migrator = Migrator::with_storage(MigratorConfig::with_base_dir("db"), fs).unwrap();
        let position = at("20240101000000");
        migrator.add(&position, "act1", Direction::Up, b"one").unwrap();
        migrator.add(&position, "act1", Direction::Up, b"two").unwrap();
        let path = migrator.script_path(Direction::Up, "20240101000000_act1.sql");
        assert_eq!(migrator.storage().read(&path).unwrap(), b"two");
    }

    #[test]
    fn add_without_directory_fails() {
        let tmp = tempdir().unwrap();
        let migrator = Migrator::new(tmp.path());
        let err = migrator
            .add(&at("20240101000000"), "act1", Direction::Up, b"")
            .unwrap_err();
        assert!(matches!(err, MigrationError::Storage(_)));
    }

    #[test]
    fn add_pair_writes_both_scripts() {
        let fs = MemoryFs::new();
        let migrator = Migrator::with_storage(MigratorConfig::with_base_dir("db"), fs).unwrap();
        migrator.init().unwrap();
        let name = migrator
            .add_pair(&at("20240101000000"), "users", b"create", b"drop")
            .unwrap();
        assert_eq!(name, "20240101000000_users.sql");
        let storage = migrator.storage();
        assert_eq!(storage.read(&migrator.script_path(Direction::Up, &name)).unwrap(), b"create");
        assert_eq!(storage.read(&migrator.script_path(Direction::Down, &name)).unwrap(), b"drop");
    }

    #[test]
    fn custom_conventions() {
        let config = MigratorConfig::builder()
            .base_dir("db")
            .up_dir("apply")
            .down_dir("revert")
            .date_format("%Y%m%d%H%M")
            .separator("-")
            .extension(".psql")
            .position_file("HEAD")
            .build()
            .unwrap();
        let migrator = Migrator::with_storage(config, MemoryFs::new()).unwrap();
        migrator.init().unwrap();
        let first = migrator.add(&at("20240101000000"), "one", Direction::Up, b"").unwrap();
        let second = migrator.add(&at("20240102000000"), "two-parts", Direction::Up, b"").unwrap();
        assert_eq!(second, "202401020000-two-parts.psql");

        migrator.set_position(&first).unwrap();
        assert!(migrator.storage().exists(Path::new("db/HEAD")));
        let next = migrator.up().unwrap().into_record().unwrap();
        assert_eq!(next.name(), second);
        assert_eq!(next.label(), "two-parts");
    }

    #[test]
    fn rejects_invalid_config() {
        let config = MigratorConfig {
            extension: "sql".into(),
            ..MigratorConfig::default()
        };
        assert!(matches!(
            Migrator::with_storage(config, MemoryFs::new()),
            Err(MigrationError::Config(_))
        ));
    }

    #[test]
    fn direction_round_trips_through_text() {
        for direction in [Direction::Up, Direction::Down] {
            assert_eq!(direction.to_string().parse::<Direction>().unwrap(), direction);
        }
        assert_eq!("DOWN".parse::<Direction>().unwrap(), Direction::Down);
        assert!("sideways".parse::<Direction>().is_err());
    }
}
