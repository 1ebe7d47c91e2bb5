mod codec;
mod config;
mod lister;
mod migrator;
mod position;

pub use codec::{MigrationRecord, format_file_name, parse_file_name};
pub use config::{
    DEFAULT_BASE_DIR, DEFAULT_DATE_FORMAT, DEFAULT_DOWN_DIR, DEFAULT_EXTENSION,
    DEFAULT_POSITION_FILE, DEFAULT_SEPARATOR, DEFAULT_UP_DIR, MigratorConfig,
    MigratorConfigBuilder, MigratorConfigBuilderError,
};
pub use lister::{DirectoryLister, select_after, sort_for};
pub use migrator::{Direction, MigrationError, Migrator, Next, ParseDirectionError};
pub use position::PositionStore;

pub use sqlmigr_backend::{LocalFs, MemoryFs, StorageError, StorageTrait};
