#[cfg(feature = "migration")]
pub use sqlmigr_migration::*;

#[cfg(feature = "backend")]
pub use sqlmigr_backend as backend;

#[cfg(feature = "template")]
pub use sqlmigr_template as template;

#[cfg(feature = "cli")]
pub use sqlmigr_cli as cli;
