pub mod commands;

use clap::Parser;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use sqlmigr_migration::MigratorConfig;

use crate::commands::{MigrateError, MigrateSubcommands, run_migrate_command};

pub const DEFAULT_MIGRATION_DIR: &str = "./migrations";

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Migrate(#[from] MigrateError),
    #[error("cannot read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Parser, Debug)]
#[command(version, author, about = "Sequence timestamped up/down SQL scripts")]
pub struct Cli {
    #[arg(
        global = true,
        short = 'd',
        long,
        env = "MIGRATION_DIR",
        help = "base directory holding up/, down/ and the position marker [default: ./migrations]"
    )]
    pub migration_dir: Option<PathBuf>,

    #[arg(
        global = true,
        short = 'c',
        long,
        env = "SQLMIGR_CONFIG",
        help = "TOML file with naming conventions"
    )]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: MigrateSubcommands,
}

impl Cli {
    /// Conventions from the config file, if any, rooted at `--migration-dir`
    /// when given.
    pub fn migrator_config(&self) -> Result<MigratorConfig, CliError> {
        let mut config = match self.config.as_deref() {
            Some(path) => load_config(path)?,
            None => MigratorConfig::with_base_dir(DEFAULT_MIGRATION_DIR),
        };
        if let Some(dir) = self.migration_dir.as_ref() {
            config.base_dir = dir.clone();
        }
        Ok(config)
    }
}

/// Reads a [`MigratorConfig`] from TOML. A relative `base_dir` is resolved
/// against the directory of the file.
pub fn load_config(path: &Path) -> Result<MigratorConfig, CliError> {
    let raw = fs::read_to_string(path).map_err(|source| CliError::ConfigRead {
        path: path.to_owned(),
        source,
    })?;
    let mut config: MigratorConfig =
        toml::from_str(&raw).map_err(|source| CliError::ConfigParse {
            path: path.to_owned(),
            source,
        })?;
    if config.base_dir.is_relative() {
        if let Some(parent) = path.parent() {
            config.base_dir = parent.join(&config.base_dir);
        }
    }
    Ok(config)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init();
}

pub fn main() -> Result<(), CliError> {
    init_tracing();
    let cli = Cli::parse();
    let config = cli.migrator_config()?;
    run_migrate_command(cli.command, config, &mut io::stdout().lock())?;
    Ok(())
}
