mod migrate;

use clap::Subcommand;
use std::io::Write;

use sqlmigr_migration::{Direction, Migrator, MigratorConfig};

pub use migrate::{MigrateError, init, list, mark, new_migration, next, status};

fn parse_migration_name(raw: &str) -> Result<String, String> {
    let name = raw.trim().to_lowercase().replace(' ', "_");
    if name.is_empty() {
        Err(String::from("must not be empty"))
    } else if !name.starts_with(|c: char| c.is_ascii_alphanumeric())
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        Err(String::from(
            "must start with a letter or digit and only contain letters, digits, \"_\" or \"-\"",
        ))
    } else {
        Ok(name)
    }
}

#[derive(Subcommand, PartialEq, Eq, Debug)]
pub enum MigrateSubcommands {
    #[command(about = "Create the up and down directories")]
    Init,
    #[command(about = "Generate a new up/down script pair")]
    New {
        #[arg(required = true, value_parser = parse_migration_name)]
        label: String,
        #[arg(short, long, help = "one line description written into both scripts")]
        message: Option<String>,
    },
    #[command(about = "Print the next script to apply or revert")]
    Next {
        #[arg(default_value = "up")]
        direction: Direction,
    },
    #[command(about = "Record a script as the last applied migration")]
    Mark { name: String },
    #[command(about = "Show the position marker and pending migrations")]
    Status,
    #[command(about = "List every script of a direction in traversal order")]
    List {
        #[arg(default_value = "up")]
        direction: Direction,
    },
}

pub fn run_migrate_command(
    command: MigrateSubcommands,
    config: MigratorConfig,
    out: &mut impl Write,
) -> Result<(), MigrateError> {
    let migrator = Migrator::from_config(config)?;

    match command {
        MigrateSubcommands::Init => init(&migrator, out),
        MigrateSubcommands::New { label, message } => {
            new_migration(&migrator, &label, message.as_deref(), out).map(|_| ())
        }
        MigrateSubcommands::Next { direction } => next(&migrator, direction, out),
        MigrateSubcommands::Mark { name } => mark(&migrator, &name, out),
        MigrateSubcommands::Status => status(&migrator, out),
        MigrateSubcommands::List { direction } => list(&migrator, direction, out),
    }
}
