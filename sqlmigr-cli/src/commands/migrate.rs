use chrono::Utc;
use owo_colors::OwoColorize;
use sqlmigr_migration::{Direction, MigrationError, Migrator, Next, StorageTrait};
use sqlmigr_template::{RenderError, ScriptTemplate, ScriptTemplateBuilderError};
use std::io::{self, Write};
use thiserror::Error;

const DATE_FMT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error(transparent)]
    Migration(#[from] MigrationError),
    #[error("Invalid script template: {0}")]
    Template(#[from] ScriptTemplateBuilderError),
    #[error("Template rendering failed: {0}")]
    Render(#[from] RenderError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

type Result<T> = std::result::Result<T, MigrateError>;

pub fn init<S: StorageTrait>(migrator: &Migrator<S>, out: &mut impl Write) -> Result<()> {
    migrator.init()?;
    writeln!(
        out,
        "{} {}",
        "initialized".green(),
        migrator.config().base_dir().display()
    )?;
    Ok(())
}

/// Writes an up/down pair stamped with the current UTC second.
pub fn new_migration<S: StorageTrait>(
    migrator: &Migrator<S>,
    label: &str,
    message: Option<&str>,
    out: &mut impl Write,
) -> Result<String> {
    let now = Utc::now().naive_utc();
    let name = migrator.file_name(&now, label)?;

    let mut builder = ScriptTemplate::builder();
    builder
        .name(name.as_str())
        .label(label)
        .date(now.format(DATE_FMT).to_string());
    if let Some(message) = message {
        builder.message(message);
    }
    let template = builder.build()?;

    migrator.add_pair(
        &now,
        label,
        template.render_up()?.as_bytes(),
        template.render_down()?.as_bytes(),
    )?;

    for direction in [Direction::Up, Direction::Down] {
        writeln!(
            out,
            "{} {}",
            "created".green(),
            migrator.script_path(direction, &name).display()
        )?;
    }
    Ok(name)
}

pub fn next<S: StorageTrait>(
    migrator: &Migrator<S>,
    direction: Direction,
    out: &mut impl Write,
) -> Result<()> {
    match migrator.next_migration(direction)? {
        Next::Ready(record) => writeln!(
            out,
            "{}",
            migrator.script_path(direction, record.name()).display()
        )?,
        Next::Exhausted(_) => writeln!(
            out,
            "{}",
            format!("no {direction} migration available").yellow()
        )?,
    }
    Ok(())
}

pub fn mark<S: StorageTrait>(migrator: &Migrator<S>, name: &str, out: &mut impl Write) -> Result<()> {
    let record = migrator.parse_name(name)?;
    if !migrator
        .storage()
        .exists(&migrator.script_path(Direction::Up, record.name()))
    {
        tracing::warn!(name, "marking a migration that has no up script");
    }
    migrator.set_position(record.name())?;
    writeln!(out, "{} {}", "position".cyan(), record.name())?;
    Ok(())
}

pub fn status<S: StorageTrait>(migrator: &Migrator<S>, out: &mut impl Write) -> Result<()> {
    let current = match migrator.current() {
        Ok(current) => current,
        Err(MigrationError::NotFound(path)) => {
            writeln!(
                out,
                "{} no position recorded in {}",
                "position".cyan(),
                path.display()
            )?;
            let scripts = migrator.listing(Direction::Up)?;
            writeln!(out, "{} up scripts found", scripts.len())?;
            for record in scripts {
                writeln!(out, "  {} {}", "?".dimmed(), record.name())?;
            }
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    writeln!(out, "{} {}", "position".cyan(), current.name())?;
    let pending = migrator.pending(Direction::Up)?;
    if pending.is_empty() {
        writeln!(out, "{}", "up to date".green())?;
    } else {
        writeln!(out, "{} pending", pending.len())?;
        for record in pending {
            writeln!(out, "  {} {}", "→".yellow(), record.name())?;
        }
    }
    Ok(())
}

pub fn list<S: StorageTrait>(
    migrator: &Migrator<S>,
    direction: Direction,
    out: &mut impl Write,
) -> Result<()> {
    for record in migrator.listing(direction)? {
        writeln!(
            out,
            "{}  {}",
            record.position().format(DATE_FMT),
            record.name()
        )?;
    }
    Ok(())
}
