use std::fmt::{self, Write};

use chrono::{
    NaiveDate, NaiveDateTime, NaiveTime, ParseError,
    format::{Fixed, Item, Numeric, ParseErrorKind, StrftimeItems},
};
use serde::Serialize;

use crate::migrator::MigrationError;

/// One migration script, identified by its file name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct MigrationRecord {
    name: String,
    position: NaiveDateTime,
    label: String,
}

impl MigrationRecord {
    pub fn parse(name: &str, date_format: &str, separator: &str) -> Result<Self, MigrationError> {
        parse_file_name(name, date_format, separator)
    }

    /// File name, extension included.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> NaiveDateTime {
        self.position
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for MigrationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn strip_extension(name: &str) -> &str {
    name.rfind('.').map_or(name, |dot| &name[..dot])
}

/// True when `date_format` renders any time of day field.
pub(crate) fn has_time_fields(date_format: &str) -> bool {
    StrftimeItems::new(date_format).any(|item| {
        matches!(
            item,
            Item::Numeric(
                Numeric::Hour
                    | Numeric::Hour12
                    | Numeric::Minute
                    | Numeric::Second
                    | Numeric::Nanosecond
                    | Numeric::Timestamp,
                _
            ) | Item::Fixed(
                Fixed::LowerAmPm
                    | Fixed::UpperAmPm
                    | Fixed::Nanosecond
                    | Fixed::Nanosecond3
                    | Fixed::Nanosecond6
                    | Fixed::Nanosecond9
                    | Fixed::RFC2822
                    | Fixed::RFC3339
            )
        )
    })
}

pub(crate) fn parse_timestamp(raw: &str, date_format: &str) -> Result<NaiveDateTime, ParseError> {
    NaiveDateTime::parse_from_str(raw, date_format).or_else(|err| match err.kind() {
        // date-only formats land on midnight, a partial time is an error
        ParseErrorKind::NotEnough if !has_time_fields(date_format) => {
            NaiveDate::parse_from_str(raw, date_format)
                .map(|date| date.and_time(NaiveTime::default()))
        }
        _ => Err(err),
    })
}

pub(crate) fn format_timestamp(
    position: &NaiveDateTime,
    date_format: &str,
) -> Result<String, fmt::Error> {
    let mut out = String::new();
    write!(out, "{}", position.format(date_format))?;
    Ok(out)
}

/// Parses `<timestamp><separator><label><.ext>`.
///
/// Only the first `separator` splits, so the label may contain it. A name
/// without separator has an empty label.
pub fn parse_file_name(
    name: &str,
    date_format: &str,
    separator: &str,
) -> Result<MigrationRecord, MigrationError> {
    let stem = strip_extension(name);
    let (stamp, label) = stem.split_once(separator).unwrap_or((stem, ""));

    if stamp.is_empty() {
        return Err(MigrationError::invalid_format(name, "missing timestamp"));
    }

    let position = parse_timestamp(stamp, date_format).map_err(|err| {
        MigrationError::invalid_format(
            name,
            format!("timestamp `{stamp}` does not match `{date_format}`: {err}"),
        )
    })?;

    Ok(MigrationRecord {
        name: name.to_owned(),
        position,
        label: label.to_owned(),
    })
}

/// Builds the file name a migration at `position` labelled `label` gets.
pub fn format_file_name(
    position: &NaiveDateTime,
    label: &str,
    date_format: &str,
    separator: &str,
    extension: &str,
) -> Result<String, MigrationError> {
    let stamp = format_timestamp(position, date_format).map_err(|_| {
        MigrationError::invalid_format(label, format!("invalid date format `{date_format}`"))
    })?;
    Ok(format!("{stamp}{separator}{label}{extension}"))
}
