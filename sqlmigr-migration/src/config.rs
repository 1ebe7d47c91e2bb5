use std::path::{Path, PathBuf};

use chrono::{
    NaiveDate,
    format::{Item, StrftimeItems},
};
use derive_builder::Builder;
use lazy_regex::{Lazy, Regex, lazy_regex};
use serde::{Deserialize, Serialize};

use crate::codec;

pub const DEFAULT_BASE_DIR: &str = ".";
pub const DEFAULT_UP_DIR: &str = "up";
pub const DEFAULT_DOWN_DIR: &str = "down";
pub const DEFAULT_DATE_FORMAT: &str = "%Y%m%d%H%M%S";
pub const DEFAULT_SEPARATOR: &str = "_";
pub const DEFAULT_EXTENSION: &str = ".sql";
pub const DEFAULT_POSITION_FILE: &str = "last_mig.pos";

static EXTENSION_REGEX: Lazy<Regex> = lazy_regex!(r"^\.[^./\\]+$");
static SEGMENT_REGEX: Lazy<Regex> = lazy_regex!(r"^[^/\\]+$");

/// Naming conventions of one migration directory.
///
/// Every component receives this value explicitly. Two migrators configured
/// differently must not share a base directory.
#[derive(Builder, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[builder(build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct MigratorConfig {
    #[builder(setter(into), default = "PathBuf::from(DEFAULT_BASE_DIR)")]
    pub base_dir: PathBuf,
    #[builder(setter(into), default = "DEFAULT_UP_DIR.to_string()")]
    pub up_dir: String,
    #[builder(setter(into), default = "DEFAULT_DOWN_DIR.to_string()")]
    pub down_dir: String,
    /// strftime pattern of the leading timestamp
    #[builder(setter(into), default = "DEFAULT_DATE_FORMAT.to_string()")]
    pub date_format: String,
    #[builder(setter(into), default = "DEFAULT_SEPARATOR.to_string()")]
    pub separator: String,
    /// extension of the scripts, leading dot included
    #[builder(setter(into), default = "DEFAULT_EXTENSION.to_string()")]
    pub extension: String,
    #[builder(setter(into), default = "DEFAULT_POSITION_FILE.to_string()")]
    pub position_file: String,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            up_dir: DEFAULT_UP_DIR.to_string(),
            down_dir: DEFAULT_DOWN_DIR.to_string(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            separator: DEFAULT_SEPARATOR.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            position_file: DEFAULT_POSITION_FILE.to_string(),
        }
    }
}

impl MigratorConfig {
    pub fn builder() -> MigratorConfigBuilder {
        MigratorConfigBuilder::default()
    }

    /// Default conventions rooted at `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Checks a config that did not go through the builder, e.g. one
    /// deserialized from a file.
    pub fn validate(&self) -> Result<(), String> {
        validate_conventions(Conventions {
            up_dir: &self.up_dir,
            down_dir: &self.down_dir,
            date_format: &self.date_format,
            separator: &self.separator,
            extension: &self.extension,
            position_file: &self.position_file,
        })
    }
}

impl MigratorConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        validate_conventions(Conventions {
            up_dir: self.up_dir.as_deref().unwrap_or(DEFAULT_UP_DIR),
            down_dir: self.down_dir.as_deref().unwrap_or(DEFAULT_DOWN_DIR),
            date_format: self.date_format.as_deref().unwrap_or(DEFAULT_DATE_FORMAT),
            separator: self.separator.as_deref().unwrap_or(DEFAULT_SEPARATOR),
            extension: self.extension.as_deref().unwrap_or(DEFAULT_EXTENSION),
            position_file: self
                .position_file
                .as_deref()
                .unwrap_or(DEFAULT_POSITION_FILE),
        })
    }
}

struct Conventions<'a> {
    up_dir: &'a str,
    down_dir: &'a str,
    date_format: &'a str,
    separator: &'a str,
    extension: &'a str,
    position_file: &'a str,
}

fn validate_conventions(c: Conventions<'_>) -> Result<(), String> {
    for (field, value) in [
        ("up_dir", c.up_dir),
        ("down_dir", c.down_dir),
        ("position_file", c.position_file),
    ] {
        if !SEGMENT_REGEX.is_match(value) {
            return Err(format!(
                "{field} `{value}` must be a single non-empty path segment"
            ));
        }
    }
    if c.up_dir == c.down_dir {
        return Err(format!(
            "up_dir and down_dir must differ, both are `{}`",
            c.up_dir
        ));
    }

    if c.separator.is_empty() {
        return Err("separator cannot be empty".into());
    }
    if c.separator.contains(['/', '\\', '.']) {
        return Err(format!(
            "separator `{}` cannot contain path separators or dots",
            c.separator
        ));
    }
    // timestamps render digits and month or weekday names
    if c.separator.contains(|ch: char| ch.is_ascii_alphanumeric()) {
        return Err(format!(
            "separator `{}` cannot contain letters or digits",
            c.separator
        ));
    }

    if !EXTENSION_REGEX.is_match(c.extension) {
        return Err(format!(
            "extension `{}` must be a dot followed by a name, e.g. `.sql`",
            c.extension
        ));
    }

    if c.date_format.is_empty()
        || StrftimeItems::new(c.date_format).any(|item| matches!(item, Item::Error))
    {
        return Err(format!("invalid date format `{}`", c.date_format));
    }

    // A sample timestamp must render back identically after a parse and must
    // not contain the separator, otherwise names cannot be split back apart.
    let sample = NaiveDate::from_ymd_opt(2001, 2, 3)
        .and_then(|date| date.and_hms_opt(4, 5, 6))
        .ok_or_else(|| "invalid sample timestamp".to_string())?;
    let stamp = codec::format_timestamp(&sample, c.date_format)
        .map_err(|_| format!("invalid date format `{}`", c.date_format))?;
    if stamp.contains(c.separator) || stamp.contains('.') {
        return Err(format!(
            "date format `{}` renders `{stamp}` which contains the separator `{}` or a dot",
            c.date_format, c.separator
        ));
    }
    let parsed = codec::parse_timestamp(&stamp, c.date_format).map_err(|err| {
        format!(
            "date format `{}` cannot be parsed back: {err}",
            c.date_format
        )
    })?;
    let reformatted = codec::format_timestamp(&parsed, c.date_format)
        .map_err(|_| format!("invalid date format `{}`", c.date_format))?;
    if reformatted != stamp {
        return Err(format!(
            "date format `{}` does not round-trip: `{stamp}` parses back as `{reformatted}`",
            c.date_format
        ));
    }

    Ok(())
}
