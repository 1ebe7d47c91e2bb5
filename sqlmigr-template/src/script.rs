use derive_builder::Builder;
use handlebars::{RenderError, RenderErrorReason};
use lazy_regex::{Lazy, Regex, lazy_regex};
use serde::Serialize;

use crate::registry::REGISTRY;

static LABEL_REGEX: Lazy<Regex> = lazy_regex!(r"^[A-Za-z0-9][A-Za-z0-9_-]*$");
static ISO_DATE_REGEX: Lazy<Regex> = lazy_regex!(r"^\d{4}-\d{2}-\d{2}(?:[ T]\d{2}:\d{2}:\d{2})?$");

/// Starting content of a freshly generated up/down script pair.
#[derive(Builder, Serialize, Debug)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct ScriptTemplate {
    /// file name shared by both scripts
    #[builder(setter(into))]
    name: String,
    #[builder(setter(into))]
    label: String,
    #[builder(setter(into))]
    date: String,
    #[builder(setter(into, strip_option), default)]
    message: Option<String>,
}

impl ScriptTemplate {
    pub fn builder() -> ScriptTemplateBuilder {
        ScriptTemplateBuilder::default()
    }

    /// Renders the script for `direction` (`up` or `down`).
    pub fn render(&self, direction: &str) -> Result<String, RenderError> {
        REGISTRY.render(&format!("script/{direction}.sql"), self)
    }

    pub fn render_up(&self) -> Result<String, RenderError> {
        self.render("up")
    }

    pub fn render_down(&self) -> Result<String, RenderError> {
        self.render("down")
    }
}

impl ScriptTemplateBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.name.as_deref() {
            Some(name) if name.trim().is_empty() => return Err("name cannot be empty".into()),
            Some(_) => {}
            None => return Err("name is required".into()),
        }

        if let Some(label) = self.label.as_ref() {
            if !LABEL_REGEX.is_match(label) {
                return Err(format!(
                    "label `{}` must match `{}`",
                    label,
                    LABEL_REGEX.as_str()
                ));
            }
        } else {
            return Err("label is required".into());
        }

        if let Some(date) = self.date.as_ref() {
            if !ISO_DATE_REGEX.is_match(date) {
                return Err(format!(
                    "date `{}` must be ISO-8601: YYYY-MM-DD, YYYY-MM-DD HH:MM:SS, or YYYY-MM-DDTHH:MM:SS",
                    date
                ));
            }
        } else {
            return Err("date is required".into());
        }

        if let Some(Some(message)) = self.message.as_ref() {
            if message.trim().is_empty() {
                return Err("message cannot be empty".into());
            }
            if message.contains('\n') {
                return Err("message must fit on one line".into());
            }
        }

        Ok(())
    }

    pub fn render(&self, direction: &str) -> Result<String, RenderError> {
        self.build()
            .map_err(|err| RenderErrorReason::Other(err.to_string()))?
            .render(direction)
    }
}
