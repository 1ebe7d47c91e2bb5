pub mod registry;
pub mod script;

pub use handlebars;

pub use handlebars::RenderError;
pub use script::{ScriptTemplate, ScriptTemplateBuilder, ScriptTemplateBuilderError};
