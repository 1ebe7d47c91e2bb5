use handlebars::{Handlebars, RenderError, RenderErrorReason, no_escape};
use once_cell::sync::Lazy;
use rust_embed::RustEmbed;
use serde::Serialize;

pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

#[derive(RustEmbed)]
#[folder = "assets"]
pub struct Assets;

pub struct Registry {
    handlebars: Handlebars<'static>,
}

impl Registry {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        #[cfg(debug_assertions)]
        handlebars.set_dev_mode(true);
        handlebars.set_strict_mode(true);
        // SQL comments, not HTML
        handlebars.register_escape_fn(no_escape);
        handlebars
            .register_embed_templates_with_extension::<Assets>(".hbs")
            .expect("embedded templates must compile");
        Self { handlebars }
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.handlebars.has_template(name)
    }

    pub fn render<D: Serialize>(&self, name: &str, data: &D) -> Result<String, RenderError> {
        if !self.has_template(name) {
            return Err(RenderErrorReason::TemplateNotFound(name.to_string()).into());
        }
        self.handlebars.render(name, data)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
