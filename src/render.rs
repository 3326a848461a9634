//! Template rendering.
//!
//! [`HandlebarsRenderer`] is the default engine. It runs in non-strict mode,
//! so a variable missing from the map renders as an empty string. Use
//! `{{name}}` for escaped interpolation, `{{{link}}}` for trusted content
//! such as reset links, and `{{#each items}}...{{/each}}` for lists.

use handlebars::Handlebars;
use serde_json::{Map, Value};

use crate::error::MailError;

/// Renders a template body against a variable map.
pub trait Renderer: Send + Sync {
    /// Render `template` with `variables`.
    fn render(&self, template: &str, variables: &Map<String, Value>) -> Result<String, MailError>;
}

/// Handlebars-backed renderer.
pub struct HandlebarsRenderer {
    registry: Handlebars<'static>,
}

impl HandlebarsRenderer {
    /// Create a renderer with HTML escaping for `{{...}}`.
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        Self { registry }
    }

    /// Create a renderer that never escapes.
    ///
    /// Useful when both bodies are plain text and `&` or `<` must pass through.
    pub fn no_escape() -> Self {
        let mut renderer = Self::new();
        renderer.registry.register_escape_fn(handlebars::no_escape);
        renderer
    }
}

impl Default for HandlebarsRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for HandlebarsRenderer {
    fn render(&self, template: &str, variables: &Map<String, Value>) -> Result<String, MailError> {
        Ok(self.registry.render_template(template, variables)?)
    }
}
