use tera::Tera;

use crate::error::PromptError;

/// Tera-backed template engine for the pipeline prompts.
///
/// Templates are registered without a file extension, so Tera never
/// HTML-escapes the German text inserted into them.
pub struct TeraEngine {
    tera: Tera,
}

fn render_error(err: &tera::Error) -> PromptError {
    // Tera keeps the useful part (missing variable, bad syntax) in the source chain.
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    PromptError::Render(message)
}

impl TeraEngine {
    /// Create with inline templates (no filesystem).
    pub fn new() -> Self {
        Self {
            tera: Tera::default(),
        }
    }

    /// Register a template from a string.
    pub fn add_template(&mut self, name: &str, content: &str) -> Result<(), PromptError> {
        self.tera
            .add_raw_template(name, content)
            .map_err(|e| render_error(&e))
    }

    /// Render a named template with the given context.
    pub fn render(&self, template_name: &str, context: &tera::Context) -> Result<String, PromptError> {
        if !self.tera.get_template_names().any(|n| n == template_name) {
            return Err(PromptError::NotFound(template_name.to_string()));
        }
        self.tera
            .render(template_name, context)
            .map_err(|e| render_error(&e))
    }
}

impl Default for TeraEngine {
    fn default() -> Self {
        Self::new()
    }
}
