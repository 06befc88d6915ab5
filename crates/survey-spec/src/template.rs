use handlebars::Handlebars;
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_COMPLETION_MESSAGE: &str =
    "Thank you for taking part in {{survey_title}}. Your answers were saved under identifier {{document_id}}.";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("invalid template: {0}")]
    Compile(String),
    #[error("template render failed: {0}")]
    Render(String),
}

/// Plain-text handlebars renderer for survey copy.
pub struct TemplateEngine {
    registry: Handlebars<'static>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        Self { registry }
    }

    /// Compiles without rendering; used to reject broken templates up front.
    pub fn check(template: &str) -> Result<(), TemplateError> {
        handlebars::Template::compile(template)
            .map(|_| ())
            .map_err(|err| TemplateError::Compile(err.to_string()))
    }

    pub fn render(&self, template: &str, ctx: &Value) -> Result<String, TemplateError> {
        self.registry
            .render_template(template, ctx)
            .map_err(|err| TemplateError::Render(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_without_html_escaping() {
        let engine = TemplateEngine::new();
        let text = engine
            .render("Gracias {{name}}", &json!({ "name": "Perú & Chile" }))
            .expect("render");
        assert_eq!(text, "Gracias Perú & Chile");
    }

    #[test]
    fn unclosed_blocks_fail_the_check() {
        assert!(TemplateEngine::check("{{#if done}}open").is_err());
    }
}
