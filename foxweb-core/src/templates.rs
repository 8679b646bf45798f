// Template engine seam; rendering itself lives outside the core

use serde_json::Value;
use thiserror::Error;

/// Errors a template collaborator can report.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Template syntax error: {0}")]
    Syntax(String),
}

/// The rendering collaborator: template name plus context in, text out.
pub trait TemplateEngine: Send + Sync {
    fn render(&self, name: &str, context: &Value) -> Result<String, TemplateError>;
}
