//! Handlebars engine configuration

use std::path::PathBuf;

/// Configuration for the Handlebars engine
#[derive(Debug, Clone)]
pub struct HandlebarsConfig {
    /// Directory scanned recursively for templates
    pub template_dir: PathBuf,
    /// Extension of files registered as templates
    pub template_extension: String,
    /// Fail rendering on missing variables instead of emitting nothing
    pub strict_mode: bool,
    /// Escape HTML in interpolated values
    pub escape_html: bool,
}

impl Default for HandlebarsConfig {
    fn default() -> Self {
        Self {
            template_dir: PathBuf::from("templates"),
            template_extension: ".html".to_string(),
            strict_mode: false,
            escape_html: true,
        }
    }
}

impl HandlebarsConfig {
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_strict_mode(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    pub fn with_escape_html(mut self, escape: bool) -> Self {
        self.escape_html = escape;
        self
    }
}
