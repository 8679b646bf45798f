//! Handlebars template engine wrapper

use crate::{config::HandlebarsConfig, error::HandlebarsError, Result};
use foxweb_core::templates::{TemplateEngine, TemplateError};
use handlebars::{Context, Handlebars, Helper, HelperResult, Output, RenderContext};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Handlebars template engine
///
/// Templates are registered under their directory-relative file name with the
/// extension kept (`about.html`, `admin/panel.html`), matching the names the
/// dispatcher's auto-template lookup asks for.
pub struct HandlebarsEngine {
    handlebars: Handlebars<'static>,
    config: HandlebarsConfig,
}

impl HandlebarsEngine {
    /// Create an engine and load every template under the configured directory.
    pub fn new(config: HandlebarsConfig) -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(config.strict_mode);
        if !config.escape_html {
            handlebars.register_escape_fn(handlebars::no_escape);
        }

        let mut engine = Self { handlebars, config };

        if !engine.config.template_dir.exists() {
            return Err(HandlebarsError::ConfigError(format!(
                "Template directory not found: {:?}",
                engine.config.template_dir
            )));
        }
        let dir = engine.config.template_dir.clone();
        engine.load_templates_from_dir(&dir)?;
        Ok(engine)
    }

    /// An engine with no template directory; templates are registered by hand.
    pub fn empty(config: HandlebarsConfig) -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(config.strict_mode);
        if !config.escape_html {
            handlebars.register_escape_fn(handlebars::no_escape);
        }
        Self { handlebars, config }
    }

    fn load_templates_from_dir(&mut self, dir: &Path) -> Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                self.load_templates_from_dir(&path)?;
                continue;
            }
            let matches_extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| {
                    ext == self.config.template_extension.trim_start_matches('.')
                });
            if !matches_extension {
                continue;
            }
            let name = path
                .strip_prefix(&self.config.template_dir)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");
            let content = std::fs::read_to_string(&path)?;
            self.handlebars.register_template_string(&name, content)?;
        }
        Ok(())
    }

    /// Register a template from a string
    pub fn register_template(&mut self, name: &str, template: &str) -> Result<()> {
        self.handlebars
            .register_template_string(name, template)
            .map_err(HandlebarsError::from)
    }

    /// Register the `url_for` helper over a `METHOD:template` reverse map.
    ///
    /// `{{url_for "GET:/user/{name}" name="bob"}}` renders `/user/bob`;
    /// unknown endpoints render `/`.
    pub fn register_url_for(&mut self, routes: HashMap<String, String>) {
        self.handlebars.register_helper(
            "url_for",
            Box::new(
                move |h: &Helper,
                      _: &Handlebars,
                      _: &Context,
                      _: &mut RenderContext,
                      out: &mut dyn Output|
                      -> HelperResult {
                    let endpoint = h
                        .param(0)
                        .and_then(|p| p.value().as_str())
                        .unwrap_or_default();
                    let mut values = HashMap::new();
                    for (key, value) in h.hash() {
                        values.insert(key.to_string(), stringify(value.value()));
                    }
                    let path = match routes.get(endpoint) {
                        Some(template) => foxweb_core::routing::substitute(template, &values),
                        None => "/".to_string(),
                    };
                    out.write(&path)?;
                    Ok(())
                },
            ),
        );
    }

    /// Render a registered template with data
    pub fn render_value(&self, name: &str, data: &Value) -> Result<String> {
        if !self.handlebars.has_template(name) {
            return Err(HandlebarsError::TemplateNotFound(name.to_string()));
        }
        self.handlebars.render(name, data).map_err(HandlebarsError::from)
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.handlebars.has_template(name)
    }
}

impl TemplateEngine for HandlebarsEngine {
    fn render(&self, name: &str, context: &Value) -> std::result::Result<String, TemplateError> {
        match self.render_value(name, context) {
            Ok(rendered) => Ok(rendered),
            Err(HandlebarsError::TemplateNotFound(name)) => Err(TemplateError::NotFound(name)),
            Err(other) => Err(TemplateError::Syntax(other.to_string())),
        }
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
