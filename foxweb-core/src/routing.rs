// Route table: path-template compilation, first-match lookup, reverse paths

use crate::handler::HandlerFn;
use crate::{Error, HttpMethod};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// `{name}` placeholders after the template has been regex-escaped.
fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\\\{([A-Za-z_][A-Za-z0-9_]*)\\\}").expect("placeholder pattern is valid")
    })
}

/// `{name}` placeholders in a raw (unescaped) template, whitespace-tolerant.
fn substitution_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}").expect("substitution pattern is valid")
    })
}

/// Compile a path template into an anchored matcher.
///
/// Literal text is escaped, each `{name}` becomes a named capture matching one
/// or more non-slash characters, and the whole pattern is anchored to the full
/// path, so the derivation is deterministic.
pub fn compile_template(template: &str) -> Result<Regex, Error> {
    let escaped = regex::escape(template);
    let with_captures = placeholder_pattern().replace_all(&escaped, "(?P<$1>[^/]+)");
    Regex::new(&format!("^{}$", with_captures))
        .map_err(|e| Error::RouteTemplate(format!("{}: {}", template, e)))
}

/// Substitute `{name}` placeholders with values; unknown names stay in place.
pub fn substitute(template: &str, values: &HashMap<String, String>) -> String {
    substitution_pattern()
        .replace_all(template, |caps: &regex::Captures<'_>| {
            match values.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Route definition with handler
pub struct Route {
    pub method: HttpMethod,
    pub pattern: Regex,
    pub template: String,
    pub handler: HandlerFn,
}

/// Ordered route table plus the reverse map used for path construction.
///
/// Built once at startup and read-only afterwards; lookup scans registration
/// order and returns the first match, with no specificity scoring.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
    reverse: HashMap<String, String>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a template under one or more methods.
    pub fn register(
        &mut self,
        template: &str,
        methods: &[HttpMethod],
        handler: HandlerFn,
    ) -> Result<(), Error> {
        let pattern = compile_template(template)?;
        for method in methods {
            self.routes.push(Route {
                method: *method,
                pattern: pattern.clone(),
                template: template.to_string(),
                handler: handler.clone(),
            });
            self.reverse
                .insert(format!("{}:{}", method, template), template.to_string());
        }
        Ok(())
    }

    /// First route (registration order) whose method and pattern both match.
    pub fn find(
        &self,
        method: &str,
        path: &str,
    ) -> Option<(HandlerFn, HashMap<String, String>)> {
        for route in &self.routes {
            if route.method.as_str() != method {
                continue;
            }
            if let Some(caps) = route.pattern.captures(path) {
                let mut params = HashMap::new();
                for name in route.pattern.capture_names().flatten() {
                    if let Some(m) = caps.name(name) {
                        params.insert(name.to_string(), m.as_str().to_string());
                    }
                }
                return Some((route.handler.clone(), params));
            }
        }
        None
    }

    /// Reverse-path construction from a `METHOD:template` endpoint key.
    ///
    /// Unknown endpoints yield `/` instead of failing, so template rendering
    /// stays robust against missing routes.
    pub fn url_for(&self, endpoint: &str, values: &HashMap<String, String>) -> String {
        match self.reverse.get(endpoint) {
            Some(template) => substitute(template, values),
            None => "/".to_string(),
        }
    }

    /// The `METHOD:template -> template` reverse map, for template helpers.
    pub fn reverse_map(&self) -> &HashMap<String, String> {
        &self.reverse
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
