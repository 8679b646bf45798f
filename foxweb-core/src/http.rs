// HTTP request head, response, and transport sink types

use crate::Error;
use async_trait::async_trait;
use std::collections::HashMap;

/// HTTP methods the router understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::HEAD => "HEAD",
            HttpMethod::OPTIONS => "OPTIONS",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The request line and headers as delivered by the transport.
///
/// The body travels separately as a chunk stream; see
/// [`crate::request::BodyStream`].
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: String,
    pub path: String,
    pub query: String,
    /// Header names are normalized to lowercase at construction.
    pub headers: HashMap<String, String>,
}

impl RequestHead {
    /// Build a head from a request target that may still carry a query string.
    pub fn new(
        method: impl Into<String>,
        target: impl AsRef<str>,
        headers: HashMap<String, String>,
    ) -> Self {
        let target = target.as_ref();
        let (path, query) = target
            .split_once('?')
            .map(|(p, q)| (p.to_string(), q.to_string()))
            .unwrap_or_else(|| (target.to_string(), String::new()));

        let headers = headers
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();

        Self {
            method: method.into(),
            path,
            query,
            headers,
        }
    }
}

/// A fully buffered HTTP response.
///
/// Headers are an ordered list, not a map: the resolver may emit several
/// `Set-Cookie` headers and their relative order is observable.
#[derive(Debug)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// 200 text/html response with Content-Length set.
    pub fn html(body: impl Into<String>) -> Self {
        Self::html_with_status(body, 200)
    }

    pub fn html_with_status(body: impl Into<String>, status: u16) -> Self {
        let body = body.into().into_bytes();
        Self {
            status,
            headers: vec![
                ("Content-Type".to_string(), "text/html".to_string()),
                ("Content-Length".to_string(), body.len().to_string()),
            ],
            body,
        }
    }

    /// The fixed route-miss page.
    pub fn not_found_page() -> Self {
        Self::html_with_status("<h1>404 The route does not exist.</h1>", 404)
    }

    /// The generic failure page, embedding the failure text.
    pub fn error_page(err: &Error) -> Self {
        Self::html_with_status(
            format!("<h1>500 Internal Server Error</h1><pre>{}</pre>", err),
            500,
        )
    }

    /// Empty 204 for browser favicon probes.
    pub fn favicon() -> Self {
        Self {
            status: 204,
            headers: vec![
                ("Content-Type".to_string(), "image/x-icon".to_string()),
                ("Content-Length".to_string(), "0".to_string()),
            ],
            body: Vec::new(),
        }
    }

    /// Static asset bytes with a sniffed content type.
    pub fn static_file(body: Vec<u8>, content_type: &str) -> Self {
        Self {
            status: 200,
            headers: vec![
                ("Content-Type".to_string(), content_type.to_string()),
                ("Content-Length".to_string(), body.len().to_string()),
            ],
            body,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First header value with the given name, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Where the dispatcher delivers the finished response: one head, then one body.
#[async_trait]
pub trait ResponseSink: Send {
    async fn send_head(&mut self, status: u16, headers: &[(String, String)]) -> Result<(), Error>;
    async fn send_body(&mut self, body: &[u8]) -> Result<(), Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_head_splits_query() {
        let head = RequestHead::new("GET", "/search?q=rust&q=web", HashMap::new());
        assert_eq!(head.path, "/search");
        assert_eq!(head.query, "q=rust&q=web");
    }

    #[test]
    fn test_head_without_query() {
        let head = RequestHead::new("GET", "/about", HashMap::new());
        assert_eq!(head.path, "/about");
        assert_eq!(head.query, "");
    }

    #[test]
    fn test_head_normalizes_header_names() {
        let mut headers = HashMap::new();
        headers.insert("Cookie".to_string(), "a=1".to_string());
        let head = RequestHead::new("GET", "/", headers);
        assert_eq!(head.headers.get("cookie"), Some(&"a=1".to_string()));
    }

    #[test]
    fn test_html_response_sets_length() {
        let resp = Response::html("<h1>hi</h1>");
        assert_eq!(resp.status, 200);
        assert_eq!(resp.header("content-type"), Some("text/html"));
        assert_eq!(resp.header("Content-Length"), Some("11"));
    }

    #[test]
    fn test_not_found_page_is_fixed() {
        let resp = Response::not_found_page();
        assert_eq!(resp.status, 404);
        assert_eq!(resp.body, b"<h1>404 The route does not exist.</h1>");
    }

    #[test]
    fn test_favicon_is_empty_204() {
        let resp = Response::favicon();
        assert_eq!(resp.status, 204);
        assert!(resp.body.is_empty());
        assert_eq!(resp.header("content-type"), Some("image/x-icon"));
    }

    #[test]
    fn test_method_round_trip() {
        assert_eq!(HttpMethod::GET.as_str(), "GET");
        assert_eq!(HttpMethod::POST.to_string(), "POST");
    }
}
