//! Per-request context: head data, lazy body, cookies, session, path params.

use crate::http::RequestHead;
use crate::session::{self, SessionMap};
use crate::Error;
use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::pin::Pin;

/// Body chunks as delivered by the transport.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, Error>> + Send>>;

/// An empty body stream, for requests without one.
pub fn empty_body() -> BodyStream {
    Box::pin(futures_util::stream::empty::<Result<Bytes, Error>>())
}

/// A body stream over pre-buffered chunks.
pub fn buffered_body(chunks: Vec<Bytes>) -> BodyStream {
    Box::pin(futures_util::stream::iter(
        chunks.into_iter().map(Ok::<Bytes, Error>),
    ))
}

/// State owned by the dispatcher for the lifetime of one request.
///
/// The body and the cookie map are materialized at most once; reading the body
/// is the only operation here that suspends.
pub struct RequestContext {
    pub method: String,
    pub path: String,
    query: HashMap<String, Vec<String>>,
    headers: HashMap<String, String>,
    body_stream: Option<BodyStream>,
    body: Option<Bytes>,
    cookie_cache: Option<HashMap<String, String>>,
    /// Path parameters captured by the matched route.
    pub params: HashMap<String, String>,
    /// Session data; an empty map when no valid cookie was presented.
    pub session: SessionMap,
    extra_headers: Vec<(String, String)>,
    session_cookie_name: String,
}

impl RequestContext {
    pub fn new(head: RequestHead, body: BodyStream, session_cookie_name: String) -> Self {
        let query = parse_query(&head.query);
        Self {
            method: head.method,
            path: head.path,
            query,
            headers: head.headers,
            body_stream: Some(body),
            body: None,
            cookie_cache: None,
            params: HashMap::new(),
            session: SessionMap::new(),
            extra_headers: Vec::new(),
            session_cookie_name,
        }
    }

    /// Header value by name, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// First value of a query parameter.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values of a query parameter, in request order.
    pub fn query_all(&self, name: &str) -> &[String] {
        self.query.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Path parameter captured by the matched route.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Cookie map, parsed once from the `Cookie` header.
    ///
    /// Entries split on `;` then on the first `=`, with surrounding whitespace
    /// trimmed; entries without `=` are skipped.
    pub fn cookies(&mut self) -> &HashMap<String, String> {
        let headers = &self.headers;
        self.cookie_cache.get_or_insert_with(|| {
            let mut cookies = HashMap::new();
            if let Some(raw) = headers.get("cookie") {
                for item in raw.split(';') {
                    if let Some((name, value)) = item.split_once('=') {
                        cookies.insert(name.trim().to_string(), value.trim().to_string());
                    }
                }
            }
            cookies
        })
    }

    /// Single cookie value by name.
    pub fn cookie(&mut self, name: &str) -> Option<String> {
        self.cookies().get(name).cloned()
    }

    /// The raw request body, pulled from the transport on first use.
    ///
    /// Suspends while chunks arrive; the concatenated result is cached so
    /// repeated calls never re-read the stream.
    pub async fn body(&mut self) -> Result<&[u8], Error> {
        if self.body.is_none() {
            let mut buf = BytesMut::new();
            if let Some(mut stream) = self.body_stream.take() {
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
            }
            self.body = Some(buf.freeze());
        }
        Ok(self.body.as_deref().unwrap_or(&[]))
    }

    /// Decode the body as JSON; an empty body yields `None`.
    pub async fn json(&mut self) -> Result<Option<Value>, Error> {
        let body = self.body().await?;
        if body.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice(body)
            .map(Some)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Empty the session and queue a cookie-deletion header.
    ///
    /// The deletion header is recorded independently of the session map, so it
    /// is still emitted when the session stays empty for the rest of the
    /// request.
    pub fn clear_session(&mut self) {
        self.session.clear();
        self.extra_headers.push((
            "Set-Cookie".to_string(),
            session::deletion_cookie(&self.session_cookie_name),
        ));
    }

    /// Append an extra response header.
    pub fn add_response_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.extra_headers.push((name.into(), value.into()));
    }

    /// Extra response headers accumulated during the request.
    pub fn response_headers(&self) -> &[(String, String)] {
        &self.extra_headers
    }
}

/// Percent-decoded, multi-valued query parsing.
fn parse_query(query: &str) -> HashMap<String, Vec<String>> {
    let mut params: HashMap<String, Vec<String>> = HashMap::new();
    if query.is_empty() {
        return params;
    }
    let pairs: Vec<(String, String)> =
        serde_urlencoded::from_str(query).unwrap_or_default();
    for (name, value) in pairs {
        params.entry(name).or_default().push(value);
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head(target: &str, headers: &[(&str, &str)]) -> RequestHead {
        let headers = headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RequestHead::new("GET", target, headers)
    }

    fn ctx(target: &str, headers: &[(&str, &str)]) -> RequestContext {
        RequestContext::new(head(target, headers), empty_body(), "micropy_session".into())
    }

    #[test]
    fn test_query_multi_valued() {
        let ctx = ctx("/search?tag=rust&tag=web&page=2", &[]);
        assert_eq!(ctx.query("tag"), Some("rust"));
        assert_eq!(ctx.query_all("tag"), &["rust", "web"]);
        assert_eq!(ctx.query("page"), Some("2"));
        assert_eq!(ctx.query("missing"), None);
    }

    #[test]
    fn test_query_percent_decoding() {
        let ctx = ctx("/search?q=hello%20world", &[]);
        assert_eq!(ctx.query("q"), Some("hello world"));
    }

    #[test]
    fn test_cookie_parsing() {
        let mut ctx = ctx("/", &[("Cookie", "a=1; b = two ; junk; c=x=y")]);
        assert_eq!(ctx.cookie("a"), Some("1".to_string()));
        assert_eq!(ctx.cookie("b"), Some("two".to_string()));
        // Entries without '=' are skipped; the first '=' splits.
        assert_eq!(ctx.cookie("junk"), None);
        assert_eq!(ctx.cookie("c"), Some("x=y".to_string()));
    }

    #[test]
    fn test_no_cookie_header() {
        let mut ctx = ctx("/", &[]);
        assert!(ctx.cookies().is_empty());
    }

    #[tokio::test]
    async fn test_body_concatenates_chunks_and_caches() {
        let body = buffered_body(vec![Bytes::from("hello, "), Bytes::from("world")]);
        let mut ctx = RequestContext::new(head("/", &[]), body, "s".into());
        assert_eq!(ctx.body().await.unwrap(), b"hello, world");
        // Second read comes from the cache, not the (consumed) stream.
        assert_eq!(ctx.body().await.unwrap(), b"hello, world");
    }

    #[tokio::test]
    async fn test_json_empty_body_is_none() {
        let mut ctx = ctx("/", &[]);
        assert_eq!(ctx.json().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_json_malformed_is_error() {
        let body = buffered_body(vec![Bytes::from("{not json")]);
        let mut ctx = RequestContext::new(head("/", &[]), body, "s".into());
        let err = ctx.json().await.unwrap_err();
        assert!(matches!(err, Error::Deserialization(_)));
    }

    #[tokio::test]
    async fn test_json_object_body() {
        let body = buffered_body(vec![Bytes::from(r#"{"x": 1}"#)]);
        let mut ctx = RequestContext::new(head("/", &[]), body, "s".into());
        let value = ctx.json().await.unwrap().unwrap();
        assert_eq!(value["x"], 1);
    }

    #[test]
    fn test_clear_session_queues_deletion_header() {
        let mut ctx = ctx("/", &[]);
        ctx.session
            .insert("user".to_string(), serde_json::json!("bob"));
        ctx.clear_session();
        assert!(ctx.session.is_empty());
        let headers = ctx.response_headers();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].0, "Set-Cookie");
        assert!(headers[0].1.starts_with("micropy_session=deleted;"));
        assert!(headers[0].1.contains("Expires=Thu, 01 Jan 1970"));
    }
}
