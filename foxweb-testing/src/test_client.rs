// In-memory HTTP client driving the dispatcher

use bytes::Bytes;
use foxweb_core::{buffered_body, empty_body, Dispatcher, Error, RequestHead, ResponseSink};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Test client for making requests against a built application
pub struct TestClient {
    app: Arc<Dispatcher>,
}

impl TestClient {
    pub fn new(app: Dispatcher) -> Self {
        Self { app: Arc::new(app) }
    }

    pub fn from_arc(app: Arc<Dispatcher>) -> Self {
        Self { app }
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, &[], Vec::new()).await
    }

    /// Make a GET request with extra headers (e.g. a replayed cookie)
    pub async fn get_with_headers(&self, path: &str, headers: &[(&str, &str)]) -> TestResponse {
        self.request("GET", path, headers, Vec::new()).await
    }

    /// Make a POST request with a raw body
    pub async fn post(&self, path: &str, body: Vec<u8>) -> TestResponse {
        self.request("POST", path, &[], body).await
    }

    /// Make a POST request with a JSON body
    pub async fn post_json<T: serde::Serialize>(&self, path: &str, value: &T) -> TestResponse {
        let body = serde_json::to_vec(value).unwrap_or_default();
        self.request(
            "POST",
            path,
            &[("Content-Type", "application/json")],
            body,
        )
        .await
    }

    /// Make a request with full control over method, headers, and body
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        headers: &[(&str, &str)],
        body: Vec<u8>,
    ) -> TestResponse {
        let headers: HashMap<String, String> = headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let head = RequestHead::new(method, path, headers);
        let stream = if body.is_empty() {
            empty_body()
        } else {
            buffered_body(vec![Bytes::from(body)])
        };

        let mut sink = BufferSink::default();
        self.app
            .dispatch(head, stream, &mut sink)
            .await
            .expect("in-memory sink never fails");
        sink.into_response()
    }
}

/// Captures the two-phase head/body emission into a buffered response.
#[derive(Default)]
struct BufferSink {
    status: Option<u16>,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

#[async_trait::async_trait]
impl ResponseSink for BufferSink {
    async fn send_head(&mut self, status: u16, headers: &[(String, String)]) -> Result<(), Error> {
        assert!(self.status.is_none(), "head sent twice");
        self.status = Some(status);
        self.headers = headers.to_vec();
        Ok(())
    }

    async fn send_body(&mut self, body: &[u8]) -> Result<(), Error> {
        self.body.extend_from_slice(body);
        Ok(())
    }
}

impl BufferSink {
    fn into_response(self) -> TestResponse {
        TestResponse {
            status: self.status.expect("head was never sent"),
            headers: self.headers,
            body: self.body,
        }
    }
}

/// Response captured from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl TestResponse {
    /// First header value with the given name, case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All header values with the given name, in emission order
    pub fn headers_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// The `name=value` part of a `Set-Cookie` header for the given cookie,
    /// ready to replay in a `Cookie` request header
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.headers_all("set-cookie")
            .into_iter()
            .filter_map(|header| header.split(';').next())
            .find(|pair| pair.trim_start().starts_with(&format!("{}=", name)))
            .map(|pair| pair.trim().to_string())
    }

    /// Response body as UTF-8 text
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Response body decoded as JSON
    pub fn json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    /// Assert the response status, returning self for chaining
    pub fn assert_status(self, expected: u16) -> Self {
        assert_eq!(
            self.status,
            expected,
            "expected status {}, got {} (body: {})",
            expected,
            self.status,
            String::from_utf8_lossy(&self.body)
        );
        self
    }
}
