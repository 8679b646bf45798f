//! Signed stateless cookie sessions.
//!
//! A session is a flat JSON object carried entirely on the client as
//! `<payload>.<signature>`, where the payload is the compact JSON encoding of
//! the map with sorted keys and the signature is the hex HMAC-SHA256 of the
//! payload under the application secret. Nothing is stored server-side.
//!
//! Decoding fails soft: a missing, malformed, or tampered cookie yields no
//! session rather than an error.

use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Flat key-value session data.
pub type SessionMap = Map<String, Value>;

/// Hex-encoded HMAC-SHA256 of `payload` under `secret`.
pub fn sign(payload: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take any size key");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Encode a session map into a signed cookie value.
///
/// `serde_json`'s object map iterates keys in sorted order, so identical
/// logical sessions always serialize to identical cookie values.
pub fn serialize(map: &SessionMap, secret: &str) -> String {
    let payload = serde_json::to_string(&Value::Object(map.clone()))
        .unwrap_or_else(|_| "{}".to_string());
    let signature = sign(&payload, secret);
    format!("{}.{}", payload, signature)
}

/// Decode and verify a signed cookie value.
///
/// Returns `None` when the separator is missing, the signature does not match
/// under constant-time comparison, or the payload is not a JSON object.
pub fn deserialize(value: &str, secret: &str) -> Option<SessionMap> {
    let (payload, signature) = value.rsplit_once('.')?;
    let expected = sign(payload, secret);
    if !constant_time_compare(signature, &expected) {
        return None;
    }
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Constant-time string comparison to prevent timing attacks
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

/// A `Set-Cookie` value that instructs the browser to drop the session cookie.
pub fn deletion_cookie(cookie_name: &str) -> String {
    format!(
        "{}=deleted; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly",
        cookie_name
    )
}

/// Cookie attributes for the session cookie.
///
/// `Path=/` and `HttpOnly` are always set; the rest follows configuration.
/// Cookie values are never logged.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub cookie_name: String,
    pub secure: bool,
    pub same_site: Option<String>,
    pub permanent: bool,
    pub max_age_secs: u64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            cookie_name: "micropy_session".to_string(),
            secure: false,
            same_site: None,
            permanent: false,
            max_age_secs: 2_678_400, // 31 days
        }
    }
}

impl SessionOptions {
    /// Render the `Set-Cookie` value carrying a signed session.
    pub fn cookie_header(&self, signed_value: &str) -> String {
        let mut header = format!("{}={}; Path=/; HttpOnly", self.cookie_name, signed_value);
        if self.secure {
            header.push_str("; Secure");
        }
        if let Some(same_site) = &self.same_site {
            header.push_str("; SameSite=");
            header.push_str(same_site);
        }
        if self.permanent {
            header.push_str(&format!("; Max-Age={}", self.max_age_secs));
        }
        header
    }

    pub fn deletion_header(&self) -> String {
        deletion_cookie(&self.cookie_name)
    }
}
