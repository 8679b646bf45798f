//! Response resolution: from a handler's reply to a concrete status,
//! header list, and body.
//!
//! The decision table is evaluated top to bottom, first match wins:
//! empty reply -> auto template; text -> 200 html; JSON -> 200 json;
//! `(body, status)` pairs keep their status; anything else inside a pair is an
//! invalid shape and resolves to 500. Every resolution sets `Content-Length`,
//! merges headers accumulated on the context, and — when the session map is
//! non-empty — appends a freshly signed session cookie.

use crate::handler::Reply;
use crate::hooks::Recovery;
use crate::http::Response;
use crate::request::RequestContext;
use crate::session::{self, SessionOptions};
use crate::templates::{TemplateEngine, TemplateError};
use crate::Error;
use serde_json::Value;

const INVALID_RESPONSE_BODY: &str = "invalid response";
const TEMPLATE_NOT_FOUND_BODY: &str = "template not found";

/// Session-aware headers for a resolved response: the context's accumulated
/// extra headers first (e.g. a deletion cookie from an explicit clear), then a
/// signed session cookie only if the session map is non-empty. Merge order
/// matters: a clear followed by no further session writes must yield the
/// deletion cookie alone.
fn session_headers(
    ctx: &RequestContext,
    options: &SessionOptions,
    secret: &str,
) -> Vec<(String, String)> {
    let mut headers: Vec<(String, String)> = ctx.response_headers().to_vec();
    if !ctx.session.is_empty() {
        let signed = session::serialize(&ctx.session, secret);
        headers.push(("Set-Cookie".to_string(), options.cookie_header(&signed)));
    }
    headers
}

/// Assemble a response in wire order: content type, session headers, length.
fn finish(
    status: u16,
    content_type: &str,
    body: Vec<u8>,
    session_headers: Vec<(String, String)>,
) -> Response {
    let mut headers = vec![("Content-Type".to_string(), content_type.to_string())];
    headers.extend(session_headers);
    headers.push(("Content-Length".to_string(), body.len().to_string()));
    Response {
        status,
        headers,
        body,
    }
}

/// Template name for an empty reply: last non-empty path segment plus
/// `.html`, or `index.html` at the root.
pub fn auto_template_name(path: &str) -> String {
    match path.split('/').rev().find(|segment| !segment.is_empty()) {
        Some(segment) => format!("{}.html", segment),
        None => "index.html".to_string(),
    }
}

/// Resolve a handler reply into a concrete response.
pub fn resolve(
    reply: Reply,
    ctx: &RequestContext,
    options: &SessionOptions,
    secret: &str,
    templates: Option<&dyn TemplateEngine>,
) -> Response {
    let session_headers = session_headers(ctx, options, secret);

    match reply {
        Reply::Empty => resolve_auto_template(ctx, templates, session_headers),
        Reply::Text(body) if body.is_empty() => {
            resolve_auto_template(ctx, templates, session_headers)
        }
        Reply::Text(body) => finish(200, "text/html", body.into_bytes(), session_headers),
        Reply::Json(value) => finish(200, "application/json", encode_json(&value), session_headers),
        Reply::WithStatus(body, status) => match *body {
            Reply::Text(text) => finish(status, "text/html", text.into_bytes(), session_headers),
            Reply::Json(value) => finish(
                status,
                "application/json",
                encode_json(&value),
                session_headers,
            ),
            // A pair whose body is neither text nor a mapping is malformed.
            _ => finish(
                500,
                "text/html",
                INVALID_RESPONSE_BODY.as_bytes().to_vec(),
                session_headers,
            ),
        },
    }
}

/// Resolve an error-handler recovery value.
pub fn resolve_recovery(
    recovery: Recovery,
    ctx: &RequestContext,
    options: &SessionOptions,
    secret: &str,
) -> Response {
    let session_headers = session_headers(ctx, options, secret);
    match recovery {
        Recovery::Text(body) => finish(500, "text/html", body.into_bytes(), session_headers),
        Recovery::Json(value) => finish(
            500,
            "application/json",
            encode_json(&value),
            session_headers,
        ),
        Recovery::Status(status) => finish(status, "text/html", Vec::new(), session_headers),
    }
}

/// Resolve a bare abort status from a handler.
pub fn resolve_abort(
    status: u16,
    ctx: &RequestContext,
    options: &SessionOptions,
    secret: &str,
) -> Response {
    resolve_recovery(Recovery::Status(status), ctx, options, secret)
}

fn resolve_auto_template(
    ctx: &RequestContext,
    templates: Option<&dyn TemplateEngine>,
    session_headers: Vec<(String, String)>,
) -> Response {
    let name = auto_template_name(&ctx.path);
    let Some(engine) = templates else {
        return finish(
            404,
            "text/html",
            TEMPLATE_NOT_FOUND_BODY.as_bytes().to_vec(),
            session_headers,
        );
    };
    match engine.render(&name, &Value::Object(serde_json::Map::new())) {
        Ok(rendered) => finish(200, "text/html", rendered.into_bytes(), session_headers),
        Err(TemplateError::NotFound(_)) => finish(
            404,
            "text/html",
            TEMPLATE_NOT_FOUND_BODY.as_bytes().to_vec(),
            session_headers,
        ),
        Err(TemplateError::Syntax(msg)) => {
            Response::error_page(&Error::TemplateSyntax(msg))
        }
    }
}

fn encode_json(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_else(|_| b"null".to_vec())
}
