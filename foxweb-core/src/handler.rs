// Handler return types and the boxed handler function alias

use crate::request::RequestContext;
use crate::Error;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// What a handler hands to the response resolver.
///
/// One variant per row of the resolution table: an empty reply triggers the
/// auto-template lookup, text and JSON map to fixed content types, and
/// `WithStatus` is the `(body, status)` pair. A `WithStatus` wrapping anything
/// other than `Text` or `Json` is an invalid shape and resolves to 500.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Empty,
    Text(String),
    Json(Value),
    WithStatus(Box<Reply>, u16),
}

impl Reply {
    /// Best-effort stringification for values without a dedicated variant.
    pub fn display<T: std::fmt::Display>(value: T) -> Self {
        Reply::Text(value.to_string())
    }

    /// An empty string counts as no reply at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Reply::Empty => true,
            Reply::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

/// Handler outcome: a value for the resolver, or an explicit abort.
///
/// Aborting with a bare status is expected control flow, so it is a variant
/// here rather than an [`Error`]; the error channel stays reserved for actual
/// failures.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Value(Reply),
    Abort(u16),
}

impl Outcome {
    pub fn empty() -> Self {
        Outcome::Value(Reply::Empty)
    }

    pub fn text(body: impl Into<String>) -> Self {
        Outcome::Value(Reply::Text(body.into()))
    }

    pub fn json(value: Value) -> Self {
        Outcome::Value(Reply::Json(value))
    }

    pub fn with_status(reply: Reply, status: u16) -> Self {
        Outcome::Value(Reply::WithStatus(Box::new(reply), status))
    }

    pub fn abort(status: u16) -> Self {
        Outcome::Abort(status)
    }
}

impl From<Reply> for Outcome {
    fn from(reply: Reply) -> Self {
        Outcome::Value(reply)
    }
}

/// Boxed future returned by a handler, borrowing the request context.
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<Outcome, Error>> + Send + 'a>>;

/// A registered route handler.
///
/// Plain functions fit naturally:
///
/// ```rust,ignore
/// fn home(ctx: &mut RequestContext) -> HandlerFuture<'_> {
///     Box::pin(async move {
///         let name = ctx.param("name").unwrap_or("world").to_string();
///         Ok(Outcome::text(format!("<h1>Hello, {}!</h1>", name)))
///     })
/// }
/// ```
pub type HandlerFn =
    Arc<dyn for<'a> Fn(&'a mut RequestContext) -> HandlerFuture<'a> + Send + Sync>;
