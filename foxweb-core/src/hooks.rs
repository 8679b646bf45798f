// Before/after hook registries and the error-recovery table

use crate::request::RequestContext;
use crate::{Error, ErrorKind};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by a before-request hook.
///
/// A non-empty map short-circuits the request as a 400 JSON response; `None`
/// or an empty map lets the pipeline continue.
pub type BeforeHookFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Option<Map<String, Value>>, Error>> + Send + 'a>>;

pub type BeforeHook =
    Arc<dyn for<'a> Fn(&'a mut RequestContext) -> BeforeHookFuture<'a> + Send + Sync>;

/// Boxed future returned by an after-request hook.
pub type AfterHookFuture<'a> = Pin<Box<dyn Future<Output = Result<(), Error>> + Send + 'a>>;

pub type AfterHook =
    Arc<dyn for<'a> Fn(&'a mut RequestContext) -> AfterHookFuture<'a> + Send + Sync>;

/// What an error handler turns a failure into.
///
/// Text becomes a 500 body, a map becomes 500 JSON, and a bare status becomes
/// an empty-bodied response with that status.
#[derive(Debug, Clone, PartialEq)]
pub enum Recovery {
    Text(String),
    Json(Value),
    Status(u16),
}

pub type RecoveryFn = Arc<dyn Fn(&Error) -> Recovery + Send + Sync>;

/// Error-kind to recovery-function table with an optional catch-all.
#[derive(Default, Clone)]
pub struct ErrorHandlers {
    by_kind: HashMap<ErrorKind, RecoveryFn>,
    catch_all: Option<RecoveryFn>,
}

impl ErrorHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: ErrorKind, recovery: RecoveryFn) {
        self.by_kind.insert(kind, recovery);
    }

    pub fn register_catch_all(&mut self, recovery: RecoveryFn) {
        self.catch_all = Some(recovery);
    }

    /// Specific handler for the kind, falling back to the catch-all.
    pub fn lookup(&self, kind: ErrorKind) -> Option<&RecoveryFn> {
        self.by_kind.get(&kind).or(self.catch_all.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty() && self.catch_all.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_prefers_specific_kind() {
        let mut handlers = ErrorHandlers::new();
        handlers.register(
            ErrorKind::Deserialization,
            Arc::new(|_| Recovery::Status(422)),
        );
        handlers.register_catch_all(Arc::new(|_| Recovery::Status(500)));

        let err = Error::Deserialization("bad".into());
        let recovery = handlers.lookup(err.kind()).unwrap()(&err);
        assert_eq!(recovery, Recovery::Status(422));
    }

    #[test]
    fn test_lookup_falls_back_to_catch_all() {
        let mut handlers = ErrorHandlers::new();
        handlers.register_catch_all(Arc::new(|e| Recovery::Text(e.to_string())));

        let err = Error::Internal("boom".into());
        let recovery = handlers.lookup(err.kind()).unwrap()(&err);
        assert_eq!(
            recovery,
            Recovery::Text("Internal server error: boom".to_string())
        );
    }

    #[test]
    fn test_lookup_without_handlers_is_none() {
        let handlers = ErrorHandlers::new();
        assert!(handlers.lookup(ErrorKind::Internal).is_none());
        assert!(handlers.is_empty());
    }
}
