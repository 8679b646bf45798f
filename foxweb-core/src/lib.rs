// Core library for the Foxweb dispatch engine
// Routing, signed cookie sessions, the hook pipeline, response resolution,
// and the per-request dispatcher

pub mod app;
pub mod config;
pub mod error;
pub mod handler;
pub mod hooks;
pub mod http;
pub mod logging;
pub mod request;
pub mod resolver;
pub mod routing;
pub mod server;
pub mod session;
pub mod static_assets;
pub mod templates;

// Re-export commonly used types
pub use app::{App, Dispatcher};
pub use config::AppConfig;
pub use error::{Error, ErrorKind};
pub use handler::{HandlerFn, HandlerFuture, Outcome, Reply};
pub use hooks::{
    AfterHook, AfterHookFuture, BeforeHook, BeforeHookFuture, ErrorHandlers, Recovery, RecoveryFn,
};
pub use http::{HttpMethod, RequestHead, Response, ResponseSink};
pub use request::{buffered_body, empty_body, BodyStream, RequestContext};
pub use routing::{Route, Router};
pub use session::{SessionMap, SessionOptions};
pub use static_assets::{DiskStatic, StaticFiles};
pub use templates::{TemplateEngine, TemplateError};
