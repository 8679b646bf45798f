//! Application builder and the per-request dispatcher.
//!
//! ```text
//! App::new()
//!     .with_config(config)
//!     .get("/", home)?
//!     .get("/user/{name}", profile)?
//!     .before(require_json)
//!     .build()
//! ```
//!
//! A built app is immutable and is invoked once per request by the transport:
//! favicon and static short-circuits first, then session resolution, route
//! matching, before hooks, the handler, error recovery, response resolution,
//! and finally the after hooks. Exactly one head and one body reach the sink.

use crate::config::AppConfig;
use crate::handler::{HandlerFn, HandlerFuture, Outcome, Reply};
use crate::hooks::{
    AfterHook, AfterHookFuture, BeforeHook, BeforeHookFuture, ErrorHandlers, Recovery, RecoveryFn,
};
use crate::http::{HttpMethod, RequestHead, Response, ResponseSink};
use crate::request::{BodyStream, RequestContext};
use crate::resolver;
use crate::routing::Router;
use crate::session;
use crate::static_assets::{self, StaticFiles};
use crate::templates::TemplateEngine;
use crate::{Error, ErrorKind};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Mutable application builder.
pub struct App {
    config: AppConfig,
    router: Router,
    before: Vec<BeforeHook>,
    after: Vec<AfterHook>,
    errors: ErrorHandlers,
    templates: Option<Arc<dyn TemplateEngine>>,
    statics: Option<Arc<dyn StaticFiles>>,
}

impl App {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            router: Router::new(),
            before: Vec::new(),
            after: Vec::new(),
            errors: ErrorHandlers::new(),
            templates: None,
            statics: None,
        }
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a handler for a path template under the given methods.
    pub fn route<H>(
        mut self,
        template: &str,
        methods: &[HttpMethod],
        handler: H,
    ) -> Result<Self, Error>
    where
        H: for<'a> Fn(&'a mut RequestContext) -> HandlerFuture<'a> + Send + Sync + 'static,
    {
        let handler: HandlerFn = Arc::new(handler);
        self.router.register(template, methods, handler)?;
        Ok(self)
    }

    pub fn get<H>(self, template: &str, handler: H) -> Result<Self, Error>
    where
        H: for<'a> Fn(&'a mut RequestContext) -> HandlerFuture<'a> + Send + Sync + 'static,
    {
        self.route(template, &[HttpMethod::GET], handler)
    }

    pub fn post<H>(self, template: &str, handler: H) -> Result<Self, Error>
    where
        H: for<'a> Fn(&'a mut RequestContext) -> HandlerFuture<'a> + Send + Sync + 'static,
    {
        self.route(template, &[HttpMethod::POST], handler)
    }

    /// Add a before-request hook; hooks run in registration order.
    pub fn before<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a mut RequestContext) -> BeforeHookFuture<'a> + Send + Sync + 'static,
    {
        self.before.push(Arc::new(hook));
        self
    }

    /// Add an after-request hook; runs regardless of the request's outcome.
    pub fn after<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a mut RequestContext) -> AfterHookFuture<'a> + Send + Sync + 'static,
    {
        self.after.push(Arc::new(hook));
        self
    }

    /// Register a recovery function for a specific error kind.
    pub fn on_error<F>(mut self, kind: ErrorKind, recovery: F) -> Self
    where
        F: Fn(&Error) -> Recovery + Send + Sync + 'static,
    {
        self.errors.register(kind, Arc::new(recovery) as RecoveryFn);
        self
    }

    /// Register a catch-all recovery function.
    pub fn on_any_error<F>(mut self, recovery: F) -> Self
    where
        F: Fn(&Error) -> Recovery + Send + Sync + 'static,
    {
        self.errors.register_catch_all(Arc::new(recovery) as RecoveryFn);
        self
    }

    pub fn templates(mut self, engine: impl TemplateEngine + 'static) -> Self {
        self.templates = Some(Arc::new(engine));
        self
    }

    pub fn static_files(mut self, provider: impl StaticFiles + 'static) -> Self {
        self.statics = Some(Arc::new(provider));
        self
    }

    /// The reverse map accumulated so far, for wiring template helpers.
    pub fn reverse_routes(&self) -> HashMap<String, String> {
        self.router.reverse_map().clone()
    }

    /// Freeze the builder into an immutable dispatcher.
    pub fn build(self) -> Dispatcher {
        Dispatcher {
            session_options: self.config.session_options(),
            config: self.config,
            router: self.router,
            before: self.before,
            after: self.after,
            errors: self.errors,
            templates: self.templates,
            statics: self.statics,
        }
    }

    /// Build and serve on the default hyper transport.
    pub async fn run(self, addr: impl tokio::net::ToSocketAddrs) -> std::io::Result<()> {
        crate::server::serve(Arc::new(self.build()), addr).await
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable per-request orchestrator, safe to share across tasks.
pub struct Dispatcher {
    config: AppConfig,
    session_options: session::SessionOptions,
    router: Router,
    before: Vec<BeforeHook>,
    after: Vec<AfterHook>,
    errors: ErrorHandlers,
    templates: Option<Arc<dyn TemplateEngine>>,
    statics: Option<Arc<dyn StaticFiles>>,
}

impl Dispatcher {
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Reverse-path construction; unknown endpoints yield `/`.
    pub fn url_for(&self, endpoint: &str, values: &HashMap<String, String>) -> String {
        self.router.url_for(endpoint, values)
    }

    /// Render a template through the configured engine.
    pub fn render(&self, name: &str, context: &Value) -> Result<String, Error> {
        match &self.templates {
            Some(engine) => engine.render(name, context).map_err(Error::from),
            None => Err(Error::TemplateNotFound(name.to_string())),
        }
    }

    /// Process one request and emit the response through the sink.
    pub async fn dispatch(
        &self,
        head: RequestHead,
        body: BodyStream,
        sink: &mut dyn ResponseSink,
    ) -> Result<(), Error> {
        let response = self.handle(head, body).await;
        sink.send_head(response.status, &response.headers).await?;
        sink.send_body(&response.body).await
    }

    /// Process one request into a buffered response.
    pub async fn handle(&self, head: RequestHead, body: BodyStream) -> Response {
        let method = head.method.clone();
        let path = head.path.clone();

        // Browser favicon probes get an empty 204 instead of a noisy 404.
        if path == "/favicon.ico" {
            return Response::favicon();
        }

        // Static assets bypass sessions, routing, and templates entirely.
        if let Some(response) = self.try_static(&path).await {
            return response;
        }

        let mut ctx = RequestContext::new(
            head,
            body,
            self.config.session_cookie_name.clone(),
        );
        self.resolve_session(&mut ctx);

        let (handler, params) = match self.router.find(&method, &path) {
            Some(found) => found,
            None => {
                tracing::debug!(method = %method, path = %path, "no route matched");
                return Response::not_found_page();
            }
        };
        ctx.params = params;

        let response = self.run_pipeline(handler, &mut ctx).await;

        // After hooks observe the context but can never change the response.
        for hook in &self.after {
            if let Err(e) = hook(&mut ctx).await {
                tracing::warn!(
                    method = %method,
                    path = %path,
                    error = %e,
                    "after-request hook failed"
                );
            }
        }

        tracing::debug!(method = %method, path = %path, status = response.status, "request completed");
        response
    }

    async fn try_static(&self, path: &str) -> Option<Response> {
        let provider = self.statics.as_ref()?;
        let prefix = &self.config.static_url_prefix;
        if prefix.is_empty() || !path.starts_with(prefix.as_str()) {
            return None;
        }
        let relative = path[prefix.len()..].trim_start_matches('/');
        let bytes = provider.read(relative).await?;
        Some(Response::static_file(
            bytes,
            static_assets::content_type_for(path),
        ))
    }

    /// Verify and decode the session cookie. Never fails the request: an
    /// absent, malformed, or tampered cookie leaves the session empty.
    fn resolve_session(&self, ctx: &mut RequestContext) {
        if let Some(raw) = ctx.cookie(&self.config.session_cookie_name) {
            if let Some(map) = session::deserialize(&raw, &self.config.secret_key) {
                ctx.session = map;
            }
        }
    }

    async fn run_pipeline(&self, handler: HandlerFn, ctx: &mut RequestContext) -> Response {
        for hook in &self.before {
            match hook(ctx).await {
                Ok(None) => {}
                Ok(Some(map)) if map.is_empty() => {}
                Ok(Some(map)) => {
                    // A before hook produced a value: 400 JSON, handler skipped.
                    let reply = Reply::WithStatus(Box::new(Reply::Json(Value::Object(map))), 400);
                    return self.resolve(reply, ctx);
                }
                Err(e) => {
                    tracing::error!(
                        method = %ctx.method,
                        path = %ctx.path,
                        error = %e,
                        "before-request hook failed"
                    );
                    return Response::error_page(&e);
                }
            }
        }

        match handler(ctx).await {
            Ok(Outcome::Value(reply)) => self.resolve(reply, ctx),
            Ok(Outcome::Abort(status)) => resolver::resolve_abort(
                status,
                ctx,
                &self.session_options,
                &self.config.secret_key,
            ),
            Err(e) => {
                tracing::error!(
                    method = %ctx.method,
                    path = %ctx.path,
                    error = %e,
                    "handler failed"
                );
                match self.errors.lookup(e.kind()) {
                    Some(recovery) => resolver::resolve_recovery(
                        recovery(&e),
                        ctx,
                        &self.session_options,
                        &self.config.secret_key,
                    ),
                    None => Response::error_page(&e),
                }
            }
        }
    }

    fn resolve(&self, reply: Reply, ctx: &RequestContext) -> Response {
        resolver::resolve(
            reply,
            ctx,
            &self.session_options,
            &self.config.secret_key,
            self.templates.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{buffered_body, empty_body};
    use crate::templates::testing::MapEngine;
    use bytes::Bytes;
    use serde_json::json;

    fn get(path: &str) -> RequestHead {
        RequestHead::new("GET", path, HashMap::new())
    }

    fn get_with_cookie(path: &str, cookie: &str) -> RequestHead {
        let headers = HashMap::from([("cookie".to_string(), cookie.to_string())]);
        RequestHead::new("GET", path, headers)
    }

    fn count_handler(ctx: &mut RequestContext) -> HandlerFuture<'_> {
        Box::pin(async move {
            let count = ctx
                .session
                .get("count")
                .and_then(Value::as_i64)
                .unwrap_or(0)
                + 1;
            ctx.session.insert("count".to_string(), json!(count));
            Ok(Outcome::text(format!("<h1>You visited {} times!</h1>", count)))
        })
    }

    fn clear_handler(ctx: &mut RequestContext) -> HandlerFuture<'_> {
        Box::pin(async move {
            ctx.clear_session();
            Ok(Outcome::text("<h1>Session cleared.</h1>"))
        })
    }

    fn failing_handler(_ctx: &mut RequestContext) -> HandlerFuture<'_> {
        Box::pin(async move { Err(Error::Internal("boom".into())) })
    }

    fn echo_param(ctx: &mut RequestContext) -> HandlerFuture<'_> {
        Box::pin(async move {
            let name = ctx.param("name").unwrap_or("?").to_string();
            Ok(Outcome::text(format!("<h1>Hello, {}!</h1>", name)))
        })
    }

    #[tokio::test]
    async fn test_route_match_and_params() {
        let app = App::new()
            .get("/user/{name}", echo_param)
            .unwrap()
            .build();
        let resp = app.handle(get("/user/bob"), empty_body()).await;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, b"<h1>Hello, bob!</h1>");
    }

    #[tokio::test]
    async fn test_missing_route_is_fixed_404() {
        let app = App::new().build();
        let resp = app.handle(get("/nope"), empty_body()).await;
        assert_eq!(resp.status, 404);
        assert_eq!(resp.body, b"<h1>404 The route does not exist.</h1>");
    }

    #[tokio::test]
    async fn test_favicon_short_circuit() {
        let app = App::new().build();
        let resp = app.handle(get("/favicon.ico"), empty_body()).await;
        assert_eq!(resp.status, 204);
        assert_eq!(resp.header("set-cookie"), None);
    }

    #[tokio::test]
    async fn test_session_set_and_replay() {
        let app = App::new().get("/", count_handler).unwrap().build();

        let first = app.handle(get("/"), empty_body()).await;
        assert_eq!(first.body, b"<h1>You visited 1 times!</h1>");
        let cookie = first.header("set-cookie").unwrap();
        let value = cookie.split(';').next().unwrap();

        let second = app.handle(get_with_cookie("/", value), empty_body()).await;
        assert_eq!(second.body, b"<h1>You visited 2 times!</h1>");
        let second_cookie = second.header("set-cookie").unwrap();
        assert_ne!(cookie, second_cookie);
    }

    #[tokio::test]
    async fn test_tampered_cookie_is_fresh_session() {
        let app = App::new().get("/", count_handler).unwrap().build();
        let first = app.handle(get("/"), empty_body()).await;
        let cookie = first.header("set-cookie").unwrap();
        let value = cookie.split(';').next().unwrap();

        // Flip a character inside the signature.
        let mut tampered = value.to_string();
        let flipped = if tampered.ends_with('0') { '1' } else { '0' };
        tampered.pop();
        tampered.push(flipped);

        let resp = app
            .handle(get_with_cookie("/", &tampered), empty_body())
            .await;
        assert_eq!(resp.body, b"<h1>You visited 1 times!</h1>");
    }

    #[tokio::test]
    async fn test_clear_session_sends_deletion_cookie() {
        let app = App::new()
            .get("/", count_handler)
            .unwrap()
            .get("/clear", clear_handler)
            .unwrap()
            .build();

        let first = app.handle(get("/"), empty_body()).await;
        let value = first
            .header("set-cookie")
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();

        let cleared = app
            .handle(get_with_cookie("/clear", &value), empty_body())
            .await;
        let cookie = cleared.header("set-cookie").unwrap();
        assert!(cookie.contains("deleted"));
        assert!(cookie.contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));
    }

    #[tokio::test]
    async fn test_before_hook_short_circuits_with_400_json() {
        fn deny(_ctx: &mut RequestContext) -> BeforeHookFuture<'_> {
            Box::pin(async move {
                let mut map = serde_json::Map::new();
                map.insert("error".to_string(), json!("denied"));
                Ok(Some(map))
            })
        }
        fn unreachable_handler(_ctx: &mut RequestContext) -> HandlerFuture<'_> {
            Box::pin(async move { panic!("handler must not run") })
        }

        let app = App::new()
            .get("/", unreachable_handler)
            .unwrap()
            .before(deny)
            .build();
        let resp = app.handle(get("/"), empty_body()).await;
        assert_eq!(resp.status, 400);
        assert_eq!(resp.header("content-type"), Some("application/json"));
        assert_eq!(resp.body, br#"{"error":"denied"}"#);
    }

    #[tokio::test]
    async fn test_before_hook_empty_map_continues() {
        fn noop(_ctx: &mut RequestContext) -> BeforeHookFuture<'_> {
            Box::pin(async move { Ok(Some(serde_json::Map::new())) })
        }
        fn ok(_ctx: &mut RequestContext) -> HandlerFuture<'_> {
            Box::pin(async move { Ok(Outcome::text("ran")) })
        }

        let app = App::new().get("/", ok).unwrap().before(noop).build();
        let resp = app.handle(get("/"), empty_body()).await;
        assert_eq!(resp.body, b"ran");
    }

    #[tokio::test]
    async fn test_before_hook_failure_is_500() {
        fn explode(_ctx: &mut RequestContext) -> BeforeHookFuture<'_> {
            Box::pin(async move { Err(Error::Internal("hook down".into())) })
        }
        fn ok(_ctx: &mut RequestContext) -> HandlerFuture<'_> {
            Box::pin(async move { Ok(Outcome::text("ran")) })
        }

        let app = App::new().get("/", ok).unwrap().before(explode).build();
        let resp = app.handle(get("/"), empty_body()).await;
        assert_eq!(resp.status, 500);
        assert!(String::from_utf8_lossy(&resp.body).contains("hook down"));
    }

    #[tokio::test]
    async fn test_after_hook_runs_and_failure_is_swallowed() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        fn observe(_ctx: &mut RequestContext) -> AfterHookFuture<'_> {
            Box::pin(async move {
                CALLS.fetch_add(1, Ordering::SeqCst);
                Err(Error::Internal("after hook down".into()))
            })
        }
        fn ok(_ctx: &mut RequestContext) -> HandlerFuture<'_> {
            Box::pin(async move { Ok(Outcome::text("fine")) })
        }

        let app = App::new().get("/", ok).unwrap().after(observe).build();
        let resp = app.handle(get("/"), empty_body()).await;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, b"fine");
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handler_failure_without_recovery_is_error_page() {
        let app = App::new().get("/", failing_handler).unwrap().build();
        let resp = app.handle(get("/"), empty_body()).await;
        assert_eq!(resp.status, 500);
        let body = String::from_utf8_lossy(&resp.body);
        assert!(body.contains("500 Internal Server Error"));
        assert!(body.contains("boom"));
    }

    #[tokio::test]
    async fn test_handler_failure_with_recovery() {
        let app = App::new()
            .get("/", failing_handler)
            .unwrap()
            .on_error(ErrorKind::Internal, |_| Recovery::Status(503))
            .build();
        let resp = app.handle(get("/"), empty_body()).await;
        assert_eq!(resp.status, 503);
        assert!(resp.body.is_empty());
    }

    #[tokio::test]
    async fn test_handler_abort_status() {
        fn teapot(_ctx: &mut RequestContext) -> HandlerFuture<'_> {
            Box::pin(async move { Ok(Outcome::abort(418)) })
        }
        let app = App::new().get("/", teapot).unwrap().build();
        let resp = app.handle(get("/"), empty_body()).await;
        assert_eq!(resp.status, 418);
        assert!(resp.body.is_empty());
    }

    #[tokio::test]
    async fn test_auto_template_for_empty_reply() {
        fn empty(_ctx: &mut RequestContext) -> HandlerFuture<'_> {
            Box::pin(async move { Ok(Outcome::empty()) })
        }
        let app = App::new()
            .get("/about", empty)
            .unwrap()
            .templates(MapEngine::new(&[("about.html", "<h1>About us</h1>")]))
            .build();
        let resp = app.handle(get("/about"), empty_body()).await;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, b"<h1>About us</h1>");
    }

    #[tokio::test]
    async fn test_static_bypasses_session() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.css"), b"body{}").unwrap();

        let app = App::new()
            .get("/", count_handler)
            .unwrap()
            .static_files(crate::static_assets::DiskStatic::new(dir.path()))
            .build();

        let resp = app.handle(get("/static/app.css"), empty_body()).await;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, b"body{}");
        assert_eq!(resp.header("content-type"), Some("text/css"));
        assert_eq!(resp.header("set-cookie"), None);
    }

    #[tokio::test]
    async fn test_static_miss_falls_through_to_routing() {
        let dir = tempfile::tempdir().unwrap();
        let app = App::new()
            .static_files(crate::static_assets::DiskStatic::new(dir.path()))
            .build();
        let resp = app.handle(get("/static/missing.css"), empty_body()).await;
        assert_eq!(resp.status, 404);
        assert_eq!(resp.body, b"<h1>404 The route does not exist.</h1>");
    }

    #[tokio::test]
    async fn test_post_body_reaches_handler() {
        fn echo(ctx: &mut RequestContext) -> HandlerFuture<'_> {
            Box::pin(async move {
                let value = ctx.json().await?.unwrap_or(Value::Null);
                Ok(Outcome::json(value))
            })
        }
        let app = App::new().post("/echo", echo).unwrap().build();
        let head = RequestHead::new("POST", "/echo", HashMap::new());
        let body = buffered_body(vec![Bytes::from(r#"{"a":"#), Bytes::from("1}")]);
        let resp = app.handle(head, body).await;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, br#"{"a":1}"#);
    }

    #[tokio::test]
    async fn test_url_for_on_built_app() {
        let app = App::new().get("/user/{name}", echo_param).unwrap().build();
        let values = HashMap::from([("name".to_string(), "bob".to_string())]);
        assert_eq!(app.url_for("GET:/user/{name}", &values), "/user/bob");
        assert_eq!(app.url_for("GET:/missing", &HashMap::new()), "/");
    }

    #[tokio::test]
    async fn test_dispatch_drives_sink_once() {
        struct CaptureSink {
            head: Option<(u16, Vec<(String, String)>)>,
            body: Option<Vec<u8>>,
        }

        #[async_trait::async_trait]
        impl ResponseSink for CaptureSink {
            async fn send_head(
                &mut self,
                status: u16,
                headers: &[(String, String)],
            ) -> Result<(), Error> {
                assert!(self.head.is_none(), "head sent twice");
                self.head = Some((status, headers.to_vec()));
                Ok(())
            }

            async fn send_body(&mut self, body: &[u8]) -> Result<(), Error> {
                assert!(self.body.is_none(), "body sent twice");
                self.body = Some(body.to_vec());
                Ok(())
            }
        }

        fn ok(_ctx: &mut RequestContext) -> HandlerFuture<'_> {
            Box::pin(async move { Ok(Outcome::text("sunk")) })
        }

        let app = App::new().get("/", ok).unwrap().build();
        let mut sink = CaptureSink {
            head: None,
            body: None,
        };
        app.dispatch(get("/"), empty_body(), &mut sink)
            .await
            .unwrap();
        assert_eq!(sink.head.unwrap().0, 200);
        assert_eq!(sink.body.unwrap(), b"sunk");
    }
}
