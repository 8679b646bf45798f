// Foxweb - a minimal request-dispatch web engine
//
// Routes compile to anchored regex matchers, handlers return a tagged reply
// resolved through a fixed decision table, and a signed stateless session
// rides along on a cookie.

// Re-export core functionality
pub use foxweb_core::*;

// Re-export optional crates
#[cfg(feature = "config")]
pub use foxweb_config;

#[cfg(feature = "handlebars")]
pub use foxweb_handlebars;

#[cfg(feature = "testing")]
pub use foxweb_testing;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        App,
        AppConfig,
        BodyStream,
        Dispatcher,
        Error,
        ErrorKind,
        HandlerFuture,
        HttpMethod,
        Outcome,
        Recovery,
        Reply,
        RequestContext,
        RequestHead,
        Response,
        ResponseSink,
        SessionMap,
        TemplateEngine,
    };
}
