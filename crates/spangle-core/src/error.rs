//! Error types.
//!
//! Build-time errors ([`BuildError`]) abort application construction.
//! Request-time failures travel as [`BoxError`] so the concrete type raised
//! by a handler survives to error-handler lookup and, if nothing claims it,
//! to the transport layer.

use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

use spangle_router::{RenderError, RouterError};

use crate::handler::AllowedMethods;
use crate::request::{Headers, Method};
use crate::response::Response;

/// Type-erased error raised by handlers, hooks and lifecycle callbacks.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Returns the first error in `err`'s source chain (itself included) of
/// type `E`.
///
/// ```
/// use spangle_core::{BoxError, HttpError, find_cause};
///
/// let err: BoxError = Box::new(HttpError::new(418, "teapot"));
/// assert_eq!(find_cause::<HttpError>(&*err).unwrap().status(), 418);
/// ```
#[must_use]
pub fn find_cause<'a, E>(err: &'a (dyn StdError + 'static)) -> Option<&'a E>
where
    E: StdError + 'static,
{
    let mut current = Some(err);
    while let Some(level) = current {
        if let Some(found) = level.downcast_ref::<E>() {
            return Some(found);
        }
        current = level.source();
    }
    None
}

/// An error that renders as an HTTP response.
///
/// When no registered error handler claims it, the dispatcher turns it into
/// a response with this status, message and headers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status}: {message}")]
pub struct HttpError {
    status: u16,
    message: String,
    headers: Headers,
}

impl HttpError {
    /// Creates an error with a status and message.
    #[must_use]
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            headers: Headers::new(),
        }
    }

    /// `404 Not Found` for `path`.
    #[must_use]
    pub fn not_found(path: &str) -> Self {
        Self::new(404, format!("Given path `{path}` was not found."))
    }

    /// `405 Method Not Allowed` carrying an `Allow` header.
    #[must_use]
    pub fn method_not_allowed(method: Method, allowed: &AllowedMethods) -> Self {
        Self::new(405, format!("`{method}` is not allowed."))
            .with_header("allow", allowed.header_value())
    }

    /// Adds a header to the rendered response.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// The status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// The message rendered as the body.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Extra response headers.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Renders into a response.
    #[must_use]
    pub fn to_response(&self) -> Response {
        let mut resp = Response::with_status(self.status).body_text(self.message.clone());
        resp.headers_mut().extend(&self.headers);
        resp
    }
}

/// Component registry and resolution errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentError {
    /// The component was never registered with the current application.
    #[error("component `{component}` is not registered")]
    NotRegistered { component: &'static str },
    /// The component type was registered twice.
    #[error("component `{component}` is already registered")]
    Duplicate { component: &'static str },
    /// Resolution was attempted outside any application frame.
    #[error("no application context is active")]
    NoActiveContext,
}

/// Application construction errors.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A route could not be compiled or inserted.
    #[error("cannot register route `{template}`: {source}")]
    Route {
        template: String,
        #[source]
        source: RouterError,
    },
    /// A component was registered twice.
    #[error(transparent)]
    Component(#[from] ComponentError),
    /// The configured fallback path matches no route.
    #[error("default route `{0}` does not resolve to a handler")]
    DefaultRoute(String),
}

/// Reverse-routing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    /// The handler type is not bound to any route.
    #[error("handler `{0}` is not bound to any route")]
    UnknownHandler(&'static str),
    /// The parameters do not fit the route's pattern.
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Which lifespan phase failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifespanPhase {
    Startup,
    Shutdown,
}

impl fmt::Display for LifespanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Startup => "startup",
            Self::Shutdown => "shutdown",
        })
    }
}

/// A startup or shutdown callback failed.
#[derive(Debug, Error)]
#[error("{phase} failed: {source}")]
pub struct LifespanError {
    /// The phase that was running.
    pub phase: LifespanPhase,
    /// The callback's error.
    #[source]
    pub source: BoxError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("wrapped")]
    struct Wrapped(#[source] HttpError);

    #[test]
    fn test_find_cause_walks_source_chain() {
        let err: BoxError = Box::new(Wrapped(HttpError::new(409, "conflict")));
        let found = find_cause::<HttpError>(&*err).unwrap();
        assert_eq!(found.status(), 409);
        assert!(find_cause::<ComponentError>(&*err).is_none());
    }

    #[test]
    fn test_http_error_renders() {
        let resp = HttpError::new(403, "nope").with_header("x-reason", "test").to_response();
        assert_eq!(resp.status_code(), 403);
        assert_eq!(resp.text(), Some("nope"));
        assert_eq!(resp.headers().get("x-reason"), Some("test"));
    }

    #[test]
    fn test_method_not_allowed_lists_methods() {
        let allowed = AllowedMethods::new(vec![Method::Post, Method::Get]);
        let err = HttpError::method_not_allowed(Method::Put, &allowed);
        assert_eq!(err.status(), 405);
        assert_eq!(err.headers().get("allow"), Some("GET, HEAD, POST"));
    }

    #[test]
    fn test_lifespan_error_message() {
        let err = LifespanError {
            phase: LifespanPhase::Startup,
            source: "database offline".into(),
        };
        assert_eq!(err.to_string(), "startup failed: database offline");
    }
}
