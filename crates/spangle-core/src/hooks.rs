//! Request hooks and error handlers.

use std::error::Error as StdError;
use std::sync::Arc;

use crate::error::BoxError;
use crate::handler::{BoxFuture, Exchange, HandlerResult};
use crate::response::Response;
use crate::ws::Session;

/// Result of a hook.
#[derive(Debug)]
pub enum Flow {
    /// Carry on with the chain.
    Continue,
    /// Use this response.
    ///
    /// From a before-hook this skips the handler and the after-hooks. From
    /// an after-hook it replaces the response built so far.
    Respond(Response),
}

/// A hook run before or after every request's handler.
///
/// ```
/// use spangle_core::{BoxError, BoxFuture, Exchange, Flow, Hook};
///
/// struct Stamp;
///
/// impl Hook for Stamp {
///     fn on_request<'a>(&'a self, ex: &'a mut Exchange) -> BoxFuture<'a, Result<Flow, BoxError>> {
///         Box::pin(async move {
///             let id = ex.ctx.request_id().to_string();
///             ex.response.headers_mut().insert("x-request-id", id);
///             Ok(Flow::Continue)
///         })
///     }
/// }
/// ```
pub trait Hook: Send + Sync + 'static {
    /// Called for every HTTP request.
    fn on_request<'a>(&'a self, ex: &'a mut Exchange) -> BoxFuture<'a, Result<Flow, BoxError>>;

    /// Called for every streaming connection, if implemented.
    fn on_ws<'a>(
        &'a self,
        _session: &'a mut Session<'_>,
    ) -> Option<BoxFuture<'a, Result<(), BoxError>>> {
        None
    }
}

/// Turns an error into a response (or closes a streaming connection).
///
/// Both methods return `None` when the handler does not cover that kind
/// of request; lookup then moves on.
pub trait ErrorHandler: Send + Sync + 'static {
    /// Handles an error raised during HTTP dispatch.
    ///
    /// The exchange's response has been reset to an empty `500` beforehand.
    fn on_error<'a>(
        &'a self,
        _ex: &'a mut Exchange,
        _error: &'a BoxError,
    ) -> Option<BoxFuture<'a, HandlerResult>> {
        None
    }

    /// Handles an error raised by a streaming handler.
    fn on_ws_error<'a>(
        &'a self,
        _session: &'a mut Session<'_>,
        _error: &'a BoxError,
    ) -> Option<BoxFuture<'a, Result<(), BoxError>>> {
        None
    }
}

type Matcher = fn(&(dyn StdError + 'static)) -> bool;

fn is<E: StdError + 'static>(err: &(dyn StdError + 'static)) -> bool {
    err.is::<E>()
}

#[derive(Clone)]
struct Registration {
    error_type: &'static str,
    matches: Matcher,
    handler: Arc<dyn ErrorHandler>,
}

/// Error handlers keyed by error type.
///
/// Lookup walks the raised error and then its [`source`](StdError::source)
/// chain, outermost first. At each level the first handler registered for
/// that level's type (and covering the request kind) wins. The catch-all
/// handler is consulted last.
#[derive(Clone, Default)]
pub struct ErrorHandlers {
    registered: Vec<Registration>,
    catch_all: Option<Arc<dyn ErrorHandler>>,
}

impl ErrorHandlers {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for errors of type `E`.
    pub fn handle<E>(&mut self, handler: Arc<dyn ErrorHandler>)
    where
        E: StdError + Send + Sync + 'static,
    {
        self.registered.push(Registration {
            error_type: std::any::type_name::<E>(),
            matches: is::<E>,
            handler,
        });
    }

    /// Registers a handler consulted when no typed handler matches.
    ///
    /// A later call replaces the earlier handler.
    pub fn handle_any(&mut self, handler: Arc<dyn ErrorHandler>) {
        self.catch_all = Some(handler);
    }

    /// Appends another set's registrations after this one's.
    ///
    /// The other set's catch-all is used only if this set has none.
    pub fn merge(&mut self, other: ErrorHandlers) {
        self.registered.extend(other.registered);
        if self.catch_all.is_none() {
            self.catch_all = other.catch_all;
        }
    }

    /// Number of typed registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registered.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registered.is_empty() && self.catch_all.is_none()
    }

    /// Candidate handlers for `error`, most specific first.
    fn candidates<'s>(&'s self, error: &BoxError) -> Vec<&'s Arc<dyn ErrorHandler>> {
        let mut out = Vec::new();
        let mut level: Option<&(dyn StdError + 'static)> = Some(&**error);
        while let Some(current) = level {
            out.extend(
                self.registered
                    .iter()
                    .filter(|reg| (reg.matches)(current))
                    .map(|reg| &reg.handler),
            );
            level = current.source();
        }
        out.extend(self.catch_all.as_ref());
        out
    }

    /// Runs the first handler covering HTTP errors, if any.
    pub(crate) async fn dispatch_http(
        &self,
        ex: &mut Exchange,
        error: &BoxError,
    ) -> Option<HandlerResult> {
        for handler in self.candidates(error) {
            if let Some(fut) = handler.on_error(ex, error) {
                return Some(fut.await);
            }
        }
        None
    }

    /// Runs the first handler covering streaming errors, if any.
    pub(crate) async fn dispatch_ws(
        &self,
        session: &mut Session<'_>,
        error: &BoxError,
    ) -> Option<Result<(), BoxError>> {
        for handler in self.candidates(error) {
            if let Some(fut) = handler.on_ws_error(session, error) {
                return Some(fut.await);
            }
        }
        None
    }
}

impl std::fmt::Debug for ErrorHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let types: Vec<&str> = self.registered.iter().map(|r| r.error_type).collect();
        f.debug_struct("ErrorHandlers")
            .field("types", &types)
            .field("catch_all", &self.catch_all.is_some())
            .finish()
    }
}
