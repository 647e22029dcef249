//! Handler capabilities.
//!
//! A handler is a type bound to one or more routes. What it can do is
//! expressed as a set of optional capabilities, one trait per verb, that
//! the dispatcher probes before invoking:
//!
//! ```
//! use spangle_core::{BoxFuture, Exchange, Handler, HandlerResult, OnGet, Response};
//!
//! #[derive(Default)]
//! struct Hello;
//!
//! impl Handler for Hello {
//!     fn as_get(&self) -> Option<&dyn OnGet> {
//!         Some(self)
//!     }
//! }
//!
//! impl OnGet for Hello {
//!     fn on_get<'a>(&'a self, _ex: &'a mut Exchange) -> BoxFuture<'a, HandlerResult> {
//!         Box::pin(async { Ok(Some(Response::ok().body_text("Hello"))) })
//!     }
//! }
//! ```
//!
//! `GET`, `HEAD` and `OPTIONS` are always allowed; `HEAD` runs the `GET`
//! capability and drops the body. Unsafe verbs are allowed only when the
//! handler exposes the matching capability or lists them in
//! [`Handler::extra_methods`].

use std::any::TypeId;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use spangle_router::PathParams;

use crate::context::RequestContext;
use crate::error::BoxError;
use crate::request::{Method, Request};
use crate::response::Response;
use crate::ws::Session;

/// A boxed future that can be sent across threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a handler capability resolves to.
///
/// `Ok(None)` keeps the response carried by the [`Exchange`], which the
/// handler may have filled in place.
pub type HandlerResult = Result<Option<Response>, BoxError>;

/// Everything one HTTP invocation sees.
#[derive(Debug)]
pub struct Exchange {
    /// The incoming request.
    pub request: Request,
    /// The response being built.
    pub response: Response,
    /// Converted path parameters.
    pub params: PathParams,
    /// The request's context (components, request id).
    pub ctx: RequestContext,
}

impl Exchange {
    pub(crate) fn new(request: Request, params: PathParams, ctx: RequestContext) -> Self {
        Self {
            request,
            response: Response::ok(),
            params,
            ctx,
        }
    }
}

macro_rules! capability {
    ($(#[$doc:meta])* $name:ident, $method:ident) => {
        $(#[$doc])*
        pub trait $name: Send + Sync {
            fn $method<'a>(&'a self, ex: &'a mut Exchange) -> BoxFuture<'a, HandlerResult>;
        }
    };
}

capability!(
    /// Runs for every allowed verb, before the verb-specific capability.
    OnRequest,
    on_request
);
capability!(
    /// `GET` (and `HEAD`).
    OnGet,
    on_get
);
capability!(
    /// `POST`.
    OnPost,
    on_post
);
capability!(
    /// `PUT`.
    OnPut,
    on_put
);
capability!(
    /// `DELETE`.
    OnDelete,
    on_delete
);
capability!(
    /// `PATCH`.
    OnPatch,
    on_patch
);

/// Streaming (WebSocket) capability.
pub trait OnWs: Send + Sync {
    fn on_ws<'a>(&'a self, session: &'a mut Session<'_>) -> BoxFuture<'a, Result<(), BoxError>>;
}

/// A routable handler.
///
/// One instance per handler type is built when the application is built
/// (through `Default`) and shared by every request.
pub trait Handler: Send + Sync + 'static {
    fn as_request(&self) -> Option<&dyn OnRequest> {
        None
    }

    fn as_get(&self) -> Option<&dyn OnGet> {
        None
    }

    fn as_post(&self) -> Option<&dyn OnPost> {
        None
    }

    fn as_put(&self) -> Option<&dyn OnPut> {
        None
    }

    fn as_delete(&self) -> Option<&dyn OnDelete> {
        None
    }

    fn as_patch(&self) -> Option<&dyn OnPatch> {
        None
    }

    fn as_ws(&self) -> Option<&dyn OnWs> {
        None
    }

    /// Methods allowed in addition to the ones implied by capabilities.
    fn extra_methods(&self) -> &[Method] {
        &[]
    }
}

/// Runs the capabilities of `handler` that apply to the request's method.
pub(crate) async fn invoke(handler: &dyn Handler, ex: &mut Exchange) -> Result<(), BoxError> {
    let method = ex.request.method();
    if let Some(cap) = handler.as_request() {
        if let Some(resp) = cap.on_request(ex).await? {
            ex.response = resp;
        }
    }

    let produced = match method {
        Method::Get | Method::Head => match handler.as_get() {
            Some(cap) => cap.on_get(ex).await?,
            None => None,
        },
        Method::Post => match handler.as_post() {
            Some(cap) => cap.on_post(ex).await?,
            None => None,
        },
        Method::Put => match handler.as_put() {
            Some(cap) => cap.on_put(ex).await?,
            None => None,
        },
        Method::Delete => match handler.as_delete() {
            Some(cap) => cap.on_delete(ex).await?,
            None => None,
        },
        Method::Patch => match handler.as_patch() {
            Some(cap) => cap.on_patch(ex).await?,
            None => None,
        },
        Method::Options | Method::Trace | Method::Connect => None,
    };
    if let Some(resp) = produced {
        ex.response = resp;
    }
    if method == Method::Head {
        ex.response.clear_body();
    }
    Ok(())
}

/// Allowed methods for a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedMethods {
    methods: Vec<Method>,
}

impl AllowedMethods {
    /// Create a normalized allow list.
    ///
    /// - Always includes `GET`, `HEAD` and `OPTIONS`.
    /// - Sorts and de-duplicates for stable output.
    #[must_use]
    pub fn new(mut methods: Vec<Method>) -> Self {
        methods.extend([Method::Get, Method::Head, Method::Options]);
        methods.sort_by_key(|m| m.order());
        methods.dedup();
        Self { methods }
    }

    /// Derives the allow list from a handler's capabilities.
    #[must_use]
    pub fn for_handler(handler: &dyn Handler) -> Self {
        let mut methods = handler.extra_methods().to_vec();
        if handler.as_post().is_some() {
            methods.push(Method::Post);
        }
        if handler.as_put().is_some() {
            methods.push(Method::Put);
        }
        if handler.as_delete().is_some() {
            methods.push(Method::Delete);
        }
        if handler.as_patch().is_some() {
            methods.push(Method::Patch);
        }
        Self::new(methods)
    }

    /// Access the normalized methods.
    #[must_use]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Check whether a method is allowed.
    #[must_use]
    pub fn contains(&self, method: Method) -> bool {
        self.methods.contains(&method)
    }

    /// Format as an HTTP Allow header value.
    #[must_use]
    pub fn header_value(&self) -> String {
        let names: Vec<&str> = self.methods.iter().map(|m| m.as_str()).collect();
        names.join(", ")
    }
}

/// A handler type waiting to be instantiated by the application builder.
#[derive(Clone, Copy)]
pub(crate) struct HandlerSlot {
    pub(crate) type_id: TypeId,
    pub(crate) name: &'static str,
    pub(crate) make: fn() -> Arc<dyn Handler>,
}

impl HandlerSlot {
    pub(crate) fn of<H: Handler + Default>() -> Self {
        Self {
            type_id: TypeId::of::<H>(),
            name: std::any::type_name::<H>(),
            make: make_handler::<H>,
        }
    }
}

fn make_handler<H: Handler + Default>() -> Arc<dyn Handler> {
    Arc::new(H::default())
}

impl std::fmt::Debug for HandlerSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerSlot")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
