//! Blueprints: prefixable bundles of routes, hooks and error handlers.
//!
//! A blueprint is assembled on its own and later folded into an
//! [`AppBuilder`](crate::AppBuilder) (or another blueprint) under a prefix.
//! Routes get the prefix; hooks, error handlers and lifespan callbacks are
//! merged into the parent and apply application-wide.
//!
//! ```
//! use spangle_core::{Blueprint, Handler};
//!
//! #[derive(Default)]
//! struct Tag;
//! impl Handler for Tag {}
//!
//! let images = Blueprint::new().route::<Tag>("/tag/{name}");
//! let api = Blueprint::new().blueprint("/images", images);
//! assert_eq!(api.paths(), vec!["/images/tag/{name}"]);
//! ```

use std::error::Error as StdError;
use std::future::Future;
use std::sync::Arc;

use spangle_router::{Converter, ConverterRegistry, TrailingSlash};

use crate::context::AppContext;
use crate::error::BoxError;
use crate::handler::{BoxFuture, Handler, HandlerSlot};
use crate::hooks::{ErrorHandler, ErrorHandlers, Hook};

/// A startup or shutdown callback.
pub type LifespanFn =
    Arc<dyn Fn(AppContext) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// Per-route registration options.
#[derive(Debug, Clone, Default)]
pub struct RouteOptions {
    pub(crate) converters: ConverterRegistry,
    pub(crate) slash: Option<TrailingSlash>,
}

impl RouteOptions {
    /// No overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a converter visible to this route only, shadowing any
    /// application converter of the same name.
    #[must_use]
    pub fn converter(mut self, name: impl Into<String>, converter: Converter) -> Self {
        self.converters.register(name, converter);
        self
    }

    /// Overrides the application's trailing-slash policy for this route.
    #[must_use]
    pub fn slash(mut self, policy: TrailingSlash) -> Self {
        self.slash = Some(policy);
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RouteSpec {
    pub(crate) template: String,
    pub(crate) slot: HandlerSlot,
    pub(crate) options: RouteOptions,
}

/// A composable set of routes, hooks, error handlers and lifespan callbacks.
#[derive(Clone, Default)]
pub struct Blueprint {
    pub(crate) routes: Vec<RouteSpec>,
    pub(crate) before: Vec<Arc<dyn Hook>>,
    pub(crate) after: Vec<Arc<dyn Hook>>,
    pub(crate) errors: ErrorHandlers,
    pub(crate) startup: Vec<LifespanFn>,
    pub(crate) shutdown: Vec<LifespanFn>,
}

impl Blueprint {
    /// Creates an empty blueprint.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds handler type `H` to `path`.
    ///
    /// A handler type may be bound to several paths; it is instantiated once
    /// per application.
    #[must_use]
    pub fn route<H: Handler + Default>(self, path: impl Into<String>) -> Self {
        self.route_with::<H>(path, RouteOptions::default())
    }

    /// Binds handler type `H` to `path` with per-route options.
    #[must_use]
    pub fn route_with<H: Handler + Default>(
        mut self,
        path: impl Into<String>,
        options: RouteOptions,
    ) -> Self {
        self.routes.push(RouteSpec {
            template: path.into(),
            slot: HandlerSlot::of::<H>(),
            options,
        });
        self
    }

    /// Adds a hook run before every handler.
    #[must_use]
    pub fn before(mut self, hook: impl Hook) -> Self {
        self.before.push(Arc::new(hook));
        self
    }

    /// Adds a hook run after every handler.
    #[must_use]
    pub fn after(mut self, hook: impl Hook) -> Self {
        self.after.push(Arc::new(hook));
        self
    }

    /// Registers an error handler for errors of type `E`.
    #[must_use]
    pub fn handle<E>(mut self, handler: impl ErrorHandler) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.errors.handle::<E>(Arc::new(handler));
        self
    }

    /// Registers the catch-all error handler.
    #[must_use]
    pub fn handle_any(mut self, handler: impl ErrorHandler) -> Self {
        self.errors.handle_any(Arc::new(handler));
        self
    }

    /// Adds a callback run when the application starts.
    #[must_use]
    pub fn on_startup<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(AppContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.startup.push(lifespan_fn(callback));
        self
    }

    /// Adds a callback run when the application stops.
    #[must_use]
    pub fn on_shutdown<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(AppContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.shutdown.push(lifespan_fn(callback));
        self
    }

    /// Nests `child` under `prefix`.
    #[must_use]
    pub fn blueprint(mut self, prefix: &str, child: Blueprint) -> Self {
        self.merge(prefix, child);
        self
    }

    /// Route templates in registration order.
    #[must_use]
    pub fn paths(&self) -> Vec<&str> {
        self.routes.iter().map(|r| r.template.as_str()).collect()
    }

    pub(crate) fn merge(&mut self, prefix: &str, child: Blueprint) {
        for mut spec in child.routes {
            spec.template = combine_paths(prefix, &spec.template);
            self.routes.push(spec);
        }
        self.before.extend(child.before);
        self.after.extend(child.after);
        self.errors.merge(child.errors);
        self.startup.extend(child.startup);
        self.shutdown.extend(child.shutdown);
    }
}

impl std::fmt::Debug for Blueprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blueprint")
            .field("routes", &self.paths())
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .field("errors", &self.errors)
            .field("startup", &self.startup.len())
            .field("shutdown", &self.shutdown.len())
            .finish()
    }
}

pub(crate) fn lifespan_fn<F, Fut>(callback: F) -> LifespanFn
where
    F: Fn(AppContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    Arc::new(move |app| -> BoxFuture<'static, Result<(), BoxError>> { Box::pin(callback(app)) })
}

/// Joins a prefix and a route template.
///
/// Runs of separators collapse to one; a trailing separator on `path` is
/// kept, since it selects the route's trailing-slash variant.
pub(crate) fn combine_paths(prefix: &str, path: &str) -> String {
    let mut out = String::with_capacity(prefix.len() + path.len() + 2);
    for ch in ['/'].into_iter().chain(prefix.chars()).chain(['/']).chain(path.chars()) {
        if ch == '/' && out.ends_with('/') {
            continue;
        }
        out.push(ch);
    }
    out
}

/// Normalizes a mount prefix to `/name/`.
pub(crate) fn normalize_prefix(prefix: &str) -> String {
    let mut out = combine_paths(prefix, "");
    if !out.ends_with('/') {
        out.push('/');
    }
    out
}
