//! Application builder and application.
//!
//! ```
//! use spangle_core::{App, AppConfig, BoxFuture, Exchange, Handler, HandlerResult, OnGet, Response};
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
//!
//! let app = App::builder()
//!     .config(AppConfig::new().name("hello"))
//!     .route::<Hello>("/")
//!     .build()
//!     .unwrap();
//! assert_eq!(app.routes()[0].pattern, "/");
//! ```

use serde::Serialize;
use std::any::TypeId;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use spangle_router::{
    Converter, PathParams, RouteEntry, RouteLookup, Router, Segment, TrailingSlash,
};

use crate::blueprint::{Blueprint, LifespanFn, RouteOptions, normalize_prefix};
use crate::component::{Component, ComponentRegistry};
use crate::config::AppConfig;
use crate::context::{AppContext, Frame, RequestContext, enter, enter_sync};
use crate::error::{BoxError, BuildError, ComponentError, LifespanError, LifespanPhase, UrlError};
use crate::handler::{AllowedMethods, Handler};
use crate::hooks::{ErrorHandler, ErrorHandlers, Hook};

/// A route's bound value: the shared handler instance and its allow list.
pub(crate) struct Route {
    pub(crate) type_id: TypeId,
    pub(crate) name: &'static str,
    pub(crate) handler: Arc<dyn Handler>,
    pub(crate) allowed: AllowedMethods,
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("handler", &self.name)
            .field("allowed", &self.allowed)
            .finish_non_exhaustive()
    }
}

type ComponentInstaller =
    Box<dyn FnOnce(&mut ComponentRegistry) -> Result<(), ComponentError> + Send>;

/// One entry of the route table export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteInfo {
    /// Type name of the bound handler.
    pub handler: &'static str,
    /// Canonical pattern, as served.
    pub pattern: String,
    /// Effective trailing-slash policy.
    pub policy: TrailingSlash,
    /// Parsed segments, for code generators.
    pub segments: Vec<Segment>,
}

/// Builder for [`App`].
pub struct AppBuilder {
    config: AppConfig,
    converters: Vec<(String, Converter)>,
    root: Blueprint,
    components: Vec<ComponentInstaller>,
    mounts: Vec<(String, App)>,
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AppBuilder {
    /// Creates a builder with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            converters: Vec::new(),
            root: Blueprint::new(),
            components: Vec::new(),
            mounts: Vec::new(),
        }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers an application-wide converter.
    #[must_use]
    pub fn converter(mut self, name: impl Into<String>, converter: Converter) -> Self {
        self.converters.push((name.into(), converter));
        self
    }

    /// Binds handler type `H` to `path`.
    #[must_use]
    pub fn route<H: Handler + Default>(mut self, path: impl Into<String>) -> Self {
        self.root = self.root.route::<H>(path);
        self
    }

    /// Binds handler type `H` to `path` with per-route options.
    #[must_use]
    pub fn route_with<H: Handler + Default>(
        mut self,
        path: impl Into<String>,
        options: RouteOptions,
    ) -> Self {
        self.root = self.root.route_with::<H>(path, options);
        self
    }

    /// Adds a before-hook.
    #[must_use]
    pub fn before(mut self, hook: impl Hook) -> Self {
        self.root = self.root.before(hook);
        self
    }

    /// Adds an after-hook.
    #[must_use]
    pub fn after(mut self, hook: impl Hook) -> Self {
        self.root = self.root.after(hook);
        self
    }

    /// Registers an error handler for errors of type `E`.
    #[must_use]
    pub fn handle<E>(mut self, handler: impl ErrorHandler) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.root = self.root.handle::<E>(handler);
        self
    }

    /// Registers the catch-all error handler.
    #[must_use]
    pub fn handle_any(mut self, handler: impl ErrorHandler) -> Self {
        self.root = self.root.handle_any(handler);
        self
    }

    /// Folds a blueprint in under `prefix`.
    #[must_use]
    pub fn blueprint(mut self, prefix: &str, blueprint: Blueprint) -> Self {
        self.root.merge(prefix, blueprint);
        self
    }

    /// Registers a component.
    ///
    /// Registering the same type twice makes [`build`](Self::build) fail.
    #[must_use]
    pub fn component<C: Component>(mut self, component: C) -> Self {
        self.components
            .push(Box::new(move |registry| registry.register(component)));
        self
    }

    /// Delegates every request under `prefix` to `app`.
    ///
    /// Mounts are checked before this application's routes, in
    /// registration order. Mounting at an existing prefix replaces it.
    #[must_use]
    pub fn mount(mut self, prefix: &str, app: App) -> Self {
        let prefix = normalize_prefix(prefix);
        match self.mounts.iter_mut().find(|(existing, _)| *existing == prefix) {
            Some(slot) => slot.1 = app,
            None => self.mounts.push((prefix, app)),
        }
        self
    }

    /// Adds a startup callback.
    #[must_use]
    pub fn on_startup<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(AppContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.root = self.root.on_startup(callback);
        self
    }

    /// Adds a shutdown callback.
    #[must_use]
    pub fn on_shutdown<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(AppContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.root = self.root.on_shutdown(callback);
        self
    }

    /// Compiles every route and freezes the application.
    ///
    /// # Errors
    ///
    /// Fails on a malformed template, an unknown converter, a conflicting
    /// registration, a duplicate component, or a default route that
    /// resolves to nothing.
    pub fn build(self) -> Result<App, BuildError> {
        let Self {
            config,
            converters,
            root,
            components: installers,
            mounts,
        } = self;

        let mut components = ComponentRegistry::new();
        for install in installers {
            install(&mut components)?;
        }

        let mut router = Router::with_policy(config.routing);
        for (name, converter) in converters {
            router.register_converter(name, converter);
        }

        let mut handlers: HashMap<TypeId, Arc<dyn Handler>> = HashMap::new();
        for spec in root.routes {
            let handler = Arc::clone(
                handlers
                    .entry(spec.slot.type_id)
                    .or_insert_with(spec.slot.make),
            );
            let route = Route {
                type_id: spec.slot.type_id,
                name: spec.slot.name,
                allowed: AllowedMethods::for_handler(handler.as_ref()),
                handler,
            };
            router
                .insert(
                    &spec.template,
                    route,
                    &spec.options.converters,
                    spec.options.slash,
                )
                .map_err(|source| BuildError::Route {
                    template: spec.template.clone(),
                    source,
                })?;
        }

        if let Some(default) = &config.default_route {
            if !matches!(router.at(default), RouteLookup::Match(_)) {
                return Err(BuildError::DefaultRoute(default.clone()));
            }
        }

        let mut reverse: HashMap<TypeId, RouteEntry> = HashMap::new();
        for (entry, route) in router.routes() {
            reverse
                .entry(route.type_id)
                .or_insert_with(|| entry.clone());
        }

        if config.debug {
            for (entry, route) in router.routes() {
                tracing::debug!(
                    app = %config.name,
                    pattern = %entry.pattern(),
                    policy = %entry.policy(),
                    handler = route.name,
                    allow = %route.allowed.header_value(),
                    "route table"
                );
            }
        }

        let context = AppContext::new(config.name.clone(), components);
        Ok(App {
            inner: Arc::new(AppInner {
                config,
                router,
                reverse,
                before: root.before,
                after: root.after,
                errors: root.errors,
                startup: root.startup,
                shutdown: root.shutdown,
                mounts,
                context,
                next_request_id: AtomicU64::new(0),
            }),
        })
    }
}

pub(crate) struct AppInner {
    pub(crate) config: AppConfig,
    pub(crate) router: Router<Route>,
    reverse: HashMap<TypeId, RouteEntry>,
    pub(crate) before: Vec<Arc<dyn Hook>>,
    pub(crate) after: Vec<Arc<dyn Hook>>,
    pub(crate) errors: ErrorHandlers,
    startup: Vec<LifespanFn>,
    shutdown: Vec<LifespanFn>,
    pub(crate) mounts: Vec<(String, App)>,
    pub(crate) context: AppContext,
    next_request_id: AtomicU64,
}

/// A built application.
///
/// Cheap to clone; clones share routes, handlers and components.
#[derive(Clone)]
pub struct App {
    pub(crate) inner: Arc<AppInner>,
}

impl App {
    /// Starts building an application.
    #[must_use]
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    /// The configuration the application was built with.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// The application's context.
    #[must_use]
    pub fn context(&self) -> &AppContext {
        &self.inner.context
    }

    /// Resolves a component registered with this application.
    ///
    /// # Errors
    ///
    /// [`ComponentError::NotRegistered`] if `C` was never registered.
    pub fn component<C: Component>(&self) -> Result<Arc<C>, ComponentError> {
        self.inner.context.resolve::<C>()
    }

    /// Renders the path of the first route bound to `H`.
    ///
    /// # Errors
    ///
    /// [`UrlError::UnknownHandler`] if `H` is not routed here,
    /// [`UrlError::Render`] if `params` do not fit the pattern.
    pub fn url_for<H: Handler>(&self, params: &PathParams) -> Result<String, UrlError> {
        let entry = self
            .inner
            .reverse
            .get(&TypeId::of::<H>())
            .ok_or(UrlError::UnknownHandler(std::any::type_name::<H>()))?;
        Ok(entry.render(params)?)
    }

    /// The route table, in registration order.
    #[must_use]
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.inner
            .router
            .routes()
            .map(|(entry, route)| RouteInfo {
                handler: route.name,
                pattern: entry.pattern().to_string(),
                policy: entry.policy(),
                segments: entry.pattern().segments().to_vec(),
            })
            .collect()
    }

    /// Runs component `startup` callbacks, then startup hooks.
    ///
    /// # Errors
    ///
    /// Stops at the first failing callback.
    pub async fn startup(&self) -> Result<(), LifespanError> {
        self.lifespan(LifespanPhase::Startup).await
    }

    /// Runs shutdown hooks, then component `shutdown` callbacks.
    ///
    /// # Errors
    ///
    /// Stops at the first failing callback.
    pub async fn shutdown(&self) -> Result<(), LifespanError> {
        self.lifespan(LifespanPhase::Shutdown).await
    }

    async fn lifespan(&self, phase: LifespanPhase) -> Result<(), LifespanError> {
        let app = self.inner.context.clone();
        tracing::info!(app = %app.name(), %phase, "lifespan begin");
        let result = enter(Frame::for_app(app.clone()), async {
            match phase {
                LifespanPhase::Startup => {
                    self.run_components(phase, &app).await?;
                    run_callbacks(&self.inner.startup, &app).await
                }
                LifespanPhase::Shutdown => {
                    run_callbacks(&self.inner.shutdown, &app).await?;
                    self.run_components(phase, &app).await
                }
            }
        })
        .await;
        match result {
            Ok(()) => {
                tracing::info!(app = %app.name(), %phase, "lifespan complete");
                Ok(())
            }
            Err(source) => {
                tracing::error!(app = %app.name(), %phase, error = %source, "lifespan failed");
                Err(LifespanError { phase, source })
            }
        }
    }

    async fn run_components(&self, phase: LifespanPhase, app: &AppContext) -> Result<(), BoxError> {
        for (name, component) in self.inner.context.components().lifecycles() {
            tracing::debug!(component = name, %phase, "component lifecycle");
            match phase {
                LifespanPhase::Startup => component.startup(app).await?,
                LifespanPhase::Shutdown => component.shutdown(app).await?,
            }
        }
        Ok(())
    }

    /// Runs `fut` with this application as the ambient frame.
    pub async fn scope<F: Future>(&self, fut: F) -> F::Output {
        enter(Frame::for_app(self.inner.context.clone()), fut).await
    }

    /// Runs `f` with this application as the ambient frame.
    pub fn sync_scope<R>(&self, f: impl FnOnce() -> R) -> R {
        enter_sync(Frame::for_app(self.inner.context.clone()), f)
    }

    /// Allocates the context for a new request.
    pub(crate) fn next_request(&self) -> RequestContext {
        let id = self.inner.next_request_id.fetch_add(1, Ordering::Relaxed) + 1;
        RequestContext::new(id, self.inner.context.clone())
    }
}

async fn run_callbacks(callbacks: &[LifespanFn], app: &AppContext) -> Result<(), BoxError> {
    for callback in callbacks {
        callback(app.clone()).await?;
    }
    Ok(())
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mounts: Vec<&str> = self.inner.mounts.iter().map(|(p, _)| p.as_str()).collect();
        f.debug_struct("App")
            .field("name", &self.inner.config.name)
            .field("routes", &self.inner.router.len())
            .field("mounts", &mounts)
            .field("errors", &self.inner.errors)
            .finish_non_exhaustive()
    }
}
