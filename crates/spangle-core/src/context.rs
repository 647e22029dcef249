//! Application and request contexts, and the ambient frame.
//!
//! Components are reachable two ways:
//!
//! - explicitly, through the [`RequestContext`] carried by every
//!   [`Exchange`](crate::Exchange) and [`Session`](crate::Session), or the
//!   [`AppContext`] handed to lifecycle callbacks;
//! - ambiently, through [`use_component`], for code deep in a call graph
//!   that was not handed a context.
//!
//! The ambient frame is a tokio task-local. The dispatcher sets it for the
//! dynamic extent of one request with [`LocalKey::scope`](tokio::task::LocalKey::scope),
//! so it is released on every exit path, including cancellation: dropping
//! the dispatch future drops the scope. Concurrent requests run in
//! separate scopes and never see each other's frame. Work spawned onto a
//! fresh tokio task does not inherit the frame; wrap it in
//! [`App::scope`](crate::App::scope) if it needs one.

use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::component::{Component, ComponentRegistry};
use crate::error::ComponentError;

struct AppShared {
    name: String,
    components: ComponentRegistry,
}

/// Handle to one application's shared state.
#[derive(Clone)]
pub struct AppContext {
    inner: Arc<AppShared>,
}

impl AppContext {
    pub(crate) fn new(name: String, components: ComponentRegistry) -> Self {
        Self {
            inner: Arc::new(AppShared { name, components }),
        }
    }

    /// The application's configured name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The application's component registry.
    #[must_use]
    pub fn components(&self) -> &ComponentRegistry {
        &self.inner.components
    }

    /// Resolves a component registered with this application.
    pub fn resolve<C: Component>(&self) -> Result<Arc<C>, ComponentError> {
        self.inner.components.resolve::<C>()
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("name", &self.inner.name)
            .field("components", &self.inner.components.len())
            .finish()
    }
}

type Overlay = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

struct RequestShared {
    request_id: u64,
    app: AppContext,
    overrides: RwLock<Overlay>,
}

/// Request-scoped context.
///
/// Cheap to clone; all clones share the same override overlay.
#[derive(Clone)]
pub struct RequestContext {
    inner: Arc<RequestShared>,
}

impl RequestContext {
    pub(crate) fn new(request_id: u64, app: AppContext) -> Self {
        Self {
            inner: Arc::new(RequestShared {
                request_id,
                app,
                overrides: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Returns the unique request identifier.
    ///
    /// Identifiers increase monotonically per application.
    #[must_use]
    pub fn request_id(&self) -> u64 {
        self.inner.request_id
    }

    /// The application serving this request.
    #[must_use]
    pub fn app(&self) -> &AppContext {
        &self.inner.app
    }

    /// Installs a component instance visible only to this request.
    ///
    /// Returns `true` if it replaced an earlier override.
    pub fn override_component<C: Component>(&self, component: C) -> bool {
        self.inner
            .overrides
            .write()
            .insert(TypeId::of::<C>(), Arc::new(component))
            .is_some()
    }

    /// Resolves a component: request overrides first, then the application.
    pub fn resolve<C: Component>(&self) -> Result<Arc<C>, ComponentError> {
        let overridden = self
            .inner
            .overrides
            .read()
            .get(&TypeId::of::<C>())
            .cloned();
        match overridden.and_then(|instance| instance.downcast::<C>().ok()) {
            Some(instance) => Ok(instance),
            None => self.inner.app.resolve::<C>(),
        }
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.inner.request_id)
            .field("app", &self.inner.app.name())
            .field("overrides", &self.inner.overrides.read().len())
            .finish()
    }
}

/// The ambient binding for one request (or one explicit scope).
#[derive(Debug, Clone)]
pub(crate) struct Frame {
    app: AppContext,
    request: Option<RequestContext>,
}

impl Frame {
    pub(crate) fn for_app(app: AppContext) -> Self {
        Self { app, request: None }
    }

    pub(crate) fn for_request(request: RequestContext) -> Self {
        Self {
            app: request.app().clone(),
            request: Some(request),
        }
    }

    fn resolve<C: Component>(&self) -> Result<Arc<C>, ComponentError> {
        match &self.request {
            Some(request) => request.resolve::<C>(),
            None => self.app.resolve::<C>(),
        }
    }
}

tokio::task_local! {
    static FRAME: Frame;
}

/// Runs `fut` with `frame` as the ambient frame.
pub(crate) async fn enter<F: Future>(frame: Frame, fut: F) -> F::Output {
    FRAME.scope(frame, fut).await
}

/// Runs `f` with `frame` as the ambient frame.
pub(crate) fn enter_sync<R>(frame: Frame, f: impl FnOnce() -> R) -> R {
    FRAME.sync_scope(frame, f)
}

/// Resolves a component against the ambient frame.
///
/// Inside a request this sees that request's overrides; inside an
/// [`App::scope`](crate::App::scope) or a lifecycle callback it sees the
/// application registry.
///
/// # Errors
///
/// [`ComponentError::NoActiveContext`] outside any frame,
/// [`ComponentError::NotRegistered`] if the current application lacks `C`.
pub fn use_component<C: Component>() -> Result<Arc<C>, ComponentError> {
    FRAME
        .try_with(Frame::resolve::<C>)
        .map_err(|_| ComponentError::NoActiveContext)?
}

/// Returns the ambient application.
pub fn current_app() -> Result<AppContext, ComponentError> {
    FRAME
        .try_with(|frame| frame.app.clone())
        .map_err(|_| ComponentError::NoActiveContext)
}

/// Returns the ambient request, if the frame belongs to one.
#[must_use]
pub fn current_request() -> Option<RequestContext> {
    FRAME.try_with(|frame| frame.request.clone()).ok().flatten()
}
