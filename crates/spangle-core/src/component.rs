//! Component registry.
//!
//! A component is a singleton service shared by every request of one
//! application: database pools, clients, settings. Components are
//! registered once while the application is built and are read-only
//! afterwards. Any interior mutability is the component's own business;
//! they are not meant to be used as per-request or per-session stores.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::context::AppContext;
use crate::error::{BoxError, ComponentError};
use crate::handler::BoxFuture;

/// A shared service with optional lifecycle callbacks.
///
/// `startup` runs once when the application starts and `shutdown` once
/// when it stops, both inside the application's context so they may
/// resolve other components. No ordering between components is guaranteed.
pub trait Component: Send + Sync + 'static {
    /// Called once during application startup.
    fn startup<'a>(&'a self, _app: &'a AppContext) -> BoxFuture<'a, Result<(), BoxError>> {
        Box::pin(async { Ok(()) })
    }

    /// Called once during application shutdown.
    fn shutdown<'a>(&'a self, _app: &'a AppContext) -> BoxFuture<'a, Result<(), BoxError>> {
        Box::pin(async { Ok(()) })
    }
}

struct Entry {
    name: &'static str,
    instance: Arc<dyn Any + Send + Sync>,
    lifecycle: Arc<dyn Component>,
}

/// Type-keyed component instances.
#[derive(Default)]
pub struct ComponentRegistry {
    entries: HashMap<TypeId, Entry>,
    order: Vec<TypeId>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a component instance.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::Duplicate`] if `C` is already registered.
    pub fn register<C: Component>(&mut self, component: C) -> Result<(), ComponentError> {
        let name = std::any::type_name::<C>();
        let id = TypeId::of::<C>();
        if self.entries.contains_key(&id) {
            return Err(ComponentError::Duplicate { component: name });
        }
        let shared = Arc::new(component);
        self.entries.insert(
            id,
            Entry {
                name,
                instance: shared.clone(),
                lifecycle: shared,
            },
        );
        self.order.push(id);
        tracing::debug!(component = name, "component registered");
        Ok(())
    }

    /// Returns the instance registered for `C`.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::NotRegistered`] if `C` was never registered.
    pub fn resolve<C: Component>(&self) -> Result<Arc<C>, ComponentError> {
        self.entries
            .get(&TypeId::of::<C>())
            .and_then(|entry| entry.instance.clone().downcast::<C>().ok())
            .ok_or(ComponentError::NotRegistered {
                component: std::any::type_name::<C>(),
            })
    }

    /// Whether `C` is registered.
    #[must_use]
    pub fn contains<C: Component>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<C>())
    }

    /// Number of registered components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Components in registration order, for lifecycle driving.
    pub(crate) fn lifecycles(&self) -> impl Iterator<Item = (&'static str, &Arc<dyn Component>)> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id))
            .map(|entry| (entry.name, &entry.lifecycle))
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.lifecycles().map(|(name, _)| name).collect();
        f.debug_struct("ComponentRegistry")
            .field("components", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct Counter {
        hits: AtomicUsize,
    }
    impl Component for Counter {}

    #[derive(Debug)]
    struct Settings {
        name: &'static str,
    }
    impl Component for Settings {}

    #[test]
    fn test_register_and_resolve() {
        let mut registry = ComponentRegistry::new();
        registry.register(Settings { name: "prod" }).unwrap();
        let settings = registry.resolve::<Settings>().unwrap();
        assert_eq!(settings.name, "prod");
        assert!(registry.contains::<Settings>());
        assert!(!registry.contains::<Counter>());
    }

    #[test]
    fn test_resolve_returns_the_same_instance() {
        let mut registry = ComponentRegistry::new();
        registry.register(Counter::default()).unwrap();
        registry
            .resolve::<Counter>()
            .unwrap()
            .hits
            .fetch_add(1, Ordering::SeqCst);
        let again = registry.resolve::<Counter>().unwrap();
        assert_eq!(again.hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = ComponentRegistry::new();
        registry.register(Counter::default()).unwrap();
        let err = registry.register(Counter::default()).unwrap_err();
        assert!(matches!(err, ComponentError::Duplicate { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_missing_component() {
        let registry = ComponentRegistry::new();
        let err = registry.resolve::<Counter>().unwrap_err();
        assert!(matches!(err, ComponentError::NotRegistered { component } if component.ends_with("Counter")));
    }

    #[test]
    fn test_lifecycles_follow_registration_order() {
        let mut registry = ComponentRegistry::new();
        registry.register(Settings { name: "a" }).unwrap();
        registry.register(Counter::default()).unwrap();
        let names: Vec<_> = registry.lifecycles().map(|(name, _)| name).collect();
        assert!(names[0].ends_with("Settings"));
        assert!(names[1].ends_with("Counter"));
    }
}
