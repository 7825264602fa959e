//! Service containers
//!
//! The factory only needs two capabilities from a service registry: asking
//! whether a name exists and fetching it. [`ServiceContainer`] is that seam;
//! [`ServiceRegistry`] is a ready-made, concurrent implementation.

use crate::provider::{AnyProvider, Lifetime};
use crate::storage::ServiceStorage;
use crate::{FactoryError, Injectable, Object, Result, Value};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Named service lookup used to resolve `services` and `optional_services`.
pub trait ServiceContainer: Send + Sync {
    /// Check whether `name` can be resolved
    fn has(&self, name: &str) -> bool;

    /// Resolve `name`, failing if it is unknown
    fn get(&self, name: &str) -> Result<Value>;
}

impl<C: ServiceContainer + ?Sized> ServiceContainer for Arc<C> {
    #[inline]
    fn has(&self, name: &str) -> bool {
        (**self).has(name)
    }

    #[inline]
    fn get(&self, name: &str) -> Result<Value> {
        (**self).get(name)
    }
}

/// Concurrent, name-keyed service registry.
///
/// Supports hierarchical scopes: a child scope sees every service of its
/// ancestors and may shadow them with local registrations.
///
/// # Examples
///
/// ```rust
/// use object_factory::{ServiceContainer, ServiceRegistry, Value};
///
/// struct Database { url: String }
///
/// let services = ServiceRegistry::new();
/// services.instance("Database", Database { url: "postgres://localhost".into() });
/// services.singleton("SiteName", "Example");
///
/// assert!(services.has("Database"));
/// assert_eq!(services.get("SiteName").unwrap(), Value::from("Example"));
/// assert!(services.get("Cache").is_err());
/// ```
#[derive(Clone)]
pub struct ServiceRegistry {
    storage: Arc<ServiceStorage>,
    depth: u32,
}

impl ServiceRegistry {
    /// Create a new root registry.
    #[inline]
    pub fn new() -> Self {
        #[cfg(feature = "logging")]
        debug!(
            target: "object_factory",
            depth = 0,
            "Creating new root service registry"
        );

        Self {
            storage: Arc::new(ServiceStorage::new()),
            depth: 0,
        }
    }

    /// Create a child scope that inherits from this registry.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use object_factory::{ServiceContainer, ServiceRegistry};
    ///
    /// let root = ServiceRegistry::new();
    /// root.singleton("Config", "production");
    ///
    /// let request = root.scope();
    /// request.singleton("RequestId", "req-123");
    ///
    /// assert!(request.has("Config"));
    /// assert!(!root.has("RequestId"));
    /// ```
    #[inline]
    pub fn scope(&self) -> Self {
        let child_depth = self.depth + 1;

        #[cfg(feature = "logging")]
        debug!(
            target: "object_factory",
            parent_depth = self.depth,
            child_depth = child_depth,
            parent_services = self.storage.len(),
            "Creating child scope from parent registry"
        );

        Self {
            storage: Arc::new(ServiceStorage::with_parent(Arc::clone(&self.storage))),
            depth: child_depth,
        }
    }

    // =========================================================================
    // Registration Methods
    // =========================================================================

    /// Register a value shared across all lookups.
    #[inline]
    pub fn singleton(&self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();

        #[cfg(feature = "logging")]
        debug!(
            target: "object_factory",
            service = %name,
            lifetime = "singleton",
            depth = self.depth,
            "Registering singleton service"
        );

        self.storage.insert(name, AnyProvider::singleton(value));
    }

    /// Register a live instance as a shared [`Object`].
    #[inline]
    pub fn instance<T: Injectable>(&self, name: impl Into<String>, instance: T) {
        self.singleton(name, Object::new(instance));
    }

    /// Register a service created on first lookup, then shared.
    #[inline]
    pub fn lazy<V, F>(&self, name: impl Into<String>, init: F)
    where
        V: Into<Value>,
        F: Fn() -> V + Send + Sync + 'static,
    {
        let name = name.into();

        #[cfg(feature = "logging")]
        debug!(
            target: "object_factory",
            service = %name,
            lifetime = "lazy_singleton",
            depth = self.depth,
            "Registering lazy singleton service (will be created on first access)"
        );

        self.storage.insert(name, AnyProvider::lazy(init));
    }

    /// Register a service created anew on every lookup.
    #[inline]
    pub fn transient<V, F>(&self, name: impl Into<String>, create: F)
    where
        V: Into<Value>,
        F: Fn() -> V + Send + Sync + 'static,
    {
        let name = name.into();

        #[cfg(feature = "logging")]
        debug!(
            target: "object_factory",
            service = %name,
            lifetime = "transient",
            depth = self.depth,
            "Registering transient service (new value on every lookup)"
        );

        self.storage.insert(name, AnyProvider::transient(create));
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    /// Check if a service is registered here or in a parent scope.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.storage.contains_in_chain(name)
    }

    /// Lifetime of a service registered in this scope.
    #[inline]
    pub fn lifetime(&self, name: &str) -> Option<Lifetime> {
        self.storage.lifetime(name)
    }

    /// Number of services in this scope (not including parents).
    #[inline]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Names registered in this scope, sorted.
    pub fn names(&self) -> Vec<String> {
        self.storage.names()
    }

    /// Scope depth (0 = root).
    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Remove a service from this scope.
    #[inline]
    pub fn remove(&self, name: &str) -> bool {
        self.storage.remove(name)
    }

    /// Clear all services from this scope.
    ///
    /// Does not affect parent scopes.
    #[inline]
    pub fn clear(&self) {
        #[cfg(feature = "logging")]
        let count = self.storage.len();

        self.storage.clear();

        #[cfg(feature = "logging")]
        debug!(
            target: "object_factory",
            depth = self.depth,
            services_removed = count,
            "Registry cleared - all services removed from this scope"
        );
    }
}

impl ServiceContainer for ServiceRegistry {
    #[inline]
    fn has(&self, name: &str) -> bool {
        self.contains(name)
    }

    fn get(&self, name: &str) -> Result<Value> {
        match self.storage.resolve_from_chain(name) {
            Some(value) => {
                #[cfg(feature = "logging")]
                trace!(
                    target: "object_factory",
                    service = name,
                    depth = self.depth,
                    "Service resolved"
                );
                Ok(value)
            }
            None => {
                #[cfg(feature = "logging")]
                debug!(
                    target: "object_factory",
                    service = name,
                    depth = self.depth,
                    "Service not found in registry or parent chain"
                );
                Err(FactoryError::ServiceNotFound {
                    name: name.to_string(),
                })
            }
        }
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("service_count", &self.storage.len())
            .field("depth", &self.depth)
            .finish()
    }
}
