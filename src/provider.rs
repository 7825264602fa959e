//! Service providers
//!
//! Providers encapsulate how a named service value is produced and how long
//! it lives. Uses an enum instead of trait objects so resolution is a single
//! match on the variant.

use crate::Value;
use once_cell::sync::OnceCell;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Marker trait for types that can be wrapped in an [`Object`](crate::Object).
///
/// This is automatically implemented for all types that are `Send + Sync + 'static`.
/// You never need to implement this manually.
pub trait Injectable: Send + Sync + 'static {
    /// Returns the type name for debugging
    #[inline]
    fn type_name_of() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }
}

// Blanket implementation - everything that's Send + Sync + 'static is Injectable
impl<T: Send + Sync + 'static> Injectable for T {}

/// Service lifetime specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// Single value shared across all lookups
    #[default]
    Singleton,

    /// Created on first lookup, then shared
    Lazy,

    /// Created on every lookup
    Transient,
}

/// Type-erased service initializer
type InitFn = Arc<dyn Fn() -> Value + Send + Sync>;

/// Lazy singleton provider - creates the value on first lookup
pub struct LazyProvider {
    init: InitFn,
    value: OnceCell<Value>,
}

impl LazyProvider {
    #[inline]
    pub fn new<V, F>(init: F) -> Self
    where
        V: Into<Value>,
        F: Fn() -> V + Send + Sync + 'static,
    {
        Self {
            init: Arc::new(move || init().into()),
            value: OnceCell::new(),
        }
    }

    /// Get the value, creating it if necessary
    #[inline]
    pub fn resolve(&self, #[allow(unused_variables)] name: &str) -> Value {
        #[cfg(feature = "logging")]
        if self.value.get().is_some() {
            trace!(
                target: "object_factory",
                service = name,
                "Lazy service already initialized, returning cached value"
            );
        }

        self.value
            .get_or_init(|| {
                #[cfg(feature = "logging")]
                debug!(
                    target: "object_factory",
                    service = name,
                    "Lazy service initializing on first access"
                );

                (self.init)()
            })
            .clone()
    }

    /// Check whether the value has been created yet
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.value.get().is_some()
    }
}

/// Transient provider - creates a new value on every lookup
pub struct TransientProvider {
    create: InitFn,
}

impl TransientProvider {
    #[inline]
    pub fn new<V, F>(create: F) -> Self
    where
        V: Into<Value>,
        F: Fn() -> V + Send + Sync + 'static,
    {
        Self {
            create: Arc::new(move || create().into()),
        }
    }

    #[inline]
    pub fn create(&self, #[allow(unused_variables)] name: &str) -> Value {
        #[cfg(feature = "logging")]
        trace!(
            target: "object_factory",
            service = name,
            "Creating new transient service value"
        );

        (self.create)()
    }
}

/// Type-erased provider wrapper for storage
pub(crate) enum AnyProvider {
    /// Eager singleton - value already created
    Singleton(Value),
    /// Lazy singleton - created on first access
    Lazy(LazyProvider),
    /// Transient - new value each time
    Transient(TransientProvider),
}

impl AnyProvider {
    #[inline]
    pub fn singleton(value: impl Into<Value>) -> Self {
        AnyProvider::Singleton(value.into())
    }

    #[inline]
    pub fn lazy<V, F>(init: F) -> Self
    where
        V: Into<Value>,
        F: Fn() -> V + Send + Sync + 'static,
    {
        AnyProvider::Lazy(LazyProvider::new(init))
    }

    #[inline]
    pub fn transient<V, F>(create: F) -> Self
    where
        V: Into<Value>,
        F: Fn() -> V + Send + Sync + 'static,
    {
        AnyProvider::Transient(TransientProvider::new(create))
    }

    /// Resolve the service value
    #[inline]
    pub fn resolve(&self, name: &str) -> Value {
        match self {
            AnyProvider::Singleton(value) => value.clone(),
            AnyProvider::Lazy(p) => p.resolve(name),
            AnyProvider::Transient(p) => p.create(name),
        }
    }

    #[inline]
    pub fn lifetime(&self) -> Lifetime {
        match self {
            AnyProvider::Singleton(_) => Lifetime::Singleton,
            AnyProvider::Lazy(_) => Lifetime::Lazy,
            AnyProvider::Transient(_) => Lifetime::Transient,
        }
    }
}
