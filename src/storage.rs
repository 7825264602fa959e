//! Concurrent storage for named services
//!
//! Uses DashMap for lock-free concurrent access.

use crate::Value;
use crate::provider::{AnyProvider, Lifetime};
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::Arc;

/// Thread-safe storage for service providers
///
/// Uses `DashMap` with `ahash` for concurrent access.
/// Supports a hierarchical parent chain for scope resolution.
pub(crate) struct ServiceStorage {
    /// Map from service name to provider
    providers: DashMap<String, AnyProvider, RandomState>,
    /// Optional parent storage for hierarchical resolution
    parent: Option<Arc<ServiceStorage>>,
}

impl ServiceStorage {
    /// Create new empty storage.
    ///
    /// 8 shards is plenty for registries that hold tens of services.
    #[inline]
    pub fn new() -> Self {
        Self {
            providers: DashMap::with_capacity_and_hasher_and_shard_amount(
                0,
                RandomState::new(),
                8,
            ),
            parent: None,
        }
    }

    /// Create a child storage that falls back to `parent`.
    #[inline]
    pub fn with_parent(parent: Arc<ServiceStorage>) -> Self {
        Self {
            parent: Some(parent),
            ..Self::new()
        }
    }

    #[inline]
    pub fn insert(&self, name: String, provider: AnyProvider) {
        self.providers.insert(name, provider);
    }

    /// Check if a service exists in this storage only
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Resolve a service from this storage only
    #[inline]
    pub fn resolve(&self, name: &str) -> Option<Value> {
        // Lazy initializers run while this entry's shard is read-locked.
        self.providers.get(name).map(|p| p.resolve(name))
    }

    /// Resolve a service by walking the full parent chain.
    ///
    /// Returns the value from the nearest scope that has it registered.
    pub fn resolve_from_chain(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.resolve(name) {
            return Some(value);
        }

        let mut current = self.parent.as_ref();
        while let Some(storage) = current {
            if let Some(value) = storage.resolve(name) {
                return Some(value);
            }
            current = storage.parent.as_ref();
        }

        None
    }

    /// Check if a service exists in this storage or any parent.
    pub fn contains_in_chain(&self, name: &str) -> bool {
        if self.contains(name) {
            return true;
        }

        let mut current = self.parent.as_ref();
        while let Some(storage) = current {
            if storage.contains(name) {
                return true;
            }
            current = storage.parent.as_ref();
        }

        false
    }

    /// Lifetime of a service registered in this storage
    #[inline]
    pub fn lifetime(&self, name: &str) -> Option<Lifetime> {
        self.providers.get(name).map(|p| p.lifetime())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Clear all services (preserves parent reference)
    #[inline]
    pub fn clear(&self) {
        self.providers.clear();
    }

    #[inline]
    pub fn remove(&self, name: &str) -> bool {
        self.providers.remove(name).is_some()
    }

    /// Names registered in this storage, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }
}

impl Default for ServiceStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ServiceStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceStorage")
            .field("count", &self.len())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}
