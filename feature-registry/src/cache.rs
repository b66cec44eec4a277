//! Resolution cache shared by concurrent queries

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::{RenderingContext, RequestContext, ResourceList};

/// Composite key of a cached transitive resolution.
///
/// The requested names are a set, so their order does not matter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    names: BTreeSet<String>,
    wants_unsupported: bool,
    rendering: RenderingContext,
    container: String,
}

impl CacheKey {
    /// Key for a query of `names` in `ctx`.
    pub fn new<'a>(
        names: impl IntoIterator<Item = &'a str>,
        wants_unsupported: bool,
        ctx: &RequestContext,
    ) -> Self {
        Self {
            names: names.into_iter().map(String::from).collect(),
            wants_unsupported,
            rendering: ctx.rendering,
            container: ctx.container.clone(),
        }
    }
}

/// Concurrent map from query keys to shared resolved lists.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: DashMap<CacheKey, Arc<ResourceList>>,
}

impl ResolutionCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Previously stored list for `key`.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<ResourceList>> {
        self.entries.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Store a list; a concurrent store of the same key simply replaces it.
    pub fn insert(&self, key: CacheKey, list: Arc<ResourceList>) {
        debug!("Caching {} resources for {:?}", list.len(), key.names);
        let _ = self.entries.insert(key, list);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of cached queries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
