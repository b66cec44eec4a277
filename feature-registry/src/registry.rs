use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use feature_graph::{FeatureGraph, GraphBuilder, NodeId};
use feature_loader::{ResourceLoader, ResourceRoots};
use serde::Serialize;
use tracing::{debug, info};

use crate::cache::{CacheKey, ResolutionCache};
use crate::registration::{LocationCollector, load_feature};
use crate::{FeatureBundle, RegistryConfig, RegistryError, RegistryResult, RequestContext, ResourceList};

/// Read-only summary of one registered feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureView {
    /// Node id in the current graph
    pub id: NodeId,
    /// Feature name
    pub name: String,
    /// Longest dependency chain below this feature
    pub depth: usize,
    /// Direct dependencies in declaration order
    pub dependencies: Vec<String>,
    /// Number of bundles over all context types
    pub bundles: usize,
}

/// Registry of features and entry point for resolution queries.
///
/// Registration takes `&mut self` and completes before queries run; queries
/// take `&self` and may run concurrently.
pub struct FeatureRegistry {
    loader: Arc<dyn ResourceLoader>,
    roots: ResourceRoots,
    // Every feature registered so far, relinked on each registration
    builder: GraphBuilder<FeatureBundle>,
    graph: Arc<FeatureGraph<FeatureBundle>>,
    cache: ResolutionCache,
}

impl fmt::Debug for FeatureRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureRegistry")
            .field("roots", &self.roots)
            .field("features", &self.graph.len())
            .field("cached_queries", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl FeatureRegistry {
    /// Empty registry loading scripts with `loader` and bundled descriptors
    /// from `roots`.
    pub fn new(loader: Arc<dyn ResourceLoader>, roots: ResourceRoots) -> Self {
        Self {
            loader,
            roots,
            builder: GraphBuilder::new(),
            graph: Arc::new(FeatureGraph::default()),
            cache: ResolutionCache::new(),
        }
    }

    /// Registry using the configured loader, with the configured locations
    /// registered.
    ///
    /// # Errors
    ///
    /// Returns any error of [`FeatureRegistry::register`].
    pub fn from_config(config: &RegistryConfig) -> RegistryResult<Self> {
        let mut registry = Self::new(Arc::new(config.loader()), config.roots());
        if !config.locations.is_empty() {
            registry.register(&config.locations.join(","))?;
        }
        Ok(registry)
    }

    /// Register every feature found at a comma-separated list of locations.
    ///
    /// All previously registered features are relinked together with the new
    /// ones; a feature registered again under the same name replaces the old
    /// one. On any failure the registry keeps its previous state.
    ///
    /// # Errors
    ///
    /// - `RegistryError::InvalidConfiguration` for missing locations, unknown
    ///   dependencies and cycles, all reported together
    /// - `RegistryError::InvalidPath` when a location cannot be read
    /// - `RegistryError::MalformedDescriptor` for unparseable descriptors
    /// - `RegistryError::ContentRetrieval` for scripts without content
    pub fn register(&mut self, locations: &str) -> RegistryResult<()> {
        let mut collector = LocationCollector::new(&self.roots);
        let mut count = 0usize;
        for location in locations.split(',').map(str::trim).filter(|l| !l.is_empty()) {
            collector.collect(location)?;
            count += 1;
        }
        if count == 0 {
            debug!("No feature locations to register");
            return Ok(());
        }

        let mut builder = self.builder.clone();
        let (sources, missing) = collector.into_parts();
        let loaded = sources.len();
        for source in sources {
            let descriptor = feature_descriptor::parse(&source.base, &source.text).map_err(|e| {
                RegistryError::MalformedDescriptor {
                    location: source.location.clone(),
                    source: e,
                }
            })?;
            debug!("Loading feature {} from {}", descriptor.name, source.location);
            let _ = builder.insert(load_feature(descriptor, self.loader.as_ref())?);
        }

        let graph = match builder.build() {
            Ok(graph) if missing.is_empty() => graph,
            Ok(_) => return Err(RegistryError::InvalidConfiguration(missing)),
            Err(e) => {
                let mut messages = missing;
                messages.extend(e.messages());
                return Err(RegistryError::InvalidConfiguration(messages));
            }
        };
        info!(
            "Registered {} feature descriptors from {} locations ({} features total)",
            loaded,
            count,
            graph.len()
        );
        self.builder = builder;
        self.graph = Arc::new(graph);
        self.cache.clear();
        Ok(())
    }

    /// Resolve requested feature names into an ordered resource list.
    ///
    /// Names are treated as a set in input order. Unknown names are appended
    /// to `unsupported` when it is given. Transitive queries include every
    /// dependency, dependencies first, and are cached per name set,
    /// `unsupported` presence, rendering context and container unless the
    /// context asks to ignore the cache.
    pub fn resolve<S: AsRef<str>>(
        &self,
        ctx: &RequestContext,
        requested: &[S],
        unsupported: Option<&mut Vec<String>>,
        transitive: bool,
    ) -> Arc<ResourceList> {
        let names = unique(requested);
        let wants_unsupported = unsupported.is_some();
        let key = (transitive && !ctx.ignore_cache)
            .then(|| CacheKey::new(names.iter().copied(), wants_unsupported, ctx));

        if let Some(hit) = key.as_ref().and_then(|key| self.cache.get(key)) {
            debug!("Resolution cache hit for {:?}", names);
            return hit;
        }

        let (ids, missing) = self.lookup(&names);
        let ordered = if transitive {
            self.graph.transitive_order(&ids)
        } else {
            ids
        };

        let resources = ordered
            .iter()
            .flat_map(|&id| self.graph.node(id).bundles())
            .filter(|bundle| bundle.serves(ctx))
            .flat_map(|bundle| bundle.resources().iter().cloned())
            .collect();
        let list = Arc::new(ResourceList::new(resources));

        let found_unsupported = !missing.is_empty();
        if let Some(out) = unsupported {
            out.extend(missing);
        }
        if let Some(key) = key {
            if !(wants_unsupported && found_unsupported) {
                self.cache.insert(key, Arc::clone(&list));
            }
        }
        list
    }

    /// Transitive feature names of a request, dependencies first.
    ///
    /// Unknown names are skipped.
    pub fn features_in_order<S: AsRef<str>>(&self, requested: &[S]) -> Vec<String> {
        let (ids, _) = self.lookup(&unique(requested));
        self.graph
            .transitive_order(&ids)
            .into_iter()
            .map(|id| self.graph.node(id).name().to_string())
            .collect()
    }

    /// All registered feature names in registration order.
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        self.graph.names().map(String::from).collect()
    }

    /// Resources of every registered feature served in `ctx`, dependencies
    /// first.
    #[must_use]
    pub fn all_resources(&self, ctx: &RequestContext) -> Arc<ResourceList> {
        self.resolve(ctx, self.feature_names().as_slice(), None, true)
    }

    /// Summary of one feature.
    #[must_use]
    pub fn feature(&self, name: &str) -> Option<FeatureView> {
        let node = self.graph.node(self.graph.find(name)?);
        Some(FeatureView {
            id: node.id(),
            name: node.name().to_string(),
            depth: node.depth(),
            dependencies: node.raw_dependencies().to_vec(),
            bundles: node.bundles().len(),
        })
    }

    /// Bundles of one feature, in declaration order.
    #[must_use]
    pub fn bundles(&self, name: &str) -> Option<&[FeatureBundle]> {
        self.graph.find(name).map(|id| self.graph.node(id).bundles())
    }

    /// Number of registered features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    /// Whether no feature is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Number of cached transitive queries.
    #[must_use]
    pub fn cached_queries(&self) -> usize {
        self.cache.len()
    }

    fn lookup(&self, names: &[&str]) -> (Vec<NodeId>, Vec<String>) {
        let mut ids = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.graph.find(name) {
                Some(id) => ids.push(id),
                None => missing.push((*name).to_string()),
            }
        }
        (ids, missing)
    }
}

/// First occurrence of each name, in input order.
fn unique<S: AsRef<str>>(requested: &[S]) -> Vec<&str> {
    let mut seen = HashSet::new();
    requested
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| seen.insert(*name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_registry_is_shareable() {
        assert_send_sync::<FeatureRegistry>();
        assert_send_sync::<Arc<ResourceList>>();
    }

    #[test]
    fn test_unique_keeps_first_occurrence() {
        assert_eq!(unique(&["b", "a", "b", "c", "a"]), vec!["b", "a", "c"]);
        assert!(unique::<String>(&[]).is_empty());
    }

    #[test]
    fn test_empty_registry_answers_queries() {
        let registry = FeatureRegistry::new(
            Arc::new(feature_loader::DefaultResourceLoader::new(ResourceRoots::new())),
            ResourceRoots::new(),
        );
        let mut unsupported = Vec::new();
        let list = registry.resolve(
            &RequestContext::default(),
            &["core"],
            Some(&mut unsupported),
            true,
        );
        assert!(list.is_empty());
        assert_eq!(unsupported, vec!["core"]);
        assert_eq!(registry.cached_queries(), 0);
        assert!(registry.feature("core").is_none());
        assert!(registry.is_empty());
    }

    #[traced_test]
    #[test]
    fn test_registration_is_logged_and_clears_cache() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("core.xml"),
            "<feature><name>core</name><gadget><script>var core;</script></gadget></feature>",
        )
        .unwrap();
        let mut registry = FeatureRegistry::new(
            Arc::new(feature_loader::DefaultResourceLoader::new(ResourceRoots::new())),
            ResourceRoots::new(),
        );
        let location = temp.path().to_string_lossy().into_owned();

        registry.register(&location).unwrap();
        let _ = registry.resolve(&RequestContext::default(), &["core"], None, true);
        assert_eq!(registry.cached_queries(), 1);

        registry.register(&location).unwrap();
        assert_eq!(registry.cached_queries(), 0);
        assert!(logs_contain("Registered 1 feature descriptors from 1 locations (1 features total)"));
    }
}
