//! Feature dependency graph with cycle detection and deterministic ordering.
//!
//! Features are registered by name into a [`GraphBuilder`], then linked once
//! into an immutable [`FeatureGraph`]. Nodes live in a single arena and refer
//! to each other through [`NodeId`] indices, so the graph has no shared
//! ownership and no interior mutability.
//!
//! # Features
//!
//! - Last-registration-wins replacement of features before linking
//! - Unknown dependency and cycle errors aggregated into one failure
//! - Per-node depth (longest dependency chain) and transitive closure,
//!   computed once at link time
//! - Deterministic flattening of several requested features into one
//!   dependency-first list
//!
//! # Example
//!
//! ```
//! use feature_graph::{FeatureSpec, GraphBuilder};
//!
//! let mut builder = GraphBuilder::<&str>::new();
//! let _ = builder.insert(FeatureSpec::new("bottom", Vec::<String>::new(), vec!["b.js"]));
//! let _ = builder.insert(FeatureSpec::new("mid", vec!["bottom"], vec!["m.js"]));
//! let _ = builder.insert(FeatureSpec::new("top", vec!["mid"], vec!["t.js"]));
//!
//! let graph = builder.build().unwrap();
//! let top = graph.find("top").unwrap();
//!
//! let names: Vec<&str> = graph
//!     .transitive_order(&[top])
//!     .into_iter()
//!     .map(|id| graph.node(id).name())
//!     .collect();
//! assert_eq!(names, vec!["bottom", "mid", "top"]);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(unused_results)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

#[cfg(feature = "serde")]
use serde::Serialize;
use tracing::{debug, warn};

/// Node identifier in the feature graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in the graph arena.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

/// Error types for graph linking.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// A feature names a dependency that was never registered
    #[error("feature {feature} depends on unknown feature {dependency}")]
    UnknownDependency {
        /// The declaring feature
        feature: String,
        /// The missing dependency name
        dependency: String,
    },

    /// Cycle detected while completing a node
    #[error("feature dependency cycle detected: {0}")]
    CycleDetected(String),

    /// Every problem found while linking one graph
    #[error("invalid feature graph:\n{}", render_all(.0))]
    Invalid(Vec<GraphError>),
}

impl GraphError {
    /// Flattened human-readable messages, one per underlying problem.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::Invalid(errors) => errors.iter().flat_map(GraphError::messages).collect(),
            other => vec![other.to_string()],
        }
    }
}

fn render_all(errors: &[GraphError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// An unlinked feature as registered: name, raw dependency names and bundles.
#[derive(Debug, Clone)]
pub struct FeatureSpec<B> {
    /// Unique feature name
    pub name: String,
    /// Dependency names as declared
    pub dependencies: Vec<String>,
    /// Opaque per-feature payload, kept in declaration order
    pub bundles: Vec<B>,
}

impl<B> FeatureSpec<B> {
    /// Create a feature spec.
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        dependencies: impl IntoIterator<Item = S>,
        bundles: Vec<B>,
    ) -> Self {
        Self {
            name: name.into(),
            dependencies: dependencies.into_iter().map(Into::into).collect(),
            bundles,
        }
    }
}

/// A linked node of the feature graph.
#[derive(Debug, Clone)]
pub struct FeatureNode<B> {
    id: NodeId,
    name: String,
    bundles: Vec<B>,
    raw_dependencies: Vec<String>,
    // Resolved edges in declaration order; unknown names are skipped
    dependencies: Vec<NodeId>,
    depth: usize,
    // Leaf dependencies first, this node last
    transitive_deps: Vec<NodeId>,
}

impl<B> FeatureNode<B> {
    /// Identifier of this node.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Feature name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bundles in declaration order.
    #[must_use]
    pub fn bundles(&self) -> &[B] {
        &self.bundles
    }

    /// Dependency names exactly as declared.
    #[must_use]
    pub fn raw_dependencies(&self) -> &[String] {
        &self.raw_dependencies
    }

    /// Direct dependencies in declaration order.
    #[must_use]
    pub fn dependencies(&self) -> &[NodeId] {
        &self.dependencies
    }

    /// Length of the longest dependency chain rooted at this node.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Transitive closure, leaf dependencies first and this node last.
    #[must_use]
    pub fn transitive_deps(&self) -> &[NodeId] {
        &self.transitive_deps
    }
}

/// Collects features by name before linking.
///
/// Registering a name twice replaces the earlier feature wholesale. Linking
/// only happens in [`GraphBuilder::build`], so a replacement can never leave
/// linked nodes pointing at stale data.
#[derive(Debug, Clone)]
pub struct GraphBuilder<B> {
    specs: Vec<FeatureSpec<B>>,
    index: HashMap<String, usize>,
}

impl<B> Default for GraphBuilder<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> GraphBuilder<B> {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            specs: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a feature, returning the feature it replaced, if any.
    pub fn insert(&mut self, spec: FeatureSpec<B>) -> Option<FeatureSpec<B>> {
        if let Some(&slot) = self.index.get(&spec.name) {
            warn!("Overriding previously registered feature {}", spec.name);
            return Some(std::mem::replace(&mut self.specs[slot], spec));
        }
        let _ = self.index.insert(spec.name.clone(), self.specs.len());
        self.specs.push(spec);
        None
    }

    /// Whether a feature with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Number of registered features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl<B: Clone> GraphBuilder<B> {
    /// Link every registered feature into a graph.
    ///
    /// Unknown dependencies and cycles are all collected before failing, so
    /// one call reports every configuration problem.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::Invalid` with every unknown-dependency and cycle
    /// error found.
    pub fn build(&self) -> GraphResult<FeatureGraph<B>> {
        let mut errors = Vec::new();
        let mut nodes: Vec<FeatureNode<B>> = Vec::with_capacity(self.specs.len());

        for (slot, spec) in self.specs.iter().enumerate() {
            let mut dependencies = Vec::with_capacity(spec.dependencies.len());
            for dep in &spec.dependencies {
                match self.index.get(dep) {
                    Some(&target) => dependencies.push(NodeId(target)),
                    None => errors.push(GraphError::UnknownDependency {
                        feature: spec.name.clone(),
                        dependency: dep.clone(),
                    }),
                }
            }
            nodes.push(FeatureNode {
                id: NodeId(slot),
                name: spec.name.clone(),
                bundles: spec.bundles.clone(),
                raw_dependencies: spec.dependencies.clone(),
                dependencies,
                depth: 0,
                transitive_deps: Vec::new(),
            });
        }

        let mut graph = FeatureGraph {
            nodes,
            index: self.index.clone(),
        };

        // Completion runs even for nodes with missing dependencies so that
        // cycles are reported in the same pass.
        for slot in 0..graph.nodes.len() {
            match graph.complete(NodeId(slot)) {
                Ok((transitive, depth)) => {
                    let node = &mut graph.nodes[slot];
                    node.transitive_deps = transitive;
                    node.depth = depth;
                }
                Err(e) => errors.push(e),
            }
        }

        if errors.is_empty() {
            debug!("Linked feature graph with {} nodes", graph.nodes.len());
            Ok(graph)
        } else {
            Err(GraphError::Invalid(errors))
        }
    }
}

/// Linked, immutable feature graph.
#[derive(Debug, Clone)]
pub struct FeatureGraph<B> {
    nodes: Vec<FeatureNode<B>>,
    index: HashMap<String, usize>,
}

impl<B> Default for FeatureGraph<B> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<B> FeatureGraph<B> {
    /// Look up a node by feature name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).map(|&slot| NodeId(slot))
    }

    /// Access a node.
    ///
    /// Ids only come from this graph, so they are always in range.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &FeatureNode<B> {
        &self.nodes[id.0]
    }

    /// All nodes in registration order.
    pub fn nodes(&self) -> impl Iterator<Item = &FeatureNode<B>> {
        self.nodes.iter()
    }

    /// All feature names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|node| node.name.as_str())
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Flatten the closures of `requested` into one dependency-first list.
    ///
    /// Requested nodes are visited deepest first; equal depths keep their
    /// position in `requested`. Visiting a deep feature before a shallow one
    /// it already includes keeps the shallow feature's subtree from being
    /// emitted out of order. Every node appears at most once.
    #[must_use]
    pub fn transitive_order(&self, requested: &[NodeId]) -> Vec<NodeId> {
        let mut ranked: Vec<(usize, NodeId)> = requested.iter().copied().enumerate().collect();
        ranked.sort_by(|(pos_a, a), (pos_b, b)| {
            self.node(*b)
                .depth
                .cmp(&self.node(*a).depth)
                .then(pos_a.cmp(pos_b))
        });

        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        for (_, id) in ranked {
            for &dep in &self.node(id).transitive_deps {
                if seen.insert(dep) {
                    ordered.push(dep);
                }
            }
        }
        ordered
    }

    /// Breadth-first completion of one node: its closure and depth.
    ///
    /// Dependencies are queued in reverse declaration order and a node seen
    /// again moves to the end of the working list, so reversing the list
    /// yields dependencies before their dependents.
    fn complete(&self, root: NodeId) -> GraphResult<(Vec<NodeId>, usize)> {
        let mut working: Vec<NodeId> = Vec::new();
        let mut depth = 0;
        let mut queue = VecDeque::new();
        queue.push_back((root, 0usize, vec![root]));

        while let Some((id, level, path)) = queue.pop_front() {
            if let Some(pos) = working.iter().position(|&seen| seen == id) {
                let _ = working.remove(pos);
            }
            working.push(id);
            depth = depth.max(level);

            for &dep in self.node(id).dependencies.iter().rev() {
                let mut next = path.clone();
                next.push(dep);
                if path.contains(&dep) {
                    return Err(GraphError::CycleDetected(self.render_path(&next)));
                }
                queue.push_back((dep, level + 1, next));
            }
        }

        working.reverse();
        Ok((working, depth))
    }

    fn render_path(&self, path: &[NodeId]) -> String {
        path.iter()
            .map(|&id| self.node(id).name.as_str())
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn spec(name: &str, deps: &[&str]) -> FeatureSpec<String> {
        FeatureSpec::new(name, deps.iter().copied(), vec![format!("{name}.js")])
    }

    fn names(graph: &FeatureGraph<String>, ids: &[NodeId]) -> Vec<String> {
        ids.iter().map(|&id| graph.node(id).name().to_string()).collect()
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_node_id_serializes_as_index() {
        let mut builder = GraphBuilder::new();
        let _ = builder.insert(spec("a", &[]));
        let _ = builder.insert(spec("b", &["a"]));
        let graph = builder.build().unwrap();
        let b = graph.find("b").unwrap();
        assert_eq!(serde_json::to_string(&b).unwrap(), "1");
    }

    #[traced_test]
    #[test]
    fn test_reinsert_replaces_and_warns() {
        let mut builder = GraphBuilder::new();
        assert!(builder.insert(spec("core", &[])).is_none());
        let _ = builder.insert(spec("rpc", &["core"]));
        let replaced = builder
            .insert(FeatureSpec::new("core", Vec::<String>::new(), vec!["patched.js".to_string()]))
            .unwrap();
        assert_eq!(replaced.bundles, vec!["core.js"]);
        assert_eq!(builder.len(), 2);
        assert!(logs_contain("Overriding previously registered feature core"));

        let graph = builder.build().unwrap();
        let core = graph.find("core").unwrap();
        assert_eq!(core.index(), 0, "replacement keeps the original slot");
        assert_eq!(graph.node(core).bundles(), &["patched.js".to_string()]);
    }

    #[test]
    fn test_empty_graph() {
        let graph = GraphBuilder::<String>::new().build().unwrap();
        assert!(graph.is_empty());
        assert_eq!(graph.find("anything"), None);
    }

    #[test]
    fn test_chain_depth_and_closure() {
        let mut builder = GraphBuilder::new();
        let _ = builder.insert(spec("bottom", &[]));
        let _ = builder.insert(spec("mid", &["bottom"]));
        let _ = builder.insert(spec("top", &["mid"]));
        let graph = builder.build().unwrap();

        let top = graph.find("top").unwrap();
        assert_eq!(graph.node(top).depth(), 2);
        assert_eq!(graph.node(graph.find("bottom").unwrap()).depth(), 0);
        assert_eq!(
            names(&graph, graph.node(top).transitive_deps()),
            vec!["bottom", "mid", "top"]
        );
    }

    #[test]
    fn test_diamond_emits_shared_dependency_once_and_first() {
        let mut builder = GraphBuilder::new();
        let _ = builder.insert(spec("root", &["left", "right"]));
        let _ = builder.insert(spec("left", &["base"]));
        let _ = builder.insert(spec("right", &["base"]));
        let _ = builder.insert(spec("base", &[]));
        let graph = builder.build().unwrap();

        let root = graph.find("root").unwrap();
        assert_eq!(
            names(&graph, graph.node(root).transitive_deps()),
            vec!["base", "left", "right", "root"]
        );
    }

    #[test]
    fn test_uneven_paths_keep_dependencies_first() {
        // a -> b -> c, and a -> c directly: c must still precede b.
        let mut builder = GraphBuilder::new();
        let _ = builder.insert(spec("a", &["c", "b"]));
        let _ = builder.insert(spec("b", &["c"]));
        let _ = builder.insert(spec("c", &[]));
        let graph = builder.build().unwrap();

        let a = graph.find("a").unwrap();
        assert_eq!(graph.node(a).depth(), 2);
        assert_eq!(names(&graph, graph.node(a).transitive_deps()), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_cycle_detection() {
        let mut builder = GraphBuilder::new();
        let _ = builder.insert(spec("a", &["b"]));
        let _ = builder.insert(spec("b", &["c"]));
        let _ = builder.insert(spec("c", &["a"]));

        let err = builder.build().unwrap_err();
        let messages = err.messages();
        assert!(matches!(err, GraphError::Invalid(_)));
        assert!(messages.iter().any(|m| m.contains("a -> b -> c -> a")));
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let mut builder = GraphBuilder::new();
        let _ = builder.insert(spec("selfish", &["selfish"]));
        let err = builder.build().unwrap_err();
        assert!(err.messages()[0].contains("selfish -> selfish"));
    }

    #[test]
    fn test_cycle_below_root_terminates() {
        let mut builder = GraphBuilder::new();
        let _ = builder.insert(spec("entry", &["x"]));
        let _ = builder.insert(spec("x", &["y"]));
        let _ = builder.insert(spec("y", &["x"]));

        let err = builder.build().unwrap_err();
        assert!(err.messages().iter().any(|m| m.contains("entry -> x -> y -> x")));
    }

    #[test]
    fn test_unknown_dependencies_and_cycles_aggregate() {
        let mut builder = GraphBuilder::new();
        let _ = builder.insert(spec("lonely", &["ghost", "phantom"]));
        let _ = builder.insert(spec("p", &["q"]));
        let _ = builder.insert(spec("q", &["p"]));

        let messages = builder.build().unwrap_err().messages();
        assert!(messages.contains(&"feature lonely depends on unknown feature ghost".to_string()));
        assert!(messages.contains(&"feature lonely depends on unknown feature phantom".to_string()));
        assert!(messages.iter().any(|m| m.contains("cycle")));
    }

    #[test]
    fn test_replacement_keeps_slot_and_takes_new_data() {
        let mut builder = GraphBuilder::new();
        let _ = builder.insert(spec("first", &[]));
        let _ = builder.insert(spec("second", &[]));
        let replaced = builder.insert(FeatureSpec::new("first", ["second"], vec!["v2.js".to_string()]));
        assert_eq!(replaced.unwrap().bundles, vec!["first.js".to_string()]);
        assert_eq!(builder.len(), 2);

        let graph = builder.build().unwrap();
        let first = graph.find("first").unwrap();
        assert_eq!(first.index(), 0);
        assert_eq!(graph.node(first).bundles(), ["v2.js".to_string()]);
        assert_eq!(graph.node(first).raw_dependencies(), ["second".to_string()]);
    }

    #[test]
    fn test_transitive_order_prefers_deeper_then_request_order() {
        let mut builder = GraphBuilder::new();
        let _ = builder.insert(spec("c", &[]));
        let _ = builder.insert(spec("a", &["c"]));
        let _ = builder.insert(spec("x", &[]));
        let _ = builder.insert(spec("y", &[]));
        let graph = builder.build().unwrap();

        let request = [
            graph.find("y").unwrap(),
            graph.find("c").unwrap(),
            graph.find("a").unwrap(),
            graph.find("x").unwrap(),
        ];
        // a is deepest; the depth-0 ties keep their request order.
        assert_eq!(
            names(&graph, &graph.transitive_order(&request)),
            vec!["c", "a", "y", "x"]
        );
    }
}
