//! Feature registry: registration, transitive resolution and result caching.
//!
//! Features are described by XML descriptors naming their dependencies and
//! their script bundles per rendering context. [`FeatureRegistry::register`]
//! loads descriptors from files, directories, index files or bundled
//! resources, loads every script through a [`feature_loader::ResourceLoader`]
//! and links all features into one dependency graph. Queries then turn a set
//! of feature names into an ordered, deduplicated [`ResourceList`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use feature_loader::{DefaultResourceLoader, FeatureResource, ResourceRoots};
//! use feature_registry::{FeatureRegistry, RequestContext};
//!
//! let dir = tempfile::tempdir().unwrap();
//! std::fs::write(
//!     dir.path().join("core.xml"),
//!     "<feature><name>core</name><gadget><script>var core;</script></gadget></feature>",
//! ).unwrap();
//! std::fs::write(
//!     dir.path().join("rpc.xml"),
//!     "<feature><name>rpc</name><dependency>core</dependency>\
//!      <gadget><script>var rpc;</script></gadget></feature>",
//! ).unwrap();
//!
//! let loader = Arc::new(DefaultResourceLoader::new(ResourceRoots::new()));
//! let mut registry = FeatureRegistry::new(loader, ResourceRoots::new());
//! registry.register(&dir.path().to_string_lossy()).unwrap();
//!
//! let list = registry.resolve(&RequestContext::default(), &["rpc"], None, true);
//! let scripts: Vec<_> = list.iter().filter_map(|r| r.content()).collect();
//! assert_eq!(scripts.iter().map(|s| &**s).collect::<Vec<_>>(), vec!["var core;", "var rpc;"]);
//! ```

mod bundle;
pub mod cache;
mod config;
mod context;
mod error;
mod registration;
mod registry;
mod resources;

pub use bundle::{CONTAINER_ATTR, FeatureBundle};
pub use config::RegistryConfig;
pub use context::{DEFAULT_CONTAINER, RenderingContext, RequestContext};
pub use error::{RegistryError, RegistryResult};
pub use registry::{FeatureRegistry, FeatureView};
pub use resources::ResourceList;
