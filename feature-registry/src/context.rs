//! Request context for resolution queries

use std::fmt;

use feature_descriptor::{CONTAINER_CONTEXT, GADGET_CONTEXT};
use serde::{Deserialize, Serialize};

/// Container name used when a request does not name one.
pub const DEFAULT_CONTAINER: &str = "default";

/// What is being rendered; selects bundles by context type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderingContext {
    /// A gadget rendered inside a container
    #[default]
    Gadget,
    /// The container page itself
    Container,
}

impl RenderingContext {
    /// Bundle context type served in this rendering context.
    #[must_use]
    pub fn bundle_type(self) -> &'static str {
        match self {
            Self::Gadget => GADGET_CONTEXT,
            Self::Container => CONTAINER_CONTEXT,
        }
    }
}

impl fmt::Display for RenderingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.bundle_type())
    }
}

/// Per-request parameters of a resolution query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Rendering context
    pub rendering: RenderingContext,
    /// Container the request is served for
    pub container: String,
    /// Skip cache reads and writes
    pub ignore_cache: bool,
    /// Prefer debug content when consuming the result
    pub debug: bool,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(RenderingContext::Gadget)
    }
}

impl RequestContext {
    /// Context for `rendering` in the default container.
    #[must_use]
    pub fn new(rendering: RenderingContext) -> Self {
        Self {
            rendering,
            container: DEFAULT_CONTAINER.to_string(),
            ignore_cache: false,
            debug: false,
        }
    }

    /// Set the container.
    #[must_use]
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    /// Bypass the resolution cache.
    #[must_use]
    pub fn with_ignore_cache(mut self, ignore_cache: bool) -> Self {
        self.ignore_cache = ignore_cache;
        self
    }

    /// Request debug content.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}
