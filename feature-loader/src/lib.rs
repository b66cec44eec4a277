//! Resource loading for feature bundles.
//!
//! A [`ResourceLoader`] turns a script URI plus its merged attributes into a
//! [`FeatureResource`]. The [`DefaultResourceLoader`] understands three kinds
//! of URI:
//!
//! - **`file:`** local files
//! - **`res:`** bundled resources found under the configured [`ResourceRoots`]
//! - **anything else** external URIs, rendered as references or fetched
//!   lazily when marked inline
//!
//! Local and bundled scripts prefer an optimized variant (`name.opt.js`) for
//! normal-mode content and fall back to the plain file, which also serves
//! debug mode.

pub mod clock;
mod loader;
mod resource;
mod roots;
mod uri;

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

pub use clock::{Clock, ManualClock, SystemClock};
pub use loader::{DEFAULT_FETCH_TIMEOUT, DEFAULT_REFRESH_COOLDOWN, DefaultResourceLoader};
pub use resource::StaticResource;
pub use roots::ResourceRoots;
pub use uri::{FetchState, HttpFetcher, LazyContent, UriFetcher, UriResource};

/// Errors raised while loading a resource during registration.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Neither the optimized nor the plain variant could be found
    #[error("problems reading resource {0}: no content found")]
    ContentRetrieval(String),

    /// The file exists but could not be read
    #[error("IO error reading {0}: {1}")]
    Io(PathBuf, std::io::Error),

    /// The URI cannot be mapped to a local path
    #[error("invalid resource URI {0}")]
    InvalidUri(String),
}

/// Result type for resource loading.
pub type LoadResult<T> = Result<T, LoadError>;

/// Errors raised by a [`UriFetcher`].
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The request failed or returned an error status
    #[error("HTTP download failed: {0}")]
    Http(String),

    /// The response body could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A loaded script resource.
///
/// Content accessors return `None` when no content is available, e.g. after
/// a failed lazy fetch.
pub trait FeatureResource: fmt::Debug + Send + Sync {
    /// Normal-mode (optimized) content.
    fn content(&self) -> Option<Arc<str>>;

    /// Debug-mode (unoptimized) content.
    fn debug_content(&self) -> Option<Arc<str>>;

    /// Whether the content is a reference to be emitted as a URL.
    fn is_external(&self) -> bool;

    /// Whether a proxy may cache the content.
    fn is_proxy_cacheable(&self) -> bool;

    /// Resource name, usually its URI.
    fn name(&self) -> &str;

    /// Attributes the resource was declared with.
    fn attributes(&self) -> &HashMap<String, String>;

    /// Content for the requested mode.
    fn content_for(&self, debug: bool) -> Option<Arc<str>> {
        if debug {
            self.debug_content()
        } else {
            self.content()
        }
    }
}

/// Loads script resources by URI.
pub trait ResourceLoader: Send + Sync {
    /// Load the resource at `uri`.
    ///
    /// `attributes` are the bundle attributes overlaid with the resource's
    /// own attributes.
    ///
    /// # Errors
    ///
    /// Returns a `LoadError` when the content cannot be retrieved.
    fn load(
        &self,
        uri: &url::Url,
        attributes: &HashMap<String, String>,
    ) -> LoadResult<Arc<dyn FeatureResource>>;
}
