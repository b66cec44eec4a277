use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use percent_encoding::percent_decode_str;
use tracing::debug;
use url::Url;

use crate::clock::{Clock, SystemClock};
use crate::resource::StaticResource;
use crate::roots::{ResourceRoots, read_optional};
use crate::uri::{HttpFetcher, LazyContent, UriFetcher, UriResource};
use crate::{FeatureResource, LoadError, LoadResult, ResourceLoader};

/// Timeout applied to external fetches by default.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
/// Minimum delay between two attempts to fetch a failing external resource.
pub const DEFAULT_REFRESH_COOLDOWN: Duration = Duration::from_secs(60);

const INLINE_ATTR: &str = "inline";

/// Loader for `file:`, `res:` and external URIs.
pub struct DefaultResourceLoader {
    roots: ResourceRoots,
    fetcher: Arc<dyn UriFetcher>,
    clock: Arc<dyn Clock>,
    refresh_cooldown: Duration,
}

impl std::fmt::Debug for DefaultResourceLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultResourceLoader")
            .field("roots", &self.roots)
            .field("refresh_cooldown", &self.refresh_cooldown)
            .finish_non_exhaustive()
    }
}

impl DefaultResourceLoader {
    /// Loader for bundled resources under `roots`, fetching external
    /// scripts over HTTP with the default timeout and cooldown.
    pub fn new(roots: ResourceRoots) -> Self {
        Self {
            roots,
            fetcher: Arc::new(HttpFetcher::new(DEFAULT_FETCH_TIMEOUT)),
            clock: Arc::new(SystemClock),
            refresh_cooldown: DEFAULT_REFRESH_COOLDOWN,
        }
    }

    /// Replace the fetcher used for inline external scripts.
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Arc<dyn UriFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Replace the clock driving the refresh cooldown.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Minimum delay before a failed external fetch is retried.
    #[must_use]
    pub fn with_refresh_cooldown(mut self, cooldown: Duration) -> Self {
        self.refresh_cooldown = cooldown;
        self
    }

    /// Search path for bundled resources.
    pub fn roots(&self) -> &ResourceRoots {
        &self.roots
    }

    fn load_file(&self, uri: &Url, attributes: &HashMap<String, String>) -> LoadResult<StaticResource> {
        let path = uri
            .to_file_path()
            .map_err(|()| LoadError::InvalidUri(uri.to_string()))?;
        let content = read_optional(&optimized_path(&path))?;
        let debug_content = read_optional(&path)?;
        StaticResource::dual_mode(uri.as_str(), content, debug_content, attributes.clone())
            .ok_or_else(|| LoadError::ContentRetrieval(uri.to_string()))
    }

    fn load_bundled(&self, uri: &Url, attributes: &HashMap<String, String>) -> LoadResult<StaticResource> {
        let path = percent_decode_str(uri.path())
            .decode_utf8()
            .map_err(|_| LoadError::InvalidUri(uri.to_string()))?;
        let optimized = optimized_path(Path::new(path.as_ref()));
        let content = self.roots.read(&optimized.to_string_lossy())?;
        let debug_content = self.roots.read(&path)?;
        StaticResource::dual_mode(uri.as_str(), content, debug_content, attributes.clone())
            .ok_or_else(|| LoadError::ContentRetrieval(uri.to_string()))
    }

    fn load_uri(&self, uri: &Url, attributes: &HashMap<String, String>) -> UriResource {
        let inline = attributes
            .get(INLINE_ATTR)
            .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
        if inline {
            UriResource::inline(
                uri.clone(),
                attributes.clone(),
                self.fetcher.clone(),
                LazyContent::new(self.clock.clone(), self.refresh_cooldown),
            )
        } else {
            UriResource::reference(uri.clone(), attributes.clone())
        }
    }
}

impl ResourceLoader for DefaultResourceLoader {
    fn load(
        &self,
        uri: &Url,
        attributes: &HashMap<String, String>,
    ) -> LoadResult<Arc<dyn FeatureResource>> {
        debug!("Loading resource {}", uri);
        let resource: Arc<dyn FeatureResource> = match uri.scheme() {
            "file" => Arc::new(self.load_file(uri, attributes)?),
            "res" => Arc::new(self.load_bundled(uri, attributes)?),
            _ => Arc::new(self.load_uri(uri, attributes)),
        };
        Ok(resource)
    }
}

/// `name.js` becomes `name.opt.js`; other paths are unchanged.
fn optimized_path(path: &Path) -> PathBuf {
    match path.to_str().and_then(|p| p.strip_suffix(".js")) {
        Some(stem) => PathBuf::from(format!("{stem}.opt.js")),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optimized_variant_name() {
        assert_eq!(optimized_path(Path::new("/a/core.js")), PathBuf::from("/a/core.opt.js"));
        assert_eq!(optimized_path(Path::new("/a/core.css")), PathBuf::from("/a/core.css"));
    }
}
