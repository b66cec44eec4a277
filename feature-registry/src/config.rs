//! Registry configuration loaded from YAML
//!
//! ```yaml
//! locations:
//!   - res://features/features.txt
//!   - /opt/site/features
//! resource_roots:
//!   - /usr/share/feature-registry
//! fetch_timeout_secs: 10
//! refresh_cooldown_secs: 60
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use feature_loader::{DefaultResourceLoader, HttpFetcher, ResourceRoots};
use serde::{Deserialize, Serialize};

use crate::{RegistryError, RegistryResult};

fn default_fetch_timeout() -> u64 {
    30
}

fn default_refresh_cooldown() -> u64 {
    60
}

/// Settings for a [`crate::FeatureRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Feature locations registered at startup
    #[serde(default)]
    pub locations: Vec<String>,

    /// Search path for bundled (`res://`) descriptors and scripts
    #[serde(default)]
    pub resource_roots: Vec<PathBuf>,

    /// Timeout for fetching inline external scripts
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Delay before a failed external fetch is retried
    #[serde(default = "default_refresh_cooldown")]
    pub refresh_cooldown_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            locations: Vec::new(),
            resource_roots: Vec::new(),
            fetch_timeout_secs: default_fetch_timeout(),
            refresh_cooldown_secs: default_refresh_cooldown(),
        }
    }
}

impl RegistryConfig {
    /// Load a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::InvalidPath` if the file cannot be read and
    /// `RegistryError::Config` if it is not valid configuration YAML.
    pub fn load(path: impl AsRef<Path>) -> RegistryResult<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).map_err(|e| RegistryError::InvalidPath(path.to_path_buf(), e))?;
        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| RegistryError::Config(path.to_path_buf(), e.to_string()))?;
        tracing::debug!(
            "Loaded registry configuration {} ({} locations, {} resource roots)",
            path.display(),
            config.locations.len(),
            config.resource_roots.len()
        );
        Ok(config)
    }

    /// Bundled resource search path, in configured order.
    #[must_use]
    pub fn roots(&self) -> ResourceRoots {
        let mut roots = ResourceRoots::new();
        roots.add_roots(self.resource_roots.iter().cloned());
        roots
    }

    /// Default loader honoring the configured roots, timeout and cooldown.
    #[must_use]
    pub fn loader(&self) -> DefaultResourceLoader {
        DefaultResourceLoader::new(self.roots())
            .with_fetcher(std::sync::Arc::new(HttpFetcher::new(Duration::from_secs(
                self.fetch_timeout_secs,
            ))))
            .with_refresh_cooldown(Duration::from_secs(self.refresh_cooldown_secs))
    }
}
