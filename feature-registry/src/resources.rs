use std::sync::Arc;

use feature_loader::FeatureResource;
use sha2::{Digest, Sha256};

/// Ordered, deduplicated resources answering one query.
#[derive(Debug, Clone, Default)]
pub struct ResourceList {
    resources: Vec<Arc<dyn FeatureResource>>,
}

impl ResourceList {
    pub(crate) fn new(resources: Vec<Arc<dyn FeatureResource>>) -> Self {
        Self { resources }
    }

    /// Number of resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resources in dependency order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn FeatureResource>> {
        self.resources.iter()
    }

    /// Resource names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.resources.iter().map(|r| r.name()).collect()
    }

    /// Whether a proxy may cache the concatenated output.
    #[must_use]
    pub fn is_proxy_cacheable(&self) -> bool {
        self.resources.iter().all(|r| r.is_proxy_cacheable())
    }

    /// SHA-256 over the ordered contents for the given mode, hex encoded.
    ///
    /// Absent content hashes as empty. Every entry is terminated, so moving
    /// text between neighbouring resources changes the checksum.
    #[must_use]
    pub fn checksum(&self, debug: bool) -> String {
        let mut hasher = Sha256::new();
        for resource in &self.resources {
            if let Some(content) = resource.content_for(debug) {
                hasher.update(content.as_bytes());
            }
            hasher.update([0u8]);
        }
        hex::encode(hasher.finalize())
    }
}

impl<'a> IntoIterator for &'a ResourceList {
    type Item = &'a Arc<dyn FeatureResource>;
    type IntoIter = std::slice::Iter<'a, Arc<dyn FeatureResource>>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.iter()
    }
}
