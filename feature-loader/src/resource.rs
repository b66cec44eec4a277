use std::collections::HashMap;
use std::sync::Arc;

use crate::FeatureResource;

/// Resource whose content is fixed at load time.
#[derive(Debug, Clone)]
pub struct StaticResource {
    name: String,
    content: Arc<str>,
    debug_content: Arc<str>,
    attributes: HashMap<String, String>,
}

impl StaticResource {
    /// Resource with separate normal and debug content.
    ///
    /// A missing variant is served by the other one; `None` when both are
    /// missing.
    pub fn dual_mode(
        name: impl Into<String>,
        content: Option<String>,
        debug_content: Option<String>,
        attributes: HashMap<String, String>,
    ) -> Option<Self> {
        let (content, debug_content): (Arc<str>, Arc<str>) = match (content, debug_content) {
            (Some(content), Some(debug)) => (content.into(), debug.into()),
            (Some(only), None) | (None, Some(only)) => {
                let shared: Arc<str> = only.into();
                (shared.clone(), shared)
            }
            (None, None) => return None,
        };
        Some(Self {
            name: name.into(),
            content,
            debug_content,
            attributes,
        })
    }

    /// Inline script text, identical in both modes.
    pub fn inline(
        name: impl Into<String>,
        content: impl Into<Arc<str>>,
        attributes: HashMap<String, String>,
    ) -> Self {
        let content = content.into();
        Self {
            name: name.into(),
            debug_content: content.clone(),
            content,
            attributes,
        }
    }
}

impl FeatureResource for StaticResource {
    fn content(&self) -> Option<Arc<str>> {
        Some(self.content.clone())
    }

    fn debug_content(&self) -> Option<Arc<str>> {
        Some(self.debug_content.clone())
    }

    fn is_external(&self) -> bool {
        false
    }

    fn is_proxy_cacheable(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }
}
