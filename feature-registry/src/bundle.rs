use std::collections::HashMap;
use std::sync::Arc;

use feature_descriptor::ApiDirective;
use feature_loader::FeatureResource;

use crate::RequestContext;

/// Bundle attribute restricting a bundle to some containers.
pub const CONTAINER_ATTR: &str = "container";

/// A loaded bundle: the resources one feature offers to one context type.
#[derive(Debug, Clone)]
pub struct FeatureBundle {
    context_type: String,
    attributes: HashMap<String, String>,
    containers: Vec<String>,
    resources: Vec<Arc<dyn FeatureResource>>,
    api_directives: Vec<ApiDirective>,
}

impl FeatureBundle {
    pub(crate) fn new(
        context_type: String,
        attributes: HashMap<String, String>,
        resources: Vec<Arc<dyn FeatureResource>>,
        api_directives: Vec<ApiDirective>,
    ) -> Self {
        let containers = attributes
            .get(CONTAINER_ATTR)
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        Self {
            context_type,
            attributes,
            containers,
            resources,
            api_directives,
        }
    }

    /// Lower-cased context type, usually `gadget` or `container`.
    #[must_use]
    pub fn context_type(&self) -> &str {
        &self.context_type
    }

    /// Attributes of the bundle element.
    #[must_use]
    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    /// Containers this bundle is restricted to; empty means all.
    #[must_use]
    pub fn containers(&self) -> &[String] {
        &self.containers
    }

    /// Loaded resources in declaration order.
    #[must_use]
    pub fn resources(&self) -> &[Arc<dyn FeatureResource>] {
        &self.resources
    }

    /// Declared API imports and exports.
    #[must_use]
    pub fn api_directives(&self) -> &[ApiDirective] {
        &self.api_directives
    }

    /// Whether this bundle serves the request.
    #[must_use]
    pub fn serves(&self, ctx: &RequestContext) -> bool {
        self.context_type == ctx.rendering.bundle_type()
            && (self.containers.is_empty() || self.containers.iter().any(|c| *c == ctx.container))
    }
}
