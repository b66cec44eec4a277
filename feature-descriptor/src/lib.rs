//! Feature descriptor parsing.
//!
//! A feature descriptor is a small XML document:
//!
//! ```xml
//! <feature>
//!   <name>rpc</name>
//!   <dependency>core.io</dependency>
//!   <gadget>
//!     <script src="rpc.js"/>
//!     <api>
//!       <exports type="js">gadgets.rpc.call</exports>
//!     </api>
//!   </gadget>
//!   <container container="default">
//!     <script>gadgets.config.init({});</script>
//!   </container>
//! </feature>
//! ```
//!
//! Direct children named `name` and `dependency` carry the feature identity;
//! every other child is a bundle tagged with its (lower-cased) element name.

mod xml;

use std::borrow::Cow;
use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::xml::Element;

/// Context type of bundles rendered into gadgets.
pub const GADGET_CONTEXT: &str = "gadget";
/// Context type of bundles rendered into the container page.
pub const CONTAINER_CONTEXT: &str = "container";
/// URI scheme of bundled resources, e.g. `res:///features/core/core.js`.
pub const BUNDLED_SCHEME: &str = "res";

const SCRIPT_TAG: &str = "script";
const API_TAG: &str = "api";
const SRC_ATTR: &str = "src";
const INLINE_ATTR: &str = "inline";
const TYPE_ATTR: &str = "type";

/// Errors raised while parsing a descriptor.
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    /// The text is not well-formed markup
    #[error("malformed descriptor: {0}")]
    Malformed(String),

    /// The descriptor has no `name` element
    #[error("descriptor has no <name> element")]
    MissingName,

    /// A `script` element carries a `src` that is not a valid URI
    #[error("invalid script source {src:?}: {reason}")]
    InvalidSource {
        /// The `src` attribute as written
        src: String,
        /// Why it could not be parsed or resolved
        reason: url::ParseError,
    },
}

/// Result type for descriptor parsing.
pub type DescriptorResult<T> = Result<T, DescriptorError>;

/// One feature description, as parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedDescriptor {
    /// Unique feature name
    pub name: String,
    /// Dependency names in declaration order
    pub dependencies: Vec<String>,
    /// Content bundles in declaration order
    pub bundles: Vec<ParsedBundle>,
}

/// A context-tagged group of resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedBundle {
    /// Lower-cased tag name, conventionally `gadget` or `container`
    pub context_type: String,
    /// All attributes of the bundle element
    pub attributes: HashMap<String, String>,
    /// Script resources in document order
    pub resources: Vec<ParsedResource>,
    /// API import/export declarations
    pub api_directives: Vec<ApiDirective>,
}

/// A script declaration inside a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedResource {
    /// Where the content comes from
    pub source: ResourceSource,
    /// Resource attributes, `src` excluded
    pub attributes: HashMap<String, String>,
}

/// Content origin of a resource; exactly one of a URI or inline text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceSource {
    /// Externally referenced content
    Uri(Url),
    /// Content written inside the `script` element
    Inline(String),
}

impl ParsedResource {
    /// The referenced URI, if the content is not inline.
    #[must_use]
    pub fn uri(&self) -> Option<&Url> {
        match &self.source {
            ResourceSource::Uri(uri) => Some(uri),
            ResourceSource::Inline(_) => None,
        }
    }

    /// The inline content, if any.
    #[must_use]
    pub fn inline_content(&self) -> Option<&str> {
        match &self.source {
            ResourceSource::Uri(_) => None,
            ResourceSource::Inline(content) => Some(content),
        }
    }
}

/// Kind of API a directive refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKind {
    /// JavaScript symbol
    Js,
    /// RPC service
    Rpc,
}

impl ApiKind {
    fn from_attr(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "js" => Some(Self::Js),
            "rpc" => Some(Self::Rpc),
            _ => None,
        }
    }
}

/// A `uses` or `exports` entry of an `api` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiDirective {
    /// Declared type; unknown types map to `None`
    pub kind: Option<ApiKind>,
    /// Symbol or service name
    pub value: String,
    /// `true` for `uses`, `false` for `exports`
    pub is_import: bool,
}

/// Parse a descriptor whose relative script sources resolve against `base`.
///
/// # Errors
///
/// Returns `DescriptorError::Malformed` for ill-formed markup,
/// `DescriptorError::MissingName` when no name is given and
/// `DescriptorError::InvalidSource` for unparseable script sources.
pub fn parse(base: &Url, text: &str) -> DescriptorResult<ParsedDescriptor> {
    let root = xml::parse_document(text)?;

    let mut name = None;
    let mut dependencies = Vec::new();
    let mut bundles = Vec::new();

    for child in root.child_elements() {
        match child.name.as_str() {
            "name" => name = Some(child.text_content().trim().to_string()),
            "dependency" => {
                let dep = child.text_content().trim().to_string();
                if !dep.is_empty() {
                    dependencies.push(dep);
                }
            }
            _ => bundles.push(parse_bundle(base, child)?),
        }
    }

    let name = name
        .filter(|n| !n.is_empty())
        .ok_or(DescriptorError::MissingName)?;
    debug!(
        "Parsed feature {} ({} dependencies, {} bundles)",
        name,
        dependencies.len(),
        bundles.len()
    );

    Ok(ParsedDescriptor {
        name,
        dependencies,
        bundles,
    })
}

fn parse_bundle(base: &Url, element: &Element) -> DescriptorResult<ParsedBundle> {
    let resources = element
        .descendants_named(SCRIPT_TAG)
        .into_iter()
        .map(|script| parse_resource(base, script))
        .collect::<DescriptorResult<Vec<_>>>()?;

    let api_directives = element
        .descendants_named(API_TAG)
        .into_iter()
        .flat_map(Element::child_elements)
        .filter_map(|entry| {
            let is_import = match entry.name.as_str() {
                "uses" => true,
                "exports" => false,
                _ => return None,
            };
            Some(ApiDirective {
                kind: entry.attribute(TYPE_ATTR).and_then(ApiKind::from_attr),
                value: entry.text_content().trim().to_string(),
                is_import,
            })
        })
        .collect();

    Ok(ParsedBundle {
        context_type: element.name.to_lowercase(),
        attributes: element.attributes.iter().cloned().collect(),
        resources,
        api_directives,
    })
}

fn parse_resource(base: &Url, script: &Element) -> DescriptorResult<ParsedResource> {
    let attributes: HashMap<String, String> = script
        .attributes
        .iter()
        .filter(|(key, _)| key != SRC_ATTR)
        .cloned()
        .collect();

    let source = match script.attribute(SRC_ATTR).filter(|src| !src.is_empty()) {
        Some(src) => {
            let resolve = script.attribute(INLINE_ATTR) != Some("false");
            ResourceSource::Uri(resolve_source(base, src, resolve)?)
        }
        None => ResourceSource::Inline(script.text_content()),
    };

    Ok(ParsedResource { source, attributes })
}

/// Resolve a script `src` into a URI.
///
/// `res://path` names a bundled resource and becomes `res:///path` before
/// resolution. When `resolve` is false the source must already be absolute.
fn resolve_source(base: &Url, src: &str, resolve: bool) -> DescriptorResult<Url> {
    let src: Cow<'_, str> = match src.strip_prefix("res://") {
        Some(path) => Cow::Owned(format!("{BUNDLED_SCHEME}:///{}", path.trim_start_matches('/'))),
        None => Cow::Borrowed(src),
    };

    let parsed = if resolve {
        base.join(&src)
    } else {
        Url::parse(&src)
    };
    parsed.map_err(|reason| DescriptorError::InvalidSource {
        src: src.into_owned(),
        reason,
    })
}

/// Bundled-resource URI for a path relative to the resource roots.
#[must_use]
pub fn bundled_uri(path: &str) -> Option<Url> {
    Url::parse(&format!("{BUNDLED_SCHEME}:///{}", path.trim_start_matches('/'))).ok()
}
