//! Error types for feature registration

use std::path::PathBuf;

use feature_descriptor::DescriptorError;
use feature_graph::GraphError;
use feature_loader::LoadError;

/// Errors raised while registering features or loading configuration.
///
/// Queries never fail; every variant originates from [`crate::FeatureRegistry::register`]
/// or from reading a [`crate::RegistryConfig`].
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A descriptor is not well-formed
    #[error("malformed feature descriptor {location}: {source}")]
    MalformedDescriptor {
        /// File or bundled path of the descriptor
        location: String,
        /// Parser failure
        #[source]
        source: DescriptorError,
    },

    /// A location could not be read
    #[error("invalid path {0}: {1}")]
    InvalidPath(PathBuf, #[source] std::io::Error),

    /// Missing locations, unknown dependencies and cycles, one message each
    #[error("invalid feature configuration:\n{}", .0.join("\n"))]
    InvalidConfiguration(Vec<String>),

    /// A script resource has no retrievable content
    #[error(transparent)]
    ContentRetrieval(#[from] LoadError),

    /// The registry configuration file cannot be parsed
    #[error("failed to parse registry configuration {0}: {1}")]
    Config(PathBuf, String),
}

impl From<GraphError> for RegistryError {
    fn from(error: GraphError) -> Self {
        Self::InvalidConfiguration(error.messages())
    }
}

impl RegistryError {
    /// Human-readable messages, one per underlying problem.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::InvalidConfiguration(messages) => messages.clone(),
            other => vec![other.to_string()],
        }
    }
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
