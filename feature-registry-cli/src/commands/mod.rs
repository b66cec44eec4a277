//! Command-line interface definition and registry setup

use clap::{Parser, Subcommand, crate_version};
use feature_registry::{DEFAULT_CONTAINER, FeatureRegistry, RegistryConfig, RegistryResult};
use std::path::PathBuf;

pub mod list;
pub mod resolve;

/// Inspect feature descriptors and resolve them into script resources
#[derive(Parser)]
#[command(name = "feature-registry")]
#[command(version = crate_version!())]
pub struct Cli {
    /// Comma-separated feature locations (files, directories, .txt indexes, res:// paths)
    #[arg(short, long, env = "FEATURE_LOCATIONS")]
    pub locations: Option<String>,

    /// YAML registry configuration
    #[arg(short, long, env = "FEATURE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Additional root for bundled resources, searched after configured roots
    #[arg(short = 'r', long = "resource-root")]
    pub resource_roots: Vec<PathBuf>,

    /// Container the request is served for
    #[arg(long, default_value = DEFAULT_CONTAINER, env = "FEATURE_CONTAINER")]
    pub container: String,

    /// Print debug information
    #[arg(short, long)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List every registered feature
    List {
        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one feature
    Show {
        /// Feature name
        name: String,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the dependency-ordered features of a request
    Order {
        /// Requested feature names
        #[arg(required = true)]
        names: Vec<String>,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve features into their ordered script resources
    Resolve(resolve::ResolveArgs),
}

/// Build the registry from the configuration file and command-line options.
pub fn load_registry(cli: &Cli) -> RegistryResult<FeatureRegistry> {
    let mut config = match &cli.config {
        Some(path) => RegistryConfig::load(path)?,
        None => RegistryConfig::default(),
    };
    config
        .resource_roots
        .extend(cli.resource_roots.iter().cloned());
    if let Some(locations) = &cli.locations {
        config.locations.push(locations.clone());
    }
    if config.locations.is_empty() {
        tracing::warn!("No feature locations given; the registry is empty");
    }
    FeatureRegistry::from_config(&config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_resolve_arguments() {
        let cli = Cli::try_parse_from([
            "feature-registry",
            "--locations",
            "a.xml,b.xml",
            "--container",
            "alpha",
            "resolve",
            "rpc",
            "views",
            "--rendering",
            "container",
            "--no-transitive",
        ])
        .unwrap();
        assert_eq!(cli.locations.as_deref(), Some("a.xml,b.xml"));
        assert_eq!(cli.container, "alpha");
        match cli.command {
            Commands::Resolve(args) => {
                assert_eq!(args.names, vec!["rpc", "views"]);
                assert!(args.no_transitive);
                assert_eq!(args.rendering, resolve::Rendering::Container);
            }
            _ => panic!("expected resolve"),
        }
    }

    #[test]
    fn test_order_requires_names() {
        assert!(Cli::try_parse_from(["feature-registry", "order"]).is_err());
    }

    #[test]
    fn test_locations_from_command_line() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(
            temp.path().join("core.xml"),
            "<feature><name>core</name><gadget><script>var core;</script></gadget></feature>",
        )
        .unwrap();
        let locations = temp.path().to_string_lossy().into_owned();
        let cli = Cli::try_parse_from(["feature-registry", "-l", &locations, "list"]).unwrap();

        let registry = load_registry(&cli).unwrap();
        assert_eq!(registry.feature_names(), vec!["core"]);
    }
}
