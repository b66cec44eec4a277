//! feature-registry - inspect and resolve feature descriptors
//!
//! Loads feature locations (descriptor files, directories, index files or
//! bundled `res://` paths) into a registry and answers queries:
//! - `list`: every registered feature
//! - `show`: one feature's depth, dependencies and bundles
//! - `order`: dependency-ordered feature names of a request
//! - `resolve`: the ordered script resources of a request

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_filter = if cli.debug {
        "feature_registry=debug,feature_loader=debug,feature_graph=debug"
    } else {
        "feature_registry=info,feature_loader=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let registry = commands::load_registry(&cli)?;

    match &cli.command {
        Commands::List { json } => commands::list::execute(&registry, *json)?,
        Commands::Show { name, json } => commands::list::show(&registry, name, *json)?,
        Commands::Order { names, json } => commands::list::order(&registry, names, *json)?,
        Commands::Resolve(args) => commands::resolve::execute(&registry, &cli.container, args)?,
    }

    Ok(())
}
