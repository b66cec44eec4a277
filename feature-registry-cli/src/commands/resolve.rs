//! Resolution command

use clap::{Args, ValueEnum};
use feature_loader::FeatureResource;
use feature_registry::{FeatureRegistry, RenderingContext, RequestContext};
use serde::Serialize;

/// Rendering context selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Rendering {
    /// Gadget bundles
    Gadget,
    /// Container bundles
    Container,
}

impl From<Rendering> for RenderingContext {
    fn from(rendering: Rendering) -> Self {
        match rendering {
            Rendering::Gadget => Self::Gadget,
            Rendering::Container => Self::Container,
        }
    }
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Requested feature names
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Rendering context
    #[arg(long, value_enum, default_value_t = Rendering::Gadget)]
    pub rendering: Rendering,

    /// Only the requested features, without dependencies
    #[arg(long)]
    pub no_transitive: bool,

    /// Report debug content instead of optimized content
    #[arg(long)]
    pub debug_content: bool,

    /// Print resource contents
    #[arg(long)]
    pub content: bool,

    /// Print JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct ResolvedResource {
    name: String,
    external: bool,
    cacheable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ResolveReport<'a> {
    container: &'a str,
    rendering: RenderingContext,
    transitive: bool,
    unsupported: Vec<String>,
    checksum: String,
    resources: Vec<ResolvedResource>,
}

/// Resolve the requested features and print the resources.
pub fn execute(
    registry: &FeatureRegistry,
    container: &str,
    args: &ResolveArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = RequestContext::new(args.rendering.into())
        .with_container(container)
        .with_debug(args.debug_content);
    let transitive = !args.no_transitive;

    let mut unsupported = Vec::new();
    let list = registry.resolve(&ctx, args.names.as_slice(), Some(&mut unsupported), transitive);
    for name in &unsupported {
        eprintln!("unknown feature: {name}");
    }

    let resources: Vec<ResolvedResource> = list
        .iter()
        .map(|resource| ResolvedResource {
            name: resource.name().to_string(),
            external: resource.is_external(),
            cacheable: resource.is_proxy_cacheable(),
            content: args
                .content
                .then(|| resource.content_for(ctx.debug).map(|c| c.to_string()))
                .flatten(),
        })
        .collect();

    let report = ResolveReport {
        container,
        rendering: ctx.rendering,
        transitive,
        unsupported,
        checksum: list.checksum(ctx.debug),
        resources,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for resource in &report.resources {
        let kind = if resource.external { "external" } else { "local" };
        let cache = if resource.cacheable { "cacheable" } else { "uncacheable" };
        println!("{}\t{kind}\t{cache}", resource.name);
        if let Some(content) = &resource.content {
            println!("{content}");
        }
    }
    eprintln!(
        "{} resources for {} in {} ({}), checksum {}",
        report.resources.len(),
        args.names.join(", "),
        report.container,
        report.rendering,
        report.checksum
    );
    Ok(())
}
