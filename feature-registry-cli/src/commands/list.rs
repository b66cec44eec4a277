//! Feature listing and ordering commands

use feature_registry::FeatureRegistry;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Print every registered feature.
pub fn execute(registry: &FeatureRegistry, json: bool) -> CommandResult {
    let names = registry.feature_names();
    if json {
        println!("{}", serde_json::to_string_pretty(&names)?);
    } else {
        for name in &names {
            println!("{name}");
        }
        eprintln!("{} features", names.len());
    }
    Ok(())
}

/// Print one feature.
pub fn show(registry: &FeatureRegistry, name: &str, json: bool) -> CommandResult {
    let Some(view) = registry.feature(name) else {
        return Err(format!("unknown feature {name}").into());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("{}", view.name);
    println!("  depth:        {}", view.depth);
    println!("  dependencies: {}", view.dependencies.join(", "));
    for bundle in registry.bundles(name).unwrap_or_default() {
        let containers = if bundle.containers().is_empty() {
            "all containers".to_string()
        } else {
            bundle.containers().join(", ")
        };
        println!(
            "  {} bundle ({}): {} resources, {} api directives",
            bundle.context_type(),
            containers,
            bundle.resources().len(),
            bundle.api_directives().len()
        );
    }
    Ok(())
}

/// Print the dependency-ordered features of a request.
pub fn order(registry: &FeatureRegistry, names: &[String], json: bool) -> CommandResult {
    let ordered = registry.features_in_order(names);
    if json {
        println!("{}", serde_json::to_string_pretty(&ordered)?);
    } else {
        for name in &ordered {
            println!("{name}");
        }
    }
    for name in names {
        if registry.feature(name).is_none() {
            eprintln!("unknown feature: {name}");
        }
    }
    Ok(())
}
