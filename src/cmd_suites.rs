//! Suite subcommand handlers for Testbed.

use std::path::Path;

use serde_json::json;
use tracing::{info, warn};

use testbed_config::{Config, ConfigLoader, ConfigValidator};
use testbed_protocols::TestSuite;

use crate::cli::Commands;
use crate::register::{build_testing_extension, known_suite_types};

/// Handle a subcommand against the loaded configuration.
pub(crate) fn handle_command(
    command: Commands,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::List { format } => suite_list(config, &format),
        Commands::Show { name, format } => suite_show(config, &name, &format),
        Commands::Realize { format } => suite_realize(config, &format),
        Commands::Check => config_check(config),
    }
}

/// Load the config for `path`, falling back to the default location.
pub(crate) fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    Ok(ConfigLoader::load_or_default(path)?)
}

/// List declared suites with their subtype and state.
fn suite_list(config: &Config, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let extension = build_testing_extension(config)?;
    let suites = extension.test_suites();
    let names = suites.names();

    if names.is_empty() {
        println!("No suites declared.");
        return Ok(());
    }

    let mut rows = Vec::with_capacity(names.len());
    for name in names {
        let subtype = suites.subtype_of(&name)?;
        let state = suites.state(&name)?;
        rows.push((name, subtype, state));
    }

    match format {
        "json" => {
            let entries: Vec<_> = rows
                .iter()
                .map(|(name, subtype, state)| {
                    json!({ "name": name, "type": subtype, "state": state })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        _ => {
            println!("{:<24} {:<26} {}", "NAME", "TYPE", "STATE");
            println!("{}", "-".repeat(60));
            for (name, subtype, state) in rows {
                println!("{:<24} {:<26} {}", name, subtype, state);
            }
        }
    }

    Ok(())
}

/// Realize one suite and print its descriptor.
fn suite_show(config: &Config, name: &str, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let extension = build_testing_extension(config)?;
    let suite = extension.test_suites().get(name)?;
    let descriptor = suite.descriptor();

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&descriptor)?);
        }
        _ => {
            println!("Suite: {}", descriptor.name);
            println!("Type: {}", descriptor.suite_type);
            println!("Framework: {}", descriptor.framework.as_deref().unwrap_or("-"));
            if descriptor.targets.is_empty() {
                println!("Targets: -");
            } else {
                println!("Targets: {}", descriptor.targets.join(", "));
            }
            if !descriptor.requires.is_empty() {
                println!("Requires: {}", descriptor.requires.join(", "));
            }
        }
    }

    Ok(())
}

/// Realize every suite in declaration order and report each outcome.
fn suite_realize(config: &Config, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let extension = build_testing_extension(config)?;
    let suites = extension.test_suites();

    let mut outcomes = Vec::new();
    for name in suites.names() {
        match suites.get(&name) {
            Ok(_) => {
                info!("Realized suite {}", name);
                outcomes.push((name, None));
            }
            Err(e) => {
                warn!("Failed to realize suite {}: {}", name, e);
                outcomes.push((name, Some(e.to_string())));
            }
        }
    }

    match format {
        "json" => {
            let entries: Vec<_> = outcomes
                .iter()
                .map(|(name, error)| json!({ "name": name, "realized": error.is_none(), "error": error }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        _ => {
            for (name, error) in &outcomes {
                match error {
                    None => println!("  ✓ {}", name),
                    Some(e) => println!("  ✗ {}: {}", name, e),
                }
            }
        }
    }

    let failed = outcomes.iter().filter(|(_, error)| error.is_some()).count();
    if failed > 0 {
        return Err(format!("{} of {} suites failed to realize", failed, outcomes.len()).into());
    }
    Ok(())
}

/// Validate the configuration and print errors and warnings.
fn config_check(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let known = known_suite_types()?;
    let known: Vec<&str> = known.iter().map(String::as_str).collect();
    let result = ConfigValidator::validate(config, &known);

    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for error in &result.errors {
        println!("error: {}: {}", error.path, error.message);
    }

    if !result.is_valid() {
        return Err(format!("Configuration has {} errors", result.errors.len()).into());
    }

    println!(
        "Configuration OK ({} suites, {} conventions)",
        config.suites.len(),
        config.conventions.len()
    );
    Ok(())
}
