//! Alias command - inspect and edit the business-name alias store.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use console::style;

use finscan_core::alias::{resolve_detailed, AliasRegistry};

use super::{load_config, store_path};

/// Arguments for the alias command.
#[derive(Args)]
pub struct AliasArgs {
    /// Alias store file
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: AliasCommand,
}

#[derive(Subcommand)]
enum AliasCommand {
    /// List canonical names and their aliases
    List {
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add aliases for a canonical name, creating the canonical if needed
    Add {
        /// Canonical business name
        canonical: String,
        /// Aliases mapping to the canonical name
        aliases: Vec<String>,
    },

    /// Remove an alias
    Remove {
        alias: String,
    },

    /// Remove a canonical name together with all of its aliases
    RemoveCanonical {
        name: String,
    },

    /// Show how a candidate name resolves
    Test {
        candidate: String,

        /// Fuzzy match threshold (default: from config)
        #[arg(long)]
        threshold: Option<f32>,
    },
}

pub async fn run(args: AliasArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let path = store_path(args.store.as_deref(), &config);
    let registry = AliasRegistry::open(&path)?;

    match args.command {
        AliasCommand::List { json } => list(&registry, json),
        AliasCommand::Add { canonical, aliases } => {
            let added = registry.update(|store| {
                let mut added = Vec::new();
                if store.add_canonical(&canonical)? {
                    added.push(canonical.clone());
                }
                for alias in &aliases {
                    if store.add_alias(&canonical, alias)? {
                        added.push(alias.clone());
                    }
                }
                Ok(added)
            })?;

            if added.is_empty() {
                println!("{} Nothing to add, store unchanged", style("ℹ").blue());
            } else {
                println!(
                    "{} Added {} to {}",
                    style("✓").green(),
                    added.join(", "),
                    canonical
                );
            }
            Ok(())
        }
        AliasCommand::Remove { alias } => {
            if registry.update(|store| store.remove_alias(&alias))? {
                println!("{} Removed alias {}", style("✓").green(), alias);
            } else {
                println!("{} No alias named {}", style("ℹ").blue(), alias);
            }
            Ok(())
        }
        AliasCommand::RemoveCanonical { name } => {
            let removed = registry.update(|store| store.remove_canonical(&name))?;
            println!(
                "{} Removed {} and {} alias(es)",
                style("✓").green(),
                name,
                removed.len()
            );
            Ok(())
        }
        AliasCommand::Test {
            candidate,
            threshold,
        } => {
            let threshold = threshold.unwrap_or(config.extraction.fuzzy_threshold);
            match resolve_detailed(&candidate, &registry.snapshot(), threshold) {
                Some(m) => println!(
                    "{} -> {} ({} match on \"{}\", confidence {:.2})",
                    candidate,
                    style(&m.canonical).green(),
                    m.kind.as_str(),
                    m.matched,
                    m.confidence
                ),
                None => println!(
                    "{} {} does not resolve (threshold {:.2})",
                    style("✗").red(),
                    candidate,
                    threshold
                ),
            }
            Ok(())
        }
    }
}

fn list(registry: &AliasRegistry, json: bool) -> anyhow::Result<()> {
    let store = registry.snapshot();

    if json {
        let listing: serde_json::Map<String, serde_json::Value> = store
            .canonical_names()
            .iter()
            .map(|c| {
                let aliases: Vec<&str> = store.aliases_of(c).collect();
                (c.clone(), serde_json::json!(aliases))
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    if store.is_empty() {
        println!("{} Alias store is empty", style("ℹ").blue());
        return Ok(());
    }

    for canonical in store.canonical_names() {
        println!("{}", style(canonical).bold());
        for alias in store.aliases_of(canonical) {
            println!("  - {}", alias);
        }
    }

    Ok(())
}
