//! Status command implementation.

use anyhow::Result;
use cardsight_core::catalog::{count_reference_images, skipped_by_last_build, StaleReason};
use cardsight_core::{check_staleness, CatalogConfig, CatalogStore, Staleness};
use colored::Colorize;
use tracing::debug;

use crate::exit_codes::ExitCode;
use crate::utils::{describe_staleness, format_modified};

/// Execute the status command.
///
/// Reports without rebuilding; a stale or missing catalog is not an error.
pub fn execute(config: CatalogConfig, quiet: bool) -> Result<ExitCode> {
    config.validate()?;
    let store = CatalogStore::from_config(&config);
    let staleness = check_staleness(&config.reference_root, &store, &config.image_extensions);
    debug!(?staleness, "Checked catalog");

    let on_disk = count_reference_images(&config.reference_root, &config.image_extensions)?;
    let persisted = if store.exists() {
        store.persisted_len().ok()
    } else {
        None
    };
    let built_at = store.store_modified().ok().map(format_modified);
    let generation = store.current().ok().flatten();
    let undecodable = match &staleness {
        Staleness::Stale(StaleReason::CountMismatch { .. }) => {
            skipped_by_last_build(&config.reference_root, &store, &config.image_extensions)
                .unwrap_or_default()
        }
        _ => Vec::new(),
    };

    if quiet {
        println!("{}", describe_staleness(&staleness));
        return Ok(ExitCode::success());
    }

    let state = match &staleness {
        Staleness::Fresh { .. } => describe_staleness(&staleness).green(),
        Staleness::NoReferenceImages => describe_staleness(&staleness).yellow(),
        Staleness::Stale(_) => describe_staleness(&staleness).red(),
    };

    println!();
    println!("   {} {}", "Reference root:".dimmed(), config.reference_root.display());
    println!("   {} {}", "Reference images:".dimmed(), on_disk);
    println!("   {} {}", "Catalog dir:".dimmed(), store.dir().display());
    if let Some(generation) = &generation {
        println!("   {} {}", "Index:".dimmed(), generation.index_path().display());
        println!("   {} {}", "Store:".dimmed(), generation.store_path().display());
    }
    println!(
        "   {} {}",
        "Catalog entries:".dimmed(),
        persisted.map_or_else(|| "-".to_string(), |n| n.to_string())
    );
    println!(
        "   {} {}",
        "Last built:".dimmed(),
        built_at.unwrap_or_else(|| "never".to_string())
    );
    println!("   {} {}", "Cutoff:".dimmed(), config.cutoff);
    println!("   {} {}", "State:".dimmed(), state);

    if !undecodable.is_empty() {
        println!();
        println!(
            "   {}",
            format!("{} image(s) the last build could not decode:", undecodable.len()).yellow()
        );
        for path in &undecodable {
            println!("     {}", path.display());
        }
    }

    Ok(ExitCode::success())
}
