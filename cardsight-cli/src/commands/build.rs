//! Build command implementation.

use std::collections::BTreeSet;
use std::time::Instant;

use anyhow::{Context, Result};
use cardsight_core::{build_catalog, check_staleness, CatalogConfig, CatalogStore};
use colored::Colorize;
use tracing::info;

use crate::exit_codes::ExitCode;
use crate::utils::describe_staleness;

/// Execute the build command.
pub fn execute(config: CatalogConfig, force: bool, quiet: bool) -> Result<ExitCode> {
    config.validate()?;
    let store = CatalogStore::from_config(&config);

    if !force {
        let staleness =
            check_staleness(&config.reference_root, &store, &config.image_extensions);
        if !staleness.is_stale() {
            info!(state = %describe_staleness(&staleness), "Skipping rebuild");
            if !quiet {
                println!(
                    "{} {}",
                    "Catalog:".dimmed(),
                    describe_staleness(&staleness).green()
                );
                println!("   {}", "Use --force to rebuild anyway.".dimmed());
            }
            return Ok(ExitCode::success());
        }
    }

    let started = Instant::now();
    let report = build_catalog(&config).context("Catalog rebuild failed")?;
    let elapsed = started.elapsed();

    let sets: BTreeSet<&str> = report
        .catalog
        .records()
        .map(|r| r.set_name.as_str())
        .collect();
    info!(
        entries = report.catalog.len(),
        sets = sets.len(),
        skipped = report.skipped.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Catalog rebuilt"
    );

    if !quiet {
        println!();
        println!("{}", "╔════════════════════════════════════════╗".green());
        println!(
            "{}",
            "║            CATALOG BUILT               ║".green().bold()
        );
        println!("{}", "╚════════════════════════════════════════╝".green());
        println!();
        println!("   {} {}", "Cards:".dimmed(), report.catalog.len());
        println!("   {} {}", "Sets:".dimmed(), sets.len());
        println!("   {} {:.2?}", "Elapsed:".dimmed(), elapsed);
        if let Ok(Some(generation)) = store.current() {
            println!("   {} {}", "Index:".dimmed(), generation.index_path().display());
            println!("   {} {}", "Store:".dimmed(), generation.store_path().display());
        }

        if !report.skipped.is_empty() {
            println!();
            println!(
                "   {}",
                format!("Skipped {} undecodable image(s):", report.skipped.len()).yellow()
            );
            for skipped in &report.skipped {
                println!("     {} ({})", skipped.path.display(), skipped.reason);
            }
            println!(
                "   {}",
                "The catalog stays stale until these are fixed or removed.".dimmed()
            );
        }
    }

    Ok(ExitCode::success())
}
