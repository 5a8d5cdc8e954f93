//! Identify command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use cardsight_core::fingerprint::open_image;
use cardsight_core::{CardIdentifier, CatalogConfig, MatchReport};
use colored::Colorize;
use tracing::info;

use crate::exit_codes::ExitCode;

/// Options of the identify command.
pub struct IdentifyArgs {
    pub image: PathBuf,
    pub cutoff: Option<u32>,
    pub no_rebuild: bool,
    pub json: bool,
}

/// Execute the identify command.
///
/// Exits with [`crate::exit_codes::NO_MATCH`] when nothing scores below the
/// cutoff.
pub fn execute(config: CatalogConfig, args: IdentifyArgs, quiet: bool) -> Result<ExitCode> {
    let config = CatalogConfig {
        cutoff: args.cutoff.unwrap_or(config.cutoff),
        ..config
    };

    // Decode the query before touching the catalog
    let query = open_image(&args.image)
        .with_context(|| format!("Failed to read image: {}", args.image.display()))?;
    info!(
        path = %args.image.display(),
        width = query.width(),
        height = query.height(),
        "Read query image"
    );

    let identifier = if args.no_rebuild {
        CardIdentifier::load(config)
    } else {
        CardIdentifier::open(config)
    }
    .context("Failed to open catalog")?;

    let report = identifier.identify(&query);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if quiet {
        if let Some(card) = &report.matched {
            println!("{} {}", card.set_name, card.number_in_set);
        }
    } else {
        print_report(&report);
    }

    Ok(if report.matched.is_some() {
        ExitCode::success()
    } else {
        ExitCode::no_match()
    })
}

fn print_report(report: &MatchReport) {
    let score = report
        .best_score()
        .map_or_else(|| "-".to_string(), |s| s.to_string());

    println!();
    match &report.matched {
        Some(card) => {
            println!("{}", "╔════════════════════════════════════════╗".green());
            println!(
                "{}",
                "║               MATCHED                  ║".green().bold()
            );
            println!("{}", "╚════════════════════════════════════════╝".green());
            println!();
            println!("   {} {}", "Set:".dimmed(), card.set_name.green());
            println!("   {} {}", "Number:".dimmed(), card.number_in_set.green());
            println!("   {} {}", "Card id:".dimmed(), card.id);
        }
        None => {
            println!("{}", "╔════════════════════════════════════════╗".yellow());
            println!(
                "{}",
                "║               NO MATCH                 ║".yellow().bold()
            );
            println!("{}", "╚════════════════════════════════════════╝".yellow());
            println!();
            if let Some(best) = &report.best {
                println!("   {} {}", "Closest card id:".dimmed(), best.id);
            }
        }
    }
    println!("   {} {} (cutoff {})", "Score:".dimmed(), score, report.cutoff);
}
