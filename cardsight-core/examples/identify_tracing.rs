//! Example demonstrating catalog rebuild and match tracing.
//!
//! Run with: cargo run -p cardsight-core --example identify_tracing -- <CARDS_DIR> <IMAGE>

use std::path::PathBuf;

use cardsight_core::{CardIdentifier, CatalogConfig};
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    // Initialize tracing subscriber with debug level
    fmt()
        .with_env_filter(EnvFilter::new("cardsight_core=debug,info"))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(cards), Some(image)) = (args.next(), args.next()) else {
        eprintln!("usage: identify_tracing <CARDS_DIR> <IMAGE>");
        return;
    };

    println!("=== Card Identification Tracing Demo ===\n");

    let config = CatalogConfig {
        reference_root: PathBuf::from(&cards),
        catalog_dir: PathBuf::from(&cards),
        ..CatalogConfig::default()
    };
    println!("Config: {:?}\n", config);

    let identifier = match CardIdentifier::open(config) {
        Ok(identifier) => identifier,
        Err(e) => {
            eprintln!("Failed to open catalog: {}", e);
            return;
        }
    };
    println!("Catalog entries: {}\n", identifier.catalog().len());

    match identifier.identify_path(image.as_ref()) {
        Ok(report) => match report.matched {
            Some(card) => {
                println!("\n✅ Match!");
                println!("   Card:  {} #{}", card.set_name, card.number_in_set);
                println!("   Score: {:?} (cutoff {})", report.best.map(|b| b.score), report.cutoff);
            }
            None => {
                println!("\n❌ No match (best score {:?})", report.best.map(|b| b.score));
            }
        },
        Err(e) => {
            println!("\n❌ Failed: {}", e);
        }
    }
}
