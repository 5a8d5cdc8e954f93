//! Inspect command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use cardsight_core::fingerprint::open_image;
use cardsight_core::geometry::{aspect_deviation, ASPECT_TOLERANCE};
use cardsight_core::{compute_oriented_fingerprints, HashFamily};
use colored::Colorize;

use crate::exit_codes::ExitCode;

/// Execute the inspect command.
///
/// Prints the sixteen hashes of an image under the names used by the
/// fingerprint store (`avg`, `avgmir`, ..., `dudmir`).
pub fn execute(image: PathBuf, quiet: bool) -> Result<ExitCode> {
    let decoded = open_image(&image)
        .with_context(|| format!("Failed to read image: {}", image.display()))?;
    let fingerprints = compute_oriented_fingerprints(&decoded);

    if !quiet {
        println!();
        println!("   {} {}", "Image:".dimmed(), image.display());
        println!(
            "   {} {}x{}",
            "Size:".dimmed(),
            decoded.width(),
            decoded.height()
        );
        if aspect_deviation(decoded.width(), decoded.height()) > ASPECT_TOLERANCE {
            println!("   {}", "Aspect ratio does not look like a card".yellow());
        }
        println!();
    }

    for family in HashFamily::ALL {
        for (orientation, fingerprint) in fingerprints.iter() {
            let name = format!("{}{}", family.prefix(), orientation.suffix());
            println!("{:<9}{}", name, fingerprint.get(family));
        }
    }

    Ok(ExitCode::success())
}
