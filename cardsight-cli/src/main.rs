//! Cardsight CLI - trading card identification by perceptual fingerprints.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod exit_codes;
mod utils;

use commands::identify::IdentifyArgs;
use exit_codes::ExitCode;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success (identify: card matched)
  1   General error
  2   No card scored below the cutoff
  64  Usage or configuration error
  65  Catalog files corrupt or inconsistent
  66  Input image unreadable, or no reference images
  69  No catalog exists and none can be built
  74  I/O error

Environment:
  CARDSIGHT_REFERENCE_ROOT, CARDSIGHT_CATALOG_DIR,
  CARDSIGHT_CUTOFF, CARDSIGHT_IMAGE_EXTENSIONS, RUST_LOG";

#[derive(Parser)]
#[command(name = "cardsight")]
#[command(author, version, long_about = None)]
#[command(about = "Trading card identification by perceptual fingerprints")]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// Directory of reference images, one subdirectory per set
    #[arg(long, global = true, value_name = "DIR")]
    reference_root: Option<PathBuf>,

    /// Directory holding the catalog files
    #[arg(long, global = true, value_name = "DIR")]
    catalog_dir: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress banners and decorative output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the catalog from the reference images if it is stale
    Build {
        /// Rebuild even if the catalog is up to date
        #[arg(long)]
        force: bool,
    },

    /// Report whether the catalog is up to date, without rebuilding
    Status,

    /// Identify a rectified card image against the catalog
    Identify {
        /// Path to the card image, in canonical orientation
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Acceptance cutoff; a match needs a score strictly below it
        #[arg(long, value_name = "N")]
        cutoff: Option<u32>,

        /// Use the persisted catalog as is, even if stale
        #[arg(long)]
        no_rebuild: bool,

        /// Print the match report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the fingerprints of an image in every orientation
    Inspect {
        /// Path to the image
        #[arg(value_name = "IMAGE")]
        image: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("cardsight_core=debug,cardsight=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = utils::resolve_config(cli.reference_root, cli.catalog_dir);
    let quiet = cli.quiet;

    match cli.command {
        Commands::Build { force } => commands::build::execute(config, force, quiet),
        Commands::Status => commands::status::execute(config, quiet),
        Commands::Identify {
            image,
            cutoff,
            no_rebuild,
            json,
        } => commands::identify::execute(
            config,
            IdentifyArgs {
                image,
                cutoff,
                no_rebuild,
                json,
            },
            quiet,
        ),
        Commands::Inspect { image } => commands::inspect::execute(image, quiet),
    }
}

fn main() {
    // Usage errors map to EX_USAGE; clap's own code 2 means "no match" here
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() {
                exit_codes::USAGE_ERROR
            } else {
                exit_codes::SUCCESS
            };
            let _ = err.print();
            std::process::exit(code);
        }
    };

    init_tracing(cli.verbose);

    let exit = run(cli).unwrap_or_else(|err| ExitCode::from_anyhow(&err));
    if let Some(message) = &exit.message {
        eprintln!("{} {}", "Error:".red().bold(), message);
    }
    std::process::exit(exit.code);
}
