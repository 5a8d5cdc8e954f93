//! Common utility functions shared across CLI commands.

use std::path::PathBuf;
use std::time::SystemTime;

use cardsight_core::{CatalogConfig, Staleness};
use chrono::{DateTime, Utc};

/// Resolve the catalog configuration: environment first, then flags.
pub fn resolve_config(
    reference_root: Option<PathBuf>,
    catalog_dir: Option<PathBuf>,
) -> CatalogConfig {
    apply_overrides(CatalogConfig::from_env(), reference_root, catalog_dir)
}

fn apply_overrides(
    mut config: CatalogConfig,
    reference_root: Option<PathBuf>,
    catalog_dir: Option<PathBuf>,
) -> CatalogConfig {
    if let Some(root) = reference_root {
        config.reference_root = root;
    }
    if let Some(dir) = catalog_dir {
        config.catalog_dir = dir;
    }
    config
}

/// Format a file modification time as a human-readable UTC string.
pub fn format_modified(time: SystemTime) -> String {
    let dt: DateTime<Utc> = time.into();
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// One-line description of a staleness verdict.
pub fn describe_staleness(staleness: &Staleness) -> String {
    match staleness {
        Staleness::Fresh { entries } => format!("up to date ({entries} entries)"),
        Staleness::NoReferenceImages => "no reference images; keeping catalog".to_string(),
        Staleness::Stale(reason) => format!("stale ({reason})"),
    }
}
