//! Catalog configuration.
//!
//! Loaded from environment variables with defaults matching the on-disk
//! layout `cards/<set>/<number>.png` and a catalog in the working directory.

use std::path::PathBuf;

use crate::error::{CardsightError, Result};
use crate::matcher::DEFAULT_CUTOFF;

/// Where reference images and the persisted catalog live, and how strictly
/// queries are matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Root of the reference tree (default: `cards`)
    pub reference_root: PathBuf,
    /// Directory holding the persisted catalog (default: `.`)
    pub catalog_dir: PathBuf,
    /// Identity index file name (default: `catalog_index.json`)
    pub index_file: String,
    /// Fingerprint store file name (default: `catalog_fingerprints.json`)
    pub store_file: String,
    /// Reference image extensions, case-insensitive (default: `png`)
    pub image_extensions: Vec<String>,
    /// Scores strictly below this are matches (default: 22)
    pub cutoff: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            reference_root: PathBuf::from("cards"),
            catalog_dir: PathBuf::from("."),
            index_file: "catalog_index.json".to_string(),
            store_file: "catalog_fingerprints.json".to_string(),
            image_extensions: vec!["png".to_string()],
            cutoff: DEFAULT_CUTOFF,
        }
    }
}

impl CatalogConfig {
    /// Load configuration from environment variables.
    ///
    /// Recognized: `CARDSIGHT_REFERENCE_ROOT`, `CARDSIGHT_CATALOG_DIR`,
    /// `CARDSIGHT_CUTOFF`, `CARDSIGHT_IMAGE_EXTENSIONS` (comma-separated).
    /// Unset or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let reference_root = lookup("CARDSIGHT_REFERENCE_ROOT")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.reference_root);

        let catalog_dir = lookup("CARDSIGHT_CATALOG_DIR")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.catalog_dir);

        let cutoff = lookup("CARDSIGHT_CUTOFF")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(defaults.cutoff);

        let image_extensions = lookup("CARDSIGHT_IMAGE_EXTENSIONS")
            .map(|list| {
                list.split(',')
                    .map(|s| s.trim().trim_start_matches('.').to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|list| !list.is_empty())
            .unwrap_or(defaults.image_extensions);

        Self {
            reference_root,
            catalog_dir,
            cutoff,
            image_extensions,
            index_file: defaults.index_file,
            store_file: defaults.store_file,
        }
    }

    /// Reject settings that could never produce a usable catalog.
    pub fn validate(&self) -> Result<()> {
        if self.cutoff == 0 {
            return Err(CardsightError::InvalidConfig(
                "cutoff must be at least 1 (scores are compared with <)".into(),
            ));
        }
        if self.image_extensions.is_empty() {
            return Err(CardsightError::InvalidConfig(
                "at least one image extension is required".into(),
            ));
        }
        if self.index_file == self.store_file {
            return Err(CardsightError::InvalidConfig(format!(
                "identity index and fingerprint store share the file name {:?}",
                self.index_file
            )));
        }
        Ok(())
    }
}
