//! Long-lived card identification service.
//!
//! Holds the catalog loaded once and shared by reference. Queries read a
//! snapshot (`Arc<Catalog>`); a rebuild persists the new catalog first and
//! only then swaps the snapshot, so readers never observe a partial catalog.

use std::path::Path;
use std::sync::{Arc, RwLock};

use image::DynamicImage;
use tracing::{info, warn};

use crate::catalog::{
    build_catalog, check_staleness, Catalog, CatalogStore, SkippedImage, Staleness,
};
use crate::config::CatalogConfig;
use crate::error::{CardsightError, Result};
use crate::fingerprint::{compute_fingerprint, open_image, Orientation};
use crate::geometry::{aspect_deviation, ASPECT_TOLERANCE};
use crate::matcher::{MatchReport, Matcher};

/// Summary of a completed rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildSummary {
    pub entries: usize,
    pub skipped: Vec<SkippedImage>,
}

/// Identifies card images against a shared catalog.
pub struct CardIdentifier {
    config: CatalogConfig,
    matcher: Matcher,
    catalog: RwLock<Arc<Catalog>>,
}

impl CardIdentifier {
    /// Open the catalog described by `config`, rebuilding it first if stale.
    ///
    /// A corrupt persisted catalog forces one full rebuild. When the catalog
    /// is stale but there are no reference images, the existing catalog is
    /// kept; with no catalog at all this fails with
    /// [`CardsightError::CatalogNotInitialized`].
    pub fn open(config: CatalogConfig) -> Result<Self> {
        config.validate()?;
        let store = CatalogStore::from_config(&config);

        let staleness = check_staleness(&config.reference_root, &store, &config.image_extensions);
        if let Staleness::Stale(reason) = &staleness {
            info!(%reason, "Catalog stale; rebuilding");
            match build_catalog(&config) {
                Ok(report) => return Ok(Self::with_catalog(config, report.catalog)),
                Err(CardsightError::EmptyReferenceSet { root }) if store.exists() => {
                    warn!(
                        root = %root.display(),
                        "Nothing to rebuild from; keeping existing catalog"
                    );
                }
                Err(CardsightError::EmptyReferenceSet { .. }) => {
                    return Err(CardsightError::CatalogNotInitialized(config.catalog_dir.clone()));
                }
                Err(e) => return Err(e),
            }
        }

        let catalog = match store.load() {
            Ok(catalog) => catalog,
            Err(CardsightError::CatalogCorrupt(detail)) => {
                warn!(%detail, "Catalog corrupt; forcing full rebuild");
                build_catalog(&config)?.catalog
            }
            Err(e) => return Err(e),
        };
        Ok(Self::with_catalog(config, catalog))
    }

    /// Load the persisted catalog as is, without staleness checks or rebuilds.
    pub fn load(config: CatalogConfig) -> Result<Self> {
        config.validate()?;
        let catalog = CatalogStore::from_config(&config).load()?;
        Ok(Self::with_catalog(config, catalog))
    }

    /// Wrap an already built catalog.
    pub fn with_catalog(config: CatalogConfig, catalog: Catalog) -> Self {
        let matcher = Matcher::new(config.cutoff);
        Self {
            config,
            matcher,
            catalog: RwLock::new(Arc::new(catalog)),
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Snapshot of the current catalog.
    pub fn catalog(&self) -> Arc<Catalog> {
        let guard = self
            .catalog
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    /// Rebuild and persist the catalog, then swap it in.
    ///
    /// On failure the current catalog stays in service.
    pub fn rebuild(&self) -> Result<RebuildSummary> {
        let report = build_catalog(&self.config)?;
        let summary = RebuildSummary {
            entries: report.catalog.len(),
            skipped: report.skipped,
        };
        let mut guard = self
            .catalog
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(report.catalog);
        Ok(summary)
    }

    /// Identify a rectified card image in canonical orientation.
    pub fn identify(&self, image: &DynamicImage) -> MatchReport {
        let deviation = aspect_deviation(image.width(), image.height());
        if deviation > ASPECT_TOLERANCE {
            warn!(
                width = image.width(),
                height = image.height(),
                "Query aspect ratio does not look like a card"
            );
        }
        let query = compute_fingerprint(image, Orientation::Identity);
        self.matcher.match_fingerprint(&query, &self.catalog())
    }

    /// Decode and identify an image file.
    pub fn identify_path(&self, path: &Path) -> Result<MatchReport> {
        let image = open_image(path)?;
        Ok(self.identify(&image))
    }
}
