//! Full catalog rebuild from the reference image tree.
//!
//! There is no incremental mode: every rebuild decodes and hashes every
//! reference image, reassigns all ids, and replaces the persisted catalog.

use std::path::PathBuf;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{info, warn};

use super::scan::{scan_reference_set, ReferenceImage};
use super::store::CatalogStore;
use super::{CardId, CardRecord, Catalog, CatalogEntry};
use crate::config::CatalogConfig;
use crate::error::{CardsightError, Result};
use crate::fingerprint::{compute_oriented_fingerprints, open_image, OrientedFingerprints};

/// A reference image left out of the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedImage {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of hashing a reference set.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub catalog: Catalog,
    /// Images that failed to decode. They consume no id.
    pub skipped: Vec<SkippedImage>,
}

fn hash_one(image: &ReferenceImage) -> Result<OrientedFingerprints> {
    let decoded = open_image(&image.path)?;
    Ok(compute_oriented_fingerprints(&decoded))
}

/// Hash every image and assign ids in the given order.
///
/// Hashing may run in parallel; ids follow the input order, not completion
/// order.
pub fn hash_reference_images(images: &[ReferenceImage]) -> BuildReport {
    #[cfg(feature = "parallel")]
    let hashed: Vec<Result<OrientedFingerprints>> = images.par_iter().map(hash_one).collect();
    #[cfg(not(feature = "parallel"))]
    let hashed: Vec<Result<OrientedFingerprints>> = images.iter().map(hash_one).collect();

    let mut entries = Vec::with_capacity(images.len());
    let mut skipped = Vec::new();
    for (image, outcome) in images.iter().zip(hashed) {
        match outcome {
            Ok(fingerprints) => {
                let id = entries.len() as CardId + 1;
                entries.push(CatalogEntry {
                    record: CardRecord {
                        id,
                        set_name: image.set_name.clone(),
                        number_in_set: image.number_in_set.clone(),
                    },
                    fingerprints,
                });
            }
            Err(e) => {
                warn!(path = %image.path.display(), error = %e, "Skipping reference image");
                skipped.push(SkippedImage {
                    path: image.path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let catalog = Catalog {
        entries: entries.into_iter().map(|e| (e.id(), e)).collect(),
    };
    BuildReport { catalog, skipped }
}

/// Rebuild the catalog from `config.reference_root` and persist it.
///
/// Refuses with [`CardsightError::EmptyReferenceSet`] when nothing could be
/// hashed, leaving any previously persisted catalog untouched.
pub fn build_catalog(config: &CatalogConfig) -> Result<BuildReport> {
    let root = &config.reference_root;
    let images = scan_reference_set(root, &config.image_extensions)?;
    if images.is_empty() {
        return Err(CardsightError::EmptyReferenceSet { root: root.clone() });
    }

    for image in images.iter().filter(|i| !i.has_numeric_stem()) {
        warn!(
            path = %image.path.display(),
            "Non-numeric card file name sorts ahead of card 1"
        );
    }

    info!(root = %root.display(), images = images.len(), "Rebuilding catalog");
    let report = hash_reference_images(&images);
    if report.catalog.is_empty() {
        return Err(CardsightError::EmptyReferenceSet { root: root.clone() });
    }

    CatalogStore::from_config(config).save(&report.catalog)?;
    info!(
        entries = report.catalog.len(),
        skipped = report.skipped.len(),
        "Catalog rebuilt"
    );
    Ok(report)
}
