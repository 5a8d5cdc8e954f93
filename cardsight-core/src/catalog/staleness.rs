//! Decide whether the persisted catalog must be rebuilt.
//!
//! Hashing is the expensive step, so staleness is judged from file
//! existence, entry counts and modification times only. Replacing a
//! reference image with different content under the same name and an older
//! mtime goes unnoticed.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::scan::scan_reference_set;
use super::store::CatalogStore;
use crate::error::Result;

/// Why a catalog was judged stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    /// The identity index or the fingerprint store is absent.
    MissingCatalog,
    /// Persisted entry count differs from the images on disk.
    CountMismatch { persisted: usize, on_disk: usize },
    /// A reference image changed after the fingerprint store was written.
    ModifiedSince { path: PathBuf },
    /// Something could not be read; rebuilding surfaces the real error.
    Unreadable(String),
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCatalog => write!(f, "catalog files missing"),
            Self::CountMismatch { persisted, on_disk } => write!(
                f,
                "catalog has {persisted} entries but {on_disk} reference images are on disk"
            ),
            Self::ModifiedSince { path } => {
                write!(f, "{} is newer than the catalog", path.display())
            }
            Self::Unreadable(detail) => write!(f, "unreadable: {detail}"),
        }
    }
}

/// Outcome of a staleness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staleness {
    /// The persisted catalog describes the current reference set.
    Fresh { entries: usize },
    /// No reference images exist, so there is nothing to rebuild from.
    NoReferenceImages,
    Stale(StaleReason),
}

impl Staleness {
    pub fn is_stale(&self) -> bool {
        matches!(self, Staleness::Stale(_))
    }
}

/// Evaluate the staleness rules in order; the first that applies wins.
///
/// 1. either persisted file absent: stale
/// 2. zero reference images: not stale
/// 3. persisted count differs from the on-disk count: stale
/// 4. any reference image newer than the fingerprint store: stale
/// 5. otherwise fresh
pub fn check_staleness(
    reference_root: &Path,
    store: &CatalogStore,
    extensions: &[String],
) -> Staleness {
    if !store.exists() {
        debug!("Catalog files missing");
        return Staleness::Stale(StaleReason::MissingCatalog);
    }

    let images = match scan_reference_set(reference_root, extensions) {
        Ok(images) => images,
        Err(e) => return Staleness::Stale(StaleReason::Unreadable(e.to_string())),
    };
    if images.is_empty() {
        debug!(root = %reference_root.display(), "No reference images; keeping catalog");
        return Staleness::NoReferenceImages;
    }

    let persisted = match store.persisted_len() {
        Ok(n) => n,
        Err(e) => return Staleness::Stale(StaleReason::Unreadable(e.to_string())),
    };
    if persisted != images.len() {
        debug!(persisted, on_disk = images.len(), "Entry count changed");
        match skipped_by_last_build(reference_root, store, extensions) {
            Ok(skipped) if !skipped.is_empty() => {
                let files: Vec<String> = skipped.iter().map(|p| p.display().to_string()).collect();
                warn!(
                    files = %files.join(", "),
                    "Reference images the last build could not decode keep the catalog stale; \
                     fix or remove them"
                );
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "Cannot compare reference set with identity index"),
        }
        return Staleness::Stale(StaleReason::CountMismatch {
            persisted,
            on_disk: images.len(),
        });
    }

    let catalog_mtime = match store.store_modified() {
        Ok(t) => t,
        Err(e) => return Staleness::Stale(StaleReason::Unreadable(e.to_string())),
    };
    for image in &images {
        match fs::metadata(&image.path).and_then(|m| m.modified()) {
            Ok(mtime) if mtime > catalog_mtime => {
                debug!(path = %image.path.display(), "Reference image newer than catalog");
                return Staleness::Stale(StaleReason::ModifiedSince {
                    path: image.path.clone(),
                });
            }
            Ok(_) => {}
            Err(e) => {
                return Staleness::Stale(StaleReason::Unreadable(format!(
                    "{}: {e}",
                    image.path.display()
                )))
            }
        }
    }

    Staleness::Fresh { entries: persisted }
}

/// Reference images that predate the fingerprint store yet have no catalog
/// entry, which is what an image the last build failed to decode looks like.
///
/// While any of these remain on disk the persisted count never matches the
/// on-disk count, so every staleness check reports
/// [`StaleReason::CountMismatch`]. Images copied in with an mtime older than
/// the store are indistinguishable and are listed too.
pub fn skipped_by_last_build(
    reference_root: &Path,
    store: &CatalogStore,
    extensions: &[String],
) -> Result<Vec<PathBuf>> {
    let index = store.load_index()?;
    let catalog_mtime = store.store_modified()?;
    let indexed: HashSet<(&str, &str)> = index
        .iter()
        .map(|r| (r.set_name.as_str(), r.number_in_set.as_str()))
        .collect();

    let mut skipped = Vec::new();
    for image in scan_reference_set(reference_root, extensions)? {
        if indexed.contains(&(image.set_name.as_str(), image.number_in_set.as_str())) {
            continue;
        }
        let older = fs::metadata(&image.path)
            .and_then(|m| m.modified())
            .is_ok_and(|mtime| mtime <= catalog_mtime);
        if older {
            skipped.push(image.path);
        }
    }
    Ok(skipped)
}

/// Boolean form of [`check_staleness`].
pub fn is_stale(reference_root: &Path, store: &CatalogStore, extensions: &[String]) -> bool {
    check_staleness(reference_root, store, extensions).is_stale()
}
