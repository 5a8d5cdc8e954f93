//! The reference card catalog.
//!
//! A [`Catalog`] holds one [`CatalogEntry`] per reference image: its identity
//! ([`CardRecord`]) and its fingerprints under all four orientations. Ids are
//! dense (`1..=N`) and assigned in scan order during a rebuild; lookups go
//! through the id key, never through a position.
//!
//! # Components
//!
//! - [`scan`]: reference image enumeration and ordering
//! - [`builder`]: full rebuild from the reference images
//! - [`store`]: the two persisted sequences and their atomic replacement
//! - [`staleness`]: cheap checks deciding whether a rebuild is needed

pub mod builder;
pub mod scan;
pub mod staleness;
pub mod store;

use std::collections::BTreeMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{CardsightError, Result};
use crate::fingerprint::OrientedFingerprints;

pub use builder::{build_catalog, hash_reference_images, BuildReport, SkippedImage};
pub use scan::{count_reference_images, non_numeric_sorts_first, scan_reference_set, ReferenceImage};
pub use staleness::{check_staleness, is_stale, skipped_by_last_build, StaleReason, Staleness};
pub use store::{CatalogGeneration, CatalogStore, FingerprintRecord};

/// Catalog identifier of a reference card, starting at 1.
pub type CardId = u32;

/// Identity of one physical reference card.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardRecord {
    pub id: CardId,
    /// Parent directory name of the reference image.
    pub set_name: String,
    /// File stem of the reference image, kept verbatim (`"007"`, `"SV01"`).
    pub number_in_set: String,
}

/// A reference card with its fingerprints in every orientation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub record: CardRecord,
    pub fingerprints: OrientedFingerprints,
}

impl CatalogEntry {
    pub fn id(&self) -> CardId {
        self.record.id
    }
}

/// Immutable set of catalog entries keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: BTreeMap<CardId, CatalogEntry>,
}

impl Catalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Assemble a catalog from entries in id order.
    ///
    /// The `n`-th entry must carry id `n` (1-based); anything else is
    /// reported as corruption.
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Result<Self> {
        let mut by_id = BTreeMap::new();
        for (position, entry) in entries.into_iter().enumerate() {
            let expected = position as CardId + 1;
            if entry.id() != expected {
                return Err(CardsightError::CatalogCorrupt(format!(
                    "entry at position {position} has id {}, expected {expected}",
                    entry.id()
                )));
            }
            by_id.insert(entry.id(), entry);
        }
        Ok(Self { entries: by_id })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: CardId) -> Option<&CatalogEntry> {
        self.entries.get(&id)
    }

    pub fn record(&self, id: CardId) -> Option<&CardRecord> {
        self.get(id).map(|entry| &entry.record)
    }

    /// Entries in ascending id order.
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    pub fn records(&self) -> impl Iterator<Item = &CardRecord> {
        self.entries().map(|entry| &entry.record)
    }

    #[cfg(feature = "parallel")]
    pub(crate) fn par_entries(&self) -> impl ParallelIterator<Item = &CatalogEntry> {
        self.entries.par_iter().map(|(_, entry)| entry)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_from_entries_keys_by_id() {
        let fp = uniform_fingerprint(0);
        let catalog = Catalog::from_entries(vec![entry(1, [fp; 4]), entry(2, [fp; 4])]).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.record(2).unwrap().number_in_set, "2");
        assert!(catalog.get(3).is_none());
        let ids: Vec<_> = catalog.entries().map(CatalogEntry::id).collect();
        assert_eq!(ids, [1, 2]);
    }

    #[test]
    fn test_from_entries_rejects_gaps() {
        let fp = uniform_fingerprint(0);
        let err = Catalog::from_entries(vec![entry(1, [fp; 4]), entry(3, [fp; 4])]).unwrap_err();
        assert!(matches!(err, CardsightError::CatalogCorrupt(_)));
    }

    #[test]
    fn test_empty_catalog() {
        assert!(Catalog::empty().is_empty());
        assert!(Catalog::from_entries(Vec::new()).unwrap().is_empty());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_par_entries_visits_every_entry() {
        let fp = uniform_fingerprint(0);
        let entries = (1..=64).map(|id| entry(id, [fp; 4])).collect();
        let catalog = Catalog::from_entries(entries).unwrap();
        let mut ids: Vec<CardId> = catalog.par_entries().map(CatalogEntry::id).collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=64).collect::<Vec<_>>());
    }
}
