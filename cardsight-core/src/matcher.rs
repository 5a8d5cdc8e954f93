//! Best-match search of a query fingerprint against the catalog.
//!
//! # Scoring
//!
//! For each catalog entry and each hash family, the query is compared with
//! the entry's four stored orientations and the smallest distance is kept.
//! The entry's score is the largest of those four per-family minima, so every
//! family must agree before an entry scores low. The lowest-scoring entry
//! wins (lowest id on ties) and is a match only when its score is strictly
//! below the cutoff.
//!
//! The default cutoff of 22 was tuned empirically against this max-of-min
//! reduction; it does not carry over to other reductions.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::catalog::{CardId, Catalog, CatalogEntry};
use crate::fingerprint::{Fingerprint, HashFamily, OrientedFingerprints};

/// Default acceptance cutoff.
pub const DEFAULT_CUTOFF: u32 = 22;

/// The identified card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub id: CardId,
    pub set_name: String,
    pub number_in_set: String,
}

/// Best-scoring catalog entry, whether or not it passed the cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoredCandidate {
    pub id: CardId,
    pub score: u32,
}

/// Outcome of a match attempt, with the raw best score for recalibration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchReport {
    pub cutoff: u32,
    /// `None` only for an empty catalog.
    pub best: Option<ScoredCandidate>,
    pub matched: Option<MatchResult>,
}

impl MatchReport {
    pub fn into_match(self) -> Option<MatchResult> {
        self.matched
    }

    pub fn best_score(&self) -> Option<u32> {
        self.best.map(|c| c.score)
    }
}

/// Score of one catalog entry against a query: max over families of the min
/// over stored orientations.
pub fn card_score(query: &Fingerprint, stored: &OrientedFingerprints) -> u32 {
    HashFamily::ALL
        .iter()
        .map(|&family| stored.min_distance(query, family))
        .max()
        .unwrap_or(0)
}

fn score_entry(query: &Fingerprint, entry: &CatalogEntry) -> ScoredCandidate {
    ScoredCandidate {
        id: entry.id(),
        score: card_score(query, &entry.fingerprints),
    }
}

/// Lowest-scoring entry of the catalog; ties go to the lowest id.
pub fn best_candidate(query: &Fingerprint, catalog: &Catalog) -> Option<ScoredCandidate> {
    #[cfg(feature = "parallel")]
    let best = catalog
        .par_entries()
        .map(|entry| score_entry(query, entry))
        .min_by_key(|c| (c.score, c.id));
    #[cfg(not(feature = "parallel"))]
    let best = catalog
        .entries()
        .map(|entry| score_entry(query, entry))
        .min_by_key(|c| (c.score, c.id));
    best
}

/// Matches query fingerprints against a catalog under a fixed cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Matcher {
    cutoff: u32,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(DEFAULT_CUTOFF)
    }
}

impl Matcher {
    pub fn new(cutoff: u32) -> Self {
        Self { cutoff }
    }

    pub fn cutoff(&self) -> u32 {
        self.cutoff
    }

    /// Find the catalog entry matching `query`, if any scores below the cutoff.
    ///
    /// The query is taken as already in canonical orientation. An empty
    /// catalog yields no match.
    pub fn match_fingerprint(&self, query: &Fingerprint, catalog: &Catalog) -> MatchReport {
        let best = best_candidate(query, catalog);
        let matched = best
            .filter(|c| c.score < self.cutoff)
            .and_then(|c| catalog.record(c.id))
            .map(|record| MatchResult {
                id: record.id,
                set_name: record.set_name.clone(),
                number_in_set: record.number_in_set.clone(),
            });

        match best {
            Some(c) => debug!(
                id = c.id,
                score = c.score,
                cutoff = self.cutoff,
                matched = matched.is_some(),
                "Best catalog candidate"
            ),
            None => debug!("Catalog is empty"),
        }

        MatchReport {
            cutoff: self.cutoff,
            best,
            matched,
        }
    }
}
