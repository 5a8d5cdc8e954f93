//! Cardsight Core - perceptual fingerprint catalog for trading card recognition
//!
//! This crate identifies a rectified photo of a trading card by comparing its
//! perceptual fingerprint against a catalog precomputed from reference images.
//!
//! # Features
//!
//! - Four independent 64-bit hash families (average, wavelet, DCT, difference)
//! - Reference fingerprints stored for four orientations per card
//! - Cheap staleness checks so the catalog is only rebuilt when needed
//! - Consensus scoring: every hash family must agree for a match
//! - Atomic catalog replacement and a shared, swap-on-rebuild catalog
//!
//! # Example
//!
//! ```no_run
//! use cardsight_core::{CardIdentifier, CatalogConfig};
//!
//! # fn example() -> cardsight_core::Result<()> {
//! // Rebuilds the catalog from ./cards if it is missing or stale
//! let identifier = CardIdentifier::open(CatalogConfig::default())?;
//!
//! let report = identifier.identify_path("scan.png".as_ref())?;
//! match report.matched {
//!     Some(card) => println!("{} #{}", card.set_name, card.number_in_set),
//!     None => println!("no match (best score {:?})", report.best_score()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod geometry;
pub mod matcher;
pub mod service;

// Re-export main types for convenience
pub use catalog::{
    build_catalog, check_staleness, is_stale, BuildReport, CardId, CardRecord, Catalog,
    CatalogEntry, CatalogStore, Staleness,
};
pub use config::CatalogConfig;
pub use error::{CardsightError, Result};
pub use fingerprint::{
    compute_fingerprint, compute_oriented_fingerprints, Fingerprint, HashFamily, Orientation,
    OrientedFingerprints, PerceptualHash,
};
pub use matcher::{MatchReport, MatchResult, Matcher, ScoredCandidate, DEFAULT_CUTOFF};
pub use service::{CardIdentifier, RebuildSummary};
