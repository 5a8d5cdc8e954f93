//! End-to-end tests for catalog building, staleness and matching.
//!
//! Reference trees are synthesized into temporary directories from seeded
//! block patterns, so every card is visually distinct and reproducible.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::{DynamicImage, Rgb, RgbImage};
use tempfile::TempDir;

use cardsight_core::catalog::{skipped_by_last_build, CatalogGeneration, CatalogStore, StaleReason};
use cardsight_core::geometry::canonical_card_size;
use cardsight_core::{
    build_catalog, check_staleness, compute_fingerprint, is_stale, CardIdentifier,
    CardsightError, Catalog, CatalogConfig, Matcher, Orientation, Staleness, DEFAULT_CUTOFF,
};

/// Side of one colour block, in pixels.
const BLOCK: u32 = 11;

/// Deterministic card-like image at 20 px/cm: a 12×16 grid of pseudo-random
/// colour blocks.
fn card_image(seed: u64) -> DynamicImage {
    let (width, height) = canonical_card_size(20.0);
    let columns = width / BLOCK;
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut blocks = Vec::with_capacity((columns * (height / BLOCK)) as usize);
    for _ in 0..blocks.capacity() {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let bytes = (state >> 24).to_le_bytes();
        blocks.push(Rgb([bytes[0], bytes[1], bytes[2]]));
    }
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        blocks[((y / BLOCK) * columns + x / BLOCK) as usize]
    }))
}

fn write_card(root: &Path, set: &str, number: &str, seed: u64) -> PathBuf {
    let path = root.join(set).join(format!("{number}.png"));
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    card_image(seed).save(&path).unwrap();
    path
}

struct Workspace {
    temp: TempDir,
    config: CatalogConfig,
}

impl Workspace {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let config = CatalogConfig {
            reference_root: temp.path().join("cards"),
            catalog_dir: temp.path().join("catalog"),
            ..CatalogConfig::default()
        };
        Self { temp, config }
    }

    /// Two sets, deliberately created out of order.
    fn with_sample_sets() -> Self {
        let ws = Self::new();
        let root = &ws.config.reference_root;
        write_card(root, "jungle", "2", 21);
        write_card(root, "jungle", "1", 20);
        write_card(root, "base", "10", 12);
        write_card(root, "base", "2", 11);
        write_card(root, "base", "1", 10);
        ws
    }

    fn root(&self) -> &Path {
        &self.config.reference_root
    }

    fn store(&self) -> CatalogStore {
        CatalogStore::from_config(&self.config)
    }

    fn live(&self) -> CatalogGeneration {
        self.store().current().unwrap().unwrap()
    }
}

// ============================================================================
// Building
// ============================================================================

#[test]
fn test_ids_are_dense_and_ordered() {
    let ws = Workspace::with_sample_sets();
    let report = build_catalog(&ws.config).unwrap();
    assert!(report.skipped.is_empty());

    let ids: Vec<_> = report
        .catalog
        .records()
        .map(|r| (r.id, r.set_name.as_str(), r.number_in_set.as_str()))
        .collect();
    assert_eq!(
        ids,
        [
            (1, "base", "1"),
            (2, "base", "2"),
            (3, "base", "10"),
            (4, "jungle", "1"),
            (5, "jungle", "2"),
        ]
    );
}

#[test]
fn test_rebuild_is_byte_identical() {
    let ws = Workspace::with_sample_sets();

    build_catalog(&ws.config).unwrap();
    let first = ws.live();
    let index = fs::read(first.index_path()).unwrap();
    let fingerprints = fs::read(first.store_path()).unwrap();

    build_catalog(&ws.config).unwrap();
    let second = ws.live();
    assert_eq!(fs::read(second.index_path()).unwrap(), index);
    assert_eq!(fs::read(second.store_path()).unwrap(), fingerprints);
}

#[test]
fn test_persisted_catalog_round_trips() {
    let ws = Workspace::with_sample_sets();
    let built = build_catalog(&ws.config).unwrap().catalog;
    assert_eq!(ws.store().load().unwrap(), built);
    assert_eq!(ws.store().load_index().unwrap().len(), 5);
}

#[test]
fn test_leading_zeros_preserved() {
    let ws = Workspace::new();
    write_card(ws.root(), "promo", "007", 7);
    write_card(ws.root(), "promo", "3", 3);

    let catalog = build_catalog(&ws.config).unwrap().catalog;
    let numbers: Vec<_> = catalog.records().map(|r| r.number_in_set.clone()).collect();
    assert_eq!(numbers, ["3", "007"]);
}

// ============================================================================
// Matching
// ============================================================================

#[test]
fn test_every_reference_image_matches_itself() {
    let ws = Workspace::with_sample_sets();
    let catalog = build_catalog(&ws.config).unwrap().catalog;
    let matcher = Matcher::default();

    for record in catalog.records() {
        let path = ws
            .root()
            .join(&record.set_name)
            .join(format!("{}.png", record.number_in_set));
        let image = image::open(&path).unwrap();
        let query = compute_fingerprint(&image, Orientation::Identity);

        let report = matcher.match_fingerprint(&query, &catalog);
        assert_eq!(report.best_score(), Some(0));
        assert_eq!(report.matched.unwrap().id, record.id);
    }
}

#[test]
fn test_reoriented_query_resolves_to_same_card() {
    let ws = Workspace::with_sample_sets();
    let catalog = build_catalog(&ws.config).unwrap().catalog;
    let original = image::open(ws.root().join("base/2.png")).unwrap();

    let placements = [
        original.fliph(),
        original.rotate180(),
        original.flipv(),
    ];
    for placed in placements {
        let query = compute_fingerprint(&placed, Orientation::Identity);
        let report = Matcher::default().match_fingerprint(&query, &catalog);
        let best = report.best.unwrap();
        assert!(best.score <= DEFAULT_CUTOFF);
        assert_eq!(report.matched.unwrap().number_in_set, "2");
    }
}

#[test]
fn test_resized_query_still_matches() {
    let ws = Workspace::with_sample_sets();
    let catalog = build_catalog(&ws.config).unwrap().catalog;
    let original = image::open(ws.root().join("jungle/1.png")).unwrap();
    let (width, height) = canonical_card_size(50.0);
    let scanned = original.resize_exact(width, height, image::imageops::FilterType::Triangle);

    let query = compute_fingerprint(&scanned, Orientation::Identity);
    let report = Matcher::default().match_fingerprint(&query, &catalog);
    let card = report.matched.expect("resized scan should match");
    assert_eq!((card.set_name.as_str(), card.number_in_set.as_str()), ("jungle", "1"));
}

#[test]
fn test_unknown_card_is_no_match() {
    let ws = Workspace::with_sample_sets();
    let catalog = build_catalog(&ws.config).unwrap().catalog;

    let stranger = compute_fingerprint(&card_image(999), Orientation::Identity);
    let report = Matcher::default().match_fingerprint(&stranger, &catalog);
    assert!(report.best.is_some());
    assert!(report.matched.is_none());
}

#[test]
fn test_empty_catalog_is_no_match() {
    let query = compute_fingerprint(&card_image(1), Orientation::Identity);
    let report = Matcher::default().match_fingerprint(&query, &Catalog::empty());
    assert!(report.best.is_none());
    assert!(report.into_match().is_none());
}

// ============================================================================
// Staleness
// ============================================================================

#[test]
fn test_added_image_makes_catalog_stale() {
    let ws = Workspace::with_sample_sets();
    build_catalog(&ws.config).unwrap();
    let exts = &ws.config.image_extensions;
    assert!(!is_stale(ws.root(), &ws.store(), exts));

    write_card(ws.root(), "jungle", "3", 22);
    assert_eq!(
        check_staleness(ws.root(), &ws.store(), exts),
        Staleness::Stale(StaleReason::CountMismatch {
            persisted: 5,
            on_disk: 6
        })
    );
}

#[test]
fn test_undecodable_reference_keeps_catalog_stale_and_is_named() {
    let ws = Workspace::with_sample_sets();
    let broken = ws.root().join("jungle/3.png");
    fs::write(&broken, b"truncated download").unwrap();

    let report = build_catalog(&ws.config).unwrap();
    assert_eq!(report.catalog.len(), 5);
    assert_eq!(report.skipped[0].path, broken);

    let exts = &ws.config.image_extensions;
    assert!(is_stale(ws.root(), &ws.store(), exts));
    assert_eq!(
        skipped_by_last_build(ws.root(), &ws.store(), exts).unwrap(),
        [broken.clone()]
    );

    fs::remove_file(&broken).unwrap();
    assert!(!is_stale(ws.root(), &ws.store(), exts));
}

#[test]
fn test_touching_outside_file_keeps_catalog_fresh() {
    let ws = Workspace::with_sample_sets();
    build_catalog(&ws.config).unwrap();

    let outside = ws.temp.path().join("unrelated.png");
    card_image(5).save(&outside).unwrap();
    let later = ws.store().store_modified().unwrap() + Duration::from_secs(120);
    File::options()
        .write(true)
        .open(&outside)
        .unwrap()
        .set_modified(later)
        .unwrap();

    assert!(!is_stale(ws.root(), &ws.store(), &ws.config.image_extensions));
}

// ============================================================================
// CardIdentifier
// ============================================================================

#[test]
fn test_open_builds_missing_catalog() {
    let ws = Workspace::with_sample_sets();
    assert!(!ws.store().exists());

    let identifier = CardIdentifier::open(ws.config.clone()).unwrap();
    assert!(ws.store().exists());
    assert_eq!(identifier.catalog().len(), 5);

    let report = identifier
        .identify_path(&ws.root().join("base/10.png"))
        .unwrap();
    assert_eq!(report.matched.unwrap().id, 3);
}

#[test]
fn test_open_without_anything_is_not_initialized() {
    let ws = Workspace::new();
    let err = CardIdentifier::open(ws.config.clone()).err().unwrap();
    assert!(matches!(err, CardsightError::CatalogNotInitialized(_)));
}

#[test]
fn test_open_keeps_catalog_when_references_vanish() {
    let ws = Workspace::with_sample_sets();
    build_catalog(&ws.config).unwrap();
    fs::remove_dir_all(ws.root()).unwrap();

    let identifier = CardIdentifier::open(ws.config.clone()).unwrap();
    assert_eq!(identifier.catalog().len(), 5);
}

#[test]
fn test_open_rebuilds_corrupt_catalog() {
    let ws = Workspace::with_sample_sets();
    build_catalog(&ws.config).unwrap();

    let store = ws.store();
    let mut index = store.load_index().unwrap();
    index.swap(0, 1);
    fs::write(ws.live().index_path(), serde_json::to_vec(&index).unwrap()).unwrap();
    assert!(matches!(store.load(), Err(CardsightError::CatalogCorrupt(_))));

    let identifier = CardIdentifier::open(ws.config.clone()).unwrap();
    assert_eq!(identifier.catalog().len(), 5);
    assert!(store.load().is_ok());
}

#[test]
fn test_rebuild_while_loading_never_tears() {
    let ws = Workspace::with_sample_sets();
    let identifier = CardIdentifier::open(ws.config.clone()).unwrap();
    write_card(ws.root(), "base", "3", 13);

    std::thread::scope(|scope| {
        let rebuilds = scope.spawn(|| {
            for _ in 0..5 {
                identifier.rebuild().unwrap();
            }
        });
        while !rebuilds.is_finished() {
            let len = ws.store().load().unwrap().len();
            assert!(len == 5 || len == 6);
        }
    });
    assert_eq!(ws.store().load().unwrap().len(), 6);
}

#[test]
fn test_load_surfaces_missing_catalog() {
    let ws = Workspace::with_sample_sets();
    let err = CardIdentifier::load(ws.config.clone()).err().unwrap();
    assert!(matches!(err, CardsightError::CatalogNotInitialized(_)));
}

#[test]
fn test_rebuild_swaps_snapshot() {
    let ws = Workspace::with_sample_sets();
    let identifier = CardIdentifier::open(ws.config.clone()).unwrap();
    let before = identifier.catalog();

    let added = write_card(ws.root(), "base", "3", 13);
    let summary = identifier.rebuild().unwrap();
    assert_eq!(summary.entries, 6);
    assert!(summary.skipped.is_empty());

    // Readers holding the old snapshot are unaffected.
    assert_eq!(before.len(), 5);
    assert_eq!(identifier.catalog().len(), 6);

    let report = identifier.identify_path(&added).unwrap();
    let card = report.matched.unwrap();
    assert_eq!((card.id, card.number_in_set.as_str()), (3, "3"));
}

#[test]
fn test_undecodable_query_is_decode_error() {
    let ws = Workspace::with_sample_sets();
    let identifier = CardIdentifier::open(ws.config.clone()).unwrap();

    let bogus = ws.temp.path().join("scan.png");
    fs::write(&bogus, b"definitely not a png").unwrap();
    assert!(matches!(
        identifier.identify_path(&bogus),
        Err(CardsightError::ImageDecode { .. })
    ));
}

#[test]
fn test_open_rejects_invalid_config() {
    let ws = Workspace::with_sample_sets();
    let config = CatalogConfig {
        cutoff: 0,
        ..ws.config.clone()
    };
    assert!(matches!(
        CardIdentifier::open(config),
        Err(CardsightError::InvalidConfig(_))
    ));
}
