//! Perceptual fingerprints of card images.
//!
//! A [`Fingerprint`] bundles four independent 64-bit hashes of one image in
//! one [`Orientation`]. Reference cards carry all four orientations
//! ([`OrientedFingerprints`]); queries are hashed once, as captured.
//!
//! # Components
//!
//! - **Hash families**: average, wavelet, perceptual (DCT) and difference
//!   hashes, see [`algorithms`].
//! - **Orientations**: identity, mirror, 180° rotation, rotation + mirror.

pub mod algorithms;
pub mod hash;
pub mod orientation;

use std::path::Path;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::{CardsightError, Result};

pub use hash::{PerceptualHash, HASH_BITS, HASH_BYTES};
pub use orientation::Orientation;

/// One of the four independent hashing algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashFamily {
    Average,
    Wavelet,
    Perceptual,
    Difference,
}

impl HashFamily {
    pub const ALL: [HashFamily; 4] = [
        HashFamily::Average,
        HashFamily::Wavelet,
        HashFamily::Perceptual,
        HashFamily::Difference,
    ];

    /// Prefix used in persisted field names.
    pub fn prefix(self) -> &'static str {
        match self {
            HashFamily::Average => "avg",
            HashFamily::Wavelet => "w",
            HashFamily::Perceptual => "p",
            HashFamily::Difference => "d",
        }
    }

    fn compute(self, image: &DynamicImage) -> PerceptualHash {
        match self {
            HashFamily::Average => algorithms::average_hash(image),
            HashFamily::Wavelet => algorithms::wavelet_hash(image),
            HashFamily::Perceptual => algorithms::perceptual_hash(image),
            HashFamily::Difference => algorithms::difference_hash(image),
        }
    }
}

/// All four family hashes of one image in one orientation.
///
/// Never partially populated: the only constructors take all four values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub average: PerceptualHash,
    pub wavelet: PerceptualHash,
    pub perceptual: PerceptualHash,
    pub difference: PerceptualHash,
}

impl Fingerprint {
    pub fn get(&self, family: HashFamily) -> PerceptualHash {
        match family {
            HashFamily::Average => self.average,
            HashFamily::Wavelet => self.wavelet,
            HashFamily::Perceptual => self.perceptual,
            HashFamily::Difference => self.difference,
        }
    }

    /// Hamming distance between two fingerprints within one family.
    pub fn distance(&self, other: &Self, family: HashFamily) -> u32 {
        self.get(family).hamming_distance(&other.get(family))
    }
}

/// Fingerprints of one reference image under every [`Orientation`],
/// indexed by [`Orientation::index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrientedFingerprints([Fingerprint; 4]);

impl OrientedFingerprints {
    pub fn new(by_orientation: [Fingerprint; 4]) -> Self {
        Self(by_orientation)
    }

    pub fn get(&self, orientation: Orientation) -> &Fingerprint {
        &self.0[orientation.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Orientation, &Fingerprint)> {
        Orientation::ALL.into_iter().zip(self.0.iter())
    }

    /// Smallest distance from `query` to any stored orientation in `family`.
    pub fn min_distance(&self, query: &Fingerprint, family: HashFamily) -> u32 {
        self.0
            .iter()
            .map(|stored| query.distance(stored, family))
            .min()
            .unwrap_or(HASH_BITS)
    }
}

/// Compute the fingerprint of `image` after applying `orientation`.
///
/// Pure function of its inputs; no error path once the image is decoded.
pub fn compute_fingerprint(image: &DynamicImage, orientation: Orientation) -> Fingerprint {
    let oriented = orientation.apply(image);
    let [average, wavelet, perceptual, difference] =
        HashFamily::ALL.map(|family| family.compute(&oriented));
    Fingerprint {
        average,
        wavelet,
        perceptual,
        difference,
    }
}

/// Compute the fingerprint of `image` under all four orientations.
pub fn compute_oriented_fingerprints(image: &DynamicImage) -> OrientedFingerprints {
    OrientedFingerprints(Orientation::ALL.map(|o| compute_fingerprint(image, o)))
}

/// Decode an image file, mapping failures to [`CardsightError::ImageDecode`].
pub fn open_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|source| CardsightError::ImageDecode {
        path: path.to_path_buf(),
        source,
    })
}
