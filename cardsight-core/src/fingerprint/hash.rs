//! Fixed-width perceptual hash values.
//!
//! Every hash family used by the catalog produces exactly 64 bits (an 8×8
//! grid). Bits are packed row-major, the first grid cell landing in the most
//! significant bit of the first byte, so the lowercase hex rendering reads the
//! grid left to right, top to bottom.
//!
//! # Usage
//!
//! ```
//! use cardsight_core::fingerprint::PerceptualHash;
//!
//! let a = PerceptualHash::from_hex("ffd8c0c0e0f0f8ff").unwrap();
//! let b = PerceptualHash::from_hex("ffd8c0c0e0f0f8fe").unwrap();
//! assert_eq!(a.hamming_distance(&b), 1);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CardsightError, Result};

/// Fixed hash size in bytes (64 bits = 8 bytes).
pub const HASH_BYTES: usize = 8;

/// Fixed hash size in bits.
pub const HASH_BITS: u32 = (HASH_BYTES * 8) as u32;

/// A 64-bit perceptual hash.
///
/// The distance metric operates on the bit vector; the hex string is only
/// the storage form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PerceptualHash([u8; HASH_BYTES]);

impl PerceptualHash {
    /// Create a hash from its packed bytes.
    pub const fn new(bytes: [u8; HASH_BYTES]) -> Self {
        Self(bytes)
    }

    /// Pack a sequence of threshold decisions into a hash.
    ///
    /// The first bit becomes the most significant bit of the first byte.
    /// Bits past [`HASH_BITS`] are ignored; missing bits stay zero.
    pub fn from_bits<I>(bits: I) -> Self
    where
        I: IntoIterator<Item = bool>,
    {
        let mut bytes = [0u8; HASH_BYTES];
        for (index, bit) in bits.into_iter().take(HASH_BITS as usize).enumerate() {
            if bit {
                bytes[index / 8] |= 0x80 >> (index % 8);
            }
        }
        Self(bytes)
    }

    /// The packed hash bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_BYTES] {
        &self.0
    }

    /// Number of differing bit positions between two hashes.
    pub fn hamming_distance(&self, other: &Self) -> u32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }

    /// Get the hash as a lowercase hexadecimal string (16 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a hash from its hexadecimal form.
    ///
    /// Rejects anything that is not exactly 16 hex digits.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let decoded = hex::decode(hex_str)
            .map_err(|e| CardsightError::InvalidHash(format!("{hex_str:?}: {e}")))?;
        let bytes: [u8; HASH_BYTES] = decoded.try_into().map_err(|v: Vec<u8>| {
            CardsightError::InvalidHash(format!(
                "{hex_str:?}: expected {HASH_BYTES} bytes, got {}",
                v.len()
            ))
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for PerceptualHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for PerceptualHash {
    type Err = CardsightError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serialize for PerceptualHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PerceptualHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let hex_str = String::deserialize(deserializer)?;
        Self::from_hex(&hex_str).map_err(serde::de::Error::custom)
    }
}
