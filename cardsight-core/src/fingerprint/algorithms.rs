//! The four hash families.
//!
//! Each function converts the image to 8-bit luminance with the ITU-R 601
//! weights (299/587/114, as PIL's `convert("L")` does) and downsamples it with
//! a Lanczos filter before thresholding, so callers may pass any resolution.
//! The default match cutoff was tuned on hashes of exactly this luminance;
//! `DynamicImage::grayscale` (Rec. 709 weights) would shift colour images.

use std::f64::consts::PI;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};

use super::hash::PerceptualHash;

/// Side of the hash grid (8×8 = 64 bits).
const HASH_SIDE: usize = 8;

/// Side of the DCT input for the perceptual hash (4× oversampling).
const DCT_SIDE: usize = HASH_SIDE * 4;

/// 8-bit luminance with ITU-R 601 weights in 16-bit fixed point, rounded.
fn luma_601(image: &DynamicImage) -> GrayImage {
    let rgb = image.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0.map(u32::from);
        Luma([((r * 19595 + g * 38470 + b * 7471 + 0x8000) >> 16) as u8])
    })
}

/// Luminance of the image resampled to exactly `width`×`height`.
fn luma_grid(image: &DynamicImage, width: usize, height: usize) -> Vec<f64> {
    let gray = luma_601(image);
    imageops::resize(&gray, width as u32, height as u32, FilterType::Lanczos3)
        .pixels()
        .map(|p| f64::from(p.0[0]))
        .collect()
}

/// Median as numpy computes it: mean of the two middle values for even lengths.
fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn threshold_above(values: &[f64], threshold: f64) -> PerceptualHash {
    PerceptualHash::from_bits(values.iter().map(|&v| v > threshold))
}

/// Average hash: luminance above the 8×8 block mean.
pub fn average_hash(image: &DynamicImage) -> PerceptualHash {
    let pixels = luma_grid(image, HASH_SIDE, HASH_SIDE);
    let mean = pixels.iter().sum::<f64>() / pixels.len() as f64;
    threshold_above(&pixels, mean)
}

/// Difference hash: each bit says whether a pixel is brighter than its left
/// neighbour, over a 9×8 grid.
pub fn difference_hash(image: &DynamicImage) -> PerceptualHash {
    let width = HASH_SIDE + 1;
    let pixels = luma_grid(image, width, HASH_SIDE);
    let bits = pixels
        .chunks_exact(width)
        .flat_map(|row| row.windows(2).map(|pair| pair[1] > pair[0]));
    PerceptualHash::from_bits(bits)
}

/// Perceptual hash: sign of the low-frequency DCT coefficients relative to
/// their median.
pub fn perceptual_hash(image: &DynamicImage) -> PerceptualHash {
    let pixels = luma_grid(image, DCT_SIDE, DCT_SIDE);
    let low = dct_low_frequencies(&pixels, DCT_SIDE, HASH_SIDE);
    threshold_above(&low, median(&low))
}

/// Unnormalized 2-D DCT-II of a `side`×`side` grid, keeping only the top-left
/// `keep`×`keep` coefficients.
fn dct_low_frequencies(pixels: &[f64], side: usize, keep: usize) -> Vec<f64> {
    let basis: Vec<f64> = (0..keep)
        .flat_map(|k| {
            (0..side).map(move |n| {
                2.0 * (PI * k as f64 * (2 * n + 1) as f64 / (2 * side) as f64).cos()
            })
        })
        .collect();

    // Transform columns first, then rows, as scipy's dct(dct(x, axis=0), axis=1).
    let mut columns = vec![0.0; keep * side];
    for u in 0..keep {
        for x in 0..side {
            columns[u * side + x] = (0..side)
                .map(|y| basis[u * side + y] * pixels[y * side + x])
                .sum();
        }
    }

    let mut low = vec![0.0; keep * keep];
    for u in 0..keep {
        for v in 0..keep {
            low[u * keep + v] = (0..side)
                .map(|x| basis[v * side + x] * columns[u * side + x])
                .sum();
        }
    }
    low
}

/// Wavelet hash: Haar approximation band relative to its median, after the
/// image's overall brightness (the coarsest LL coefficient) is removed.
pub fn wavelet_hash(image: &DynamicImage) -> PerceptualHash {
    let smaller_side = image.width().min(image.height()).max(1);
    let scale = (1usize << smaller_side.ilog2()).max(HASH_SIDE);
    let dwt_levels = scale.ilog2() - HASH_SIDE.ilog2();

    let mut values: Vec<f64> = luma_grid(image, scale, scale)
        .into_iter()
        .map(|p| p / 255.0)
        .collect();

    // Zeroing the full-depth Haar LL coefficient and reconstructing is the
    // same as subtracting the mean.
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter_mut().for_each(|v| *v -= mean);

    let mut side = scale;
    for _ in 0..dwt_levels {
        values = haar_approximation(&values, side);
        side /= 2;
    }
    threshold_above(&values, median(&values))
}

/// One level of the orthonormal 2-D Haar transform, approximation band only.
fn haar_approximation(values: &[f64], side: usize) -> Vec<f64> {
    let half = side / 2;
    let mut out = Vec::with_capacity(half * half);
    for y in 0..half {
        for x in 0..half {
            let (upper, lower) = (2 * y * side + 2 * x, (2 * y + 1) * side + 2 * x);
            let top = values[upper] + values[upper + 1];
            let bottom = values[lower] + values[lower + 1];
            out.push((top + bottom) / 2.0);
        }
    }
    out
}
