//! Physical card dimensions.

/// Card width in centimetres.
pub const CARD_WIDTH_CM: f64 = 6.6;
/// Card height in centimetres.
pub const CARD_HEIGHT_CM: f64 = 8.8;
/// Width over height of a portrait card (0.75).
pub const CARD_ASPECT_RATIO: f64 = CARD_WIDTH_CM / CARD_HEIGHT_CM;

/// Relative aspect deviation tolerated before a query is flagged.
pub const ASPECT_TOLERANCE: f64 = 0.15;

/// Pixel size of a rectified card image at the given resolution.
pub fn canonical_card_size(pixels_per_cm: f64) -> (u32, u32) {
    (
        (CARD_WIDTH_CM * pixels_per_cm).round() as u32,
        (CARD_HEIGHT_CM * pixels_per_cm).round() as u32,
    )
}

/// Relative difference between an image's aspect ratio and a card's.
pub fn aspect_deviation(width: u32, height: u32) -> f64 {
    if width == 0 || height == 0 {
        return f64::INFINITY;
    }
    let ratio = f64::from(width) / f64::from(height);
    (ratio - CARD_ASPECT_RATIO).abs() / CARD_ASPECT_RATIO
}
