use std::borrow::Cow;
use std::fmt;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Geometric transform applied to an image before hashing.
///
/// A card can sit on the scanner face-up in any of these placements, so the
/// catalog stores one fingerprint per orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// The image as captured.
    Identity,
    /// Horizontal mirror.
    Mirror,
    /// 180° rotation.
    Flip,
    /// 180° rotation followed by a horizontal mirror.
    FlipMirror,
}

impl Orientation {
    /// All orientations in storage order.
    pub const ALL: [Orientation; 4] = [
        Orientation::Identity,
        Orientation::Mirror,
        Orientation::Flip,
        Orientation::FlipMirror,
    ];

    /// Suffix used in persisted field names (`avg` + `mir` = `avgmir`).
    pub fn suffix(self) -> &'static str {
        match self {
            Orientation::Identity => "",
            Orientation::Mirror => "mir",
            Orientation::Flip => "ud",
            Orientation::FlipMirror => "udmir",
        }
    }

    /// Position of this orientation in [`Orientation::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Apply the transform. The identity borrows instead of copying.
    pub fn apply(self, image: &DynamicImage) -> Cow<'_, DynamicImage> {
        match self {
            Orientation::Identity => Cow::Borrowed(image),
            Orientation::Mirror => Cow::Owned(image.fliph()),
            Orientation::Flip => Cow::Owned(image.rotate180()),
            Orientation::FlipMirror => Cow::Owned(image.rotate180().fliph()),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Identity => write!(f, "identity"),
            Orientation::Mirror => write!(f, "mirror"),
            Orientation::Flip => write!(f, "flip"),
            Orientation::FlipMirror => write!(f, "flip+mirror"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn corner_marked() -> DynamicImage {
        let mut img = GrayImage::new(3, 2);
        img.put_pixel(0, 0, Luma([255]));
        DynamicImage::ImageLuma8(img)
    }

    fn marked_position(image: &DynamicImage) -> (u32, u32) {
        let gray = image.to_luma8();
        let (x, y, _) = gray
            .enumerate_pixels()
            .find(|(_, _, p)| p.0[0] == 255)
            .unwrap();
        (x, y)
    }

    #[test]
    fn test_orientation_transforms() {
        let img = corner_marked();
        assert_eq!(marked_position(&Orientation::Identity.apply(&img)), (0, 0));
        assert_eq!(marked_position(&Orientation::Mirror.apply(&img)), (2, 0));
        assert_eq!(marked_position(&Orientation::Flip.apply(&img)), (2, 1));
        assert_eq!(marked_position(&Orientation::FlipMirror.apply(&img)), (0, 1));
    }

    #[test]
    fn test_identity_borrows() {
        let img = corner_marked();
        assert!(matches!(Orientation::Identity.apply(&img), Cow::Borrowed(_)));
    }

    #[test]
    fn test_suffixes_and_indices() {
        let suffixes: Vec<_> = Orientation::ALL.iter().map(|o| o.suffix()).collect();
        assert_eq!(suffixes, ["", "mir", "ud", "udmir"]);
        for (i, o) in Orientation::ALL.iter().enumerate() {
            assert_eq!(o.index(), i);
        }
    }
}
