use serde::{Deserialize, Serialize};

/// Crop rectangle in source-image pixel coordinates.
///
/// Coordinates come from the caller (typically a browser crop widget)
/// and are not required to lie inside the source image; the crop
/// operation pads whatever falls outside with transparency. Width and
/// height are always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// Build a rectangle from caller-supplied numbers, truncating toward
    /// zero. Returns `None` for non-finite values or a width/height that
    /// truncates below 1.
    pub fn from_f64(x: f64, y: f64, w: f64, h: f64) -> Option<Self> {
        if !x.is_finite() || !y.is_finite() || !w.is_finite() || !h.is_finite() {
            return None;
        }
        let w = w.trunc();
        let h = h.trunc();
        if w < 1.0 || h < 1.0 || w > u32::MAX as f64 || h > u32::MAX as f64 {
            return None;
        }
        Some(Self {
            x: x.trunc() as i64,
            y: y.trunc() as i64,
            width: w as u32,
            height: h as u32,
        })
    }
}

/// Axis-aligned region of a detected face, with detector confidence.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FaceRegion {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
    pub confidence: f32,
}

impl FaceRegion {
    /// Pixel area of the region.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Expand the region vertically by `fraction` of its height on each
    /// side, clamped to `[0, image_height)`. Detector boxes hug the face;
    /// the expansion keeps hair and headwear inside the crop.
    pub fn with_headroom(&self, fraction: f32, image_height: u32) -> FaceRegion {
        let pad = (self.height as f32 * fraction) as i64;
        let top = (self.y - pad).max(0);
        let height = (self.height as i64 + 2 * pad)
            .min(image_height as i64 - top)
            .max(0) as u32;
        FaceRegion {
            x: self.x,
            y: top,
            width: self.width,
            height,
            confidence: self.confidence,
        }
    }
}

impl From<FaceRegion> for CropRect {
    fn from(region: FaceRegion) -> Self {
        CropRect {
            x: region.x,
            y: region.y,
            width: region.width,
            height: region.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_f64_truncates() {
        let rect = CropRect::from_f64(10.9, -3.7, 200.5, 100.2).unwrap();
        assert_eq!(rect.x, 10);
        assert_eq!(rect.y, -3);
        assert_eq!(rect.width, 200);
        assert_eq!(rect.height, 100);
    }

    #[test]
    fn test_from_f64_rejects_zero_size() {
        assert!(CropRect::from_f64(0.0, 0.0, 0.9, 100.0).is_none());
        assert!(CropRect::from_f64(0.0, 0.0, 100.0, 0.0).is_none());
        assert!(CropRect::from_f64(0.0, 0.0, -5.0, 100.0).is_none());
    }

    #[test]
    fn test_from_f64_rejects_non_finite() {
        assert!(CropRect::from_f64(f64::NAN, 0.0, 10.0, 10.0).is_none());
        assert!(CropRect::from_f64(0.0, f64::INFINITY, 10.0, 10.0).is_none());
    }

    #[test]
    fn test_headroom_expands_both_sides() {
        let region = FaceRegion { x: 10, y: 100, width: 80, height: 100, confidence: 1.0 };
        let padded = region.with_headroom(0.35, 1000);
        assert_eq!(padded.y, 65);
        assert_eq!(padded.height, 170);
        assert_eq!(padded.x, 10);
        assert_eq!(padded.width, 80);
    }

    #[test]
    fn test_headroom_clamps_at_top() {
        let region = FaceRegion { x: 0, y: 10, width: 80, height: 100, confidence: 1.0 };
        let padded = region.with_headroom(0.35, 1000);
        assert_eq!(padded.y, 0);
        // The full 2x pad still applies from the clamped top edge.
        assert_eq!(padded.height, 170);
    }

    #[test]
    fn test_headroom_clamps_at_bottom() {
        let region = FaceRegion { x: 0, y: 150, width: 80, height: 100, confidence: 1.0 };
        let padded = region.with_headroom(0.35, 260);
        assert_eq!(padded.y, 115);
        assert_eq!(padded.y + padded.height as i64, 260);
    }
}
