//! Face localization via the SeetaFace frontal cascade.
//!
//! Detection is a suggestion mechanism: it proposes a crop rectangle
//! for the compositing pipeline, which always works from whatever
//! rectangle the caller finally supplies.

use crate::types::FaceRegion;
use image::{DynamicImage, GrayImage};
use rustface::ImageData;
use std::path::Path;
use thiserror::Error;

const MIN_FACE_SIZE: u32 = 80;
const SCORE_THRESHOLD: f64 = 2.0;
const PYRAMID_SCALE_FACTOR: f32 = 0.8;
const SLIDE_WINDOW_STEP: u32 = 4;
/// Vertical padding as a fraction of face height, so hair and headwear
/// stay inside the suggested crop.
const HEADROOM_FRACTION: f32 = 0.35;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0} — download seeta_fd_frontal_v1.0.bin and place it there")]
    ModelNotFound(String),
    #[error("failed to load detection model {path}: {reason}")]
    ModelLoad { path: String, reason: String },
}

/// Pluggable face detection backend.
///
/// Implementations receive an explicit grayscale buffer; color-space
/// conversion is the caller's job and happens exactly once, in
/// [`locate_face`].
pub trait FaceDetector: Send {
    /// Detect faces in `gray`, returning regions in pixel coordinates.
    fn detect(&mut self, gray: &GrayImage) -> Vec<FaceRegion>;
}

/// SeetaFace frontal-cascade detector backed by rustface.
pub struct SeetaFaceDetector {
    inner: Box<dyn rustface::Detector>,
}

// SAFETY: `rustface::create_detector` returns `Box<dyn Detector>`, whose
// trait object erases the `Send` marker even though the concrete
// `FuStDetector` it boxes owns only `Vec`s, primitives, and `fn`
// pointers — all `Send`. The engine moves the detector onto a dedicated
// thread (and the `FaceDetector: Send` bound requires it), so we restore
// the marker the type erasure dropped.
unsafe impl Send for SeetaFaceDetector {}

impl SeetaFaceDetector {
    /// Load the cascade model from the given path and apply the tuning
    /// used by the service: 80px minimum face, moderate score cutoff.
    pub fn load(model_path: &Path) -> Result<Self, DetectorError> {
        if !model_path.exists() {
            return Err(DetectorError::ModelNotFound(
                model_path.display().to_string(),
            ));
        }

        let mut inner = rustface::create_detector(&model_path.to_string_lossy()).map_err(|err| {
            DetectorError::ModelLoad {
                path: model_path.display().to_string(),
                reason: err.to_string(),
            }
        })?;
        inner.set_min_face_size(MIN_FACE_SIZE);
        inner.set_score_thresh(SCORE_THRESHOLD);
        inner.set_pyramid_scale_factor(PYRAMID_SCALE_FACTOR);
        inner.set_slide_window_step(SLIDE_WINDOW_STEP, SLIDE_WINDOW_STEP);

        tracing::info!(path = %model_path.display(), "cascade detector loaded");
        Ok(Self { inner })
    }
}

impl FaceDetector for SeetaFaceDetector {
    fn detect(&mut self, gray: &GrayImage) -> Vec<FaceRegion> {
        let image_data = ImageData::new(gray.as_raw(), gray.width(), gray.height());
        self.inner
            .detect(&image_data)
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                FaceRegion {
                    x: bbox.x() as i64,
                    y: bbox.y() as i64,
                    width: bbox.width(),
                    height: bbox.height(),
                    confidence: face.score() as f32,
                }
            })
            .collect()
    }
}

/// Locate the most prominent face in `photo` and suggest a crop region.
///
/// Converts to grayscale, runs the detector, picks the largest face by
/// area, and expands it vertically by [`HEADROOM_FRACTION`] clamped to
/// the image bounds. Returns `None` when no face is found.
pub fn locate_face(detector: &mut dyn FaceDetector, photo: &DynamicImage) -> Option<FaceRegion> {
    let gray = photo.to_luma8();
    let faces = detector.detect(&gray);
    tracing::debug!(count = faces.len(), "faces detected");

    let best = faces.into_iter().max_by_key(|f| f.area())?;
    Some(best.with_headroom(HEADROOM_FRACTION, gray.height()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    /// Scripted detector: returns a fixed set of regions.
    struct StubDetector {
        regions: Vec<FaceRegion>,
    }

    impl FaceDetector for StubDetector {
        fn detect(&mut self, _gray: &GrayImage) -> Vec<FaceRegion> {
            self.regions.clone()
        }
    }

    fn region(x: i64, y: i64, w: u32, h: u32) -> FaceRegion {
        FaceRegion { x, y, width: w, height: h, confidence: 3.0 }
    }

    fn photo(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::new(width, height))
    }

    #[test]
    fn test_locate_face_none_when_empty() {
        let mut detector = StubDetector { regions: vec![] };
        assert!(locate_face(&mut detector, &photo(640, 480)).is_none());
    }

    #[test]
    fn test_locate_face_picks_largest() {
        let mut detector = StubDetector {
            regions: vec![
                region(0, 100, 80, 80),
                region(200, 100, 160, 160),
                region(400, 100, 100, 100),
            ],
        };
        let best = locate_face(&mut detector, &photo(640, 480)).unwrap();
        assert_eq!(best.x, 200);
        assert_eq!(best.width, 160);
    }

    #[test]
    fn test_locate_face_applies_headroom() {
        let mut detector = StubDetector {
            regions: vec![region(100, 200, 100, 100)],
        };
        let best = locate_face(&mut detector, &photo(640, 480)).unwrap();
        // pad = 35: top moves up, height grows by 2x pad (clamped to 480).
        assert_eq!(best.y, 165);
        assert_eq!(best.height, 170);
    }

    #[test]
    fn test_locate_face_headroom_clamped_to_image() {
        let mut detector = StubDetector {
            regions: vec![region(100, 10, 100, 100)],
        };
        let best = locate_face(&mut detector, &photo(640, 120)).unwrap();
        assert_eq!(best.y, 0);
        assert!(best.y + best.height as i64 <= 120);
    }
}
