//! medallion-core — Circular-cutout compositing engine.
//!
//! Crops a caller-chosen region out of a photograph, masks it into a
//! circular cutout, and pastes it onto a poster template at the
//! placement that template declares. Face localization via the
//! SeetaFace frontal cascade suggests crop rectangles.

pub mod compositor;
pub mod detector;
pub mod template;
pub mod types;

pub use compositor::{composite, circular_cutout, crop, encode_png, render};
pub use detector::{locate_face, FaceDetector, SeetaFaceDetector};
pub use template::{Placement, Template};
pub use types::{CropRect, FaceRegion};
