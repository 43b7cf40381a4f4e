//! Poster template and cutout placement.
//!
//! The placement is metadata of a specific template asset: the same
//! cutout diameter pasted at the same offset only lines up on the
//! artwork it was measured against. The two therefore travel together:
//! a template image may ship a `<name>.toml` sidecar declaring its
//! placement, and the pair is validated at load time.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Placement for the stock template asset (3000×3800 poster).
pub const DEFAULT_PLACEMENT: Placement = Placement {
    diameter: 900,
    x: 100,
    y: 2550,
};

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("template image not found: {0}")]
    NotFound(String),
    #[error("failed to decode template image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("failed to read placement sidecar {path}: {reason}")]
    Sidecar { path: String, reason: String },
    #[error("placement diameter must be at least 1")]
    ZeroDiameter,
    #[error(
        "placement (diameter {diameter} at {x},{y}) does not fit within the {width}x{height} template"
    )]
    PlacementOutOfBounds {
        diameter: u32,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
}

/// Where the circular cutout lands on a template: side length of the
/// bounding square and the offset of its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub diameter: u32,
    pub x: u32,
    pub y: u32,
}

/// Sidecar file schema: `[placement]` table next to the template image.
#[derive(Debug, Deserialize)]
struct TemplateMeta {
    placement: Placement,
}

/// A read-only poster template with its validated placement.
pub struct Template {
    image: RgbaImage,
    placement: Placement,
}

impl Template {
    /// Load a template image and its placement.
    ///
    /// A `<path stem>.toml` sidecar overrides [`DEFAULT_PLACEMENT`].
    /// Fails if the image is missing or undecodable, the sidecar is
    /// malformed, or the placement square overruns the image.
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        if !path.exists() {
            return Err(TemplateError::NotFound(path.display().to_string()));
        }
        let image = image::open(path)?.to_rgba8();

        let sidecar = path.with_extension("toml");
        let placement = if sidecar.exists() {
            let raw = std::fs::read_to_string(&sidecar).map_err(|err| TemplateError::Sidecar {
                path: sidecar.display().to_string(),
                reason: err.to_string(),
            })?;
            let meta: TemplateMeta =
                toml::from_str(&raw).map_err(|err| TemplateError::Sidecar {
                    path: sidecar.display().to_string(),
                    reason: err.to_string(),
                })?;
            tracing::info!(path = %sidecar.display(), placement = ?meta.placement, "placement sidecar loaded");
            meta.placement
        } else {
            tracing::info!(placement = ?DEFAULT_PLACEMENT, "no placement sidecar; using default");
            DEFAULT_PLACEMENT
        };

        Self::from_parts(image, placement)
    }

    /// Pair an in-memory image with a placement, validating the fit.
    pub fn from_parts(image: RgbaImage, placement: Placement) -> Result<Self, TemplateError> {
        if placement.diameter == 0 {
            return Err(TemplateError::ZeroDiameter);
        }
        let fits_x = placement.x.checked_add(placement.diameter).map(|right| right <= image.width());
        let fits_y = placement.y.checked_add(placement.diameter).map(|bottom| bottom <= image.height());
        if fits_x != Some(true) || fits_y != Some(true) {
            return Err(TemplateError::PlacementOutOfBounds {
                diameter: placement.diameter,
                x: placement.x,
                y: placement.y,
                width: image.width(),
                height: image.height(),
            });
        }
        Ok(Self { image, placement })
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}
