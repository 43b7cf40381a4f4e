//! Circular-cutout compositing.
//!
//! The pipeline is a single deterministic transform: crop the chosen
//! region out of the photo, stretch it to the placement diameter, mask
//! it to a circle, and source-over blend it onto a copy of the
//! template.

use crate::template::Template;
use crate::types::CropRect;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgba, RgbaImage};
use imageproc::drawing::draw_filled_ellipse_mut;
use std::io::Cursor;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompositorError {
    #[error("crop rectangle {width}x{height} has zero area")]
    EmptyCrop { width: u32, height: u32 },
    #[error("PNG encoding failed: {0}")]
    Encode(image::ImageError),
}

/// Extract `rect` from `image`, producing exactly `rect.width` ×
/// `rect.height` pixels.
///
/// The rectangle may extend beyond the source in any direction: the
/// intersection is copied and everything outside the source is left
/// fully transparent. Zero-area rectangles are rejected.
pub fn crop(image: &RgbaImage, rect: CropRect) -> Result<RgbaImage, CompositorError> {
    if rect.width == 0 || rect.height == 0 {
        return Err(CompositorError::EmptyCrop {
            width: rect.width,
            height: rect.height,
        });
    }

    let mut out = RgbaImage::new(rect.width, rect.height);

    let src_x0 = rect.x.max(0);
    let src_y0 = rect.y.max(0);
    let src_x1 = rect.x.saturating_add(rect.width as i64).min(image.width() as i64);
    let src_y1 = rect.y.saturating_add(rect.height as i64).min(image.height() as i64);

    for sy in src_y0..src_y1 {
        for sx in src_x0..src_x1 {
            let dx = (sx - rect.x) as u32;
            let dy = (sy - rect.y) as u32;
            out.put_pixel(dx, dy, *image.get_pixel(sx as u32, sy as u32));
        }
    }

    Ok(out)
}

/// Stretch `image` to `size` × `size` (aspect ratio is not preserved)
/// and zero the alpha of every pixel outside the inscribed circle.
pub fn circular_cutout(image: &RgbaImage, size: u32) -> RgbaImage {
    let stretched = imageops::resize(image, size, size, FilterType::Triangle);
    let mask = circle_mask(size);

    let mut out = RgbaImage::new(size, size);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let Luma([coverage]) = *mask.get_pixel(x, y);
        let src = stretched.get_pixel(x, y);
        let alpha = (src[3] as u16 * coverage as u16 / 255) as u8;
        *pixel = Rgba([src[0], src[1], src[2], alpha]);
    }
    out
}

/// 8-bit coverage mask: 255 inside the circle inscribed in a
/// `size` × `size` square, 0 outside.
fn circle_mask(size: u32) -> GrayImage {
    let mut mask = GrayImage::new(size, size);
    let center = (size / 2) as i32;
    let radius = (size / 2) as i32;
    draw_filled_ellipse_mut(&mut mask, (center, center), radius, radius, Luma([255u8]));
    mask
}

/// Source-over blend `overlay` onto a copy of `background` at
/// (`x`, `y`). The passed background is never mutated.
pub fn composite(background: &RgbaImage, overlay: &RgbaImage, x: i64, y: i64) -> RgbaImage {
    let mut out = background.clone();
    imageops::overlay(&mut out, overlay, x, y);
    out
}

/// Encode an RGBA buffer as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, CompositorError> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(CompositorError::Encode)?;
    Ok(buf)
}

/// End-to-end pipeline: crop `photo` to `rect`, cut out a circle at the
/// template's placement diameter, paste it at the placement offset, and
/// encode the result as PNG. Output dimensions equal the template's.
pub fn render(
    photo: &DynamicImage,
    rect: CropRect,
    template: &Template,
) -> Result<Vec<u8>, CompositorError> {
    let source = photo.to_rgba8();
    let face = crop(&source, rect)?;

    let placement = template.placement();
    let cutout = circular_cutout(&face, placement.diameter);
    let output = composite(
        template.image(),
        &cutout,
        placement.x as i64,
        placement.y as i64,
    );

    tracing::debug!(
        width = output.width(),
        height = output.height(),
        diameter = placement.diameter,
        "composite rendered"
    );

    encode_png(&output)
}
