//! Two-level mask conversion for export.

use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

pub const MASK_OFF: Rgba<u8> = Rgba([0, 0, 0, 255]);
pub const MASK_ON: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Threshold a paint layer into opaque black/white.
///
/// A pixel becomes white when any of its color channels is non-zero, black
/// otherwise. Alpha plays no part in the decision.
pub fn binarize(mask: &RgbaImage) -> RgbaImage {
    let mut out = RgbaImage::new(mask.width(), mask.height());
    for (src, dst) in mask.pixels().zip(out.pixels_mut()) {
        let [r, g, b, _] = src.0;
        *dst = if r > 0 || g > 0 || b > 0 { MASK_ON } else { MASK_OFF };
    }
    out
}

/// The mask exported for an image that was never painted: all black
pub fn empty_mask(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, MASK_OFF)
}

/// Export-ready mask for an image, synthesizing an empty one when absent
pub fn export_mask(mask: Option<&RgbaImage>, width: u32, height: u32) -> RgbaImage {
    match mask {
        Some(mask) => binarize(mask),
        None => empty_mask(width, height),
    }
}

pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}
