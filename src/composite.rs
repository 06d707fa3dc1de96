//! Preview compositing: the source image with its mask layer blended on top.
//!
//! Pure functions over bitmaps so the preview can be produced and tested
//! without any display surface.

use image::{Rgba, RgbaImage};

use crate::mask::DirtyRect;

/// Source image with `mask` drawn over it at `opacity` (0..=1).
///
/// Mask alpha is multiplied by `opacity`, then blended "source over".
/// The mask must have the same dimensions as the image.
pub fn composite(image: &RgbaImage, mask: &RgbaImage, opacity: f32) -> RgbaImage {
    let mut out = image.clone();
    let (width, height) = image.dimensions();
    composite_region(image, mask, opacity, &mut out, DirtyRect::full(width, height));
    out
}

/// Recompute only `region` of an existing composite.
///
/// Used after a daub so that a stroke costs proportional to the brush, not
/// the image.
pub fn composite_region(
    image: &RgbaImage,
    mask: &RgbaImage,
    opacity: f32,
    out: &mut RgbaImage,
    region: DirtyRect,
) {
    debug_assert_eq!(image.dimensions(), mask.dimensions());
    debug_assert_eq!(image.dimensions(), out.dimensions());

    let (width, height) = image.dimensions();
    let opacity = opacity.clamp(0.0, 1.0);
    for y in region.y0..region.y1.min(height) {
        for x in region.x0..region.x1.min(width) {
            let blended = blend(*image.get_pixel(x, y), *mask.get_pixel(x, y), opacity);
            out.put_pixel(x, y, blended);
        }
    }
}

fn blend(dst: Rgba<u8>, src: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let src_a = src.0[3] as f32 / 255.0 * opacity;
    if src_a <= 0.0 {
        return dst;
    }
    let dst_a = dst.0[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);

    let mut px = [0u8; 4];
    for c in 0..3 {
        let s = src.0[c] as f32 * src_a;
        let d = dst.0[c] as f32 * dst_a * (1.0 - src_a);
        px[c] = ((s + d) / out_a).round().clamp(0.0, 255.0) as u8;
    }
    px[3] = (out_a * 255.0).round() as u8;
    Rgba(px)
}
