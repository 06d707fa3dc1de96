use egui::{Color32, Pos2};
use image::{Rgba, RgbaImage};

use crate::raster::{Image, ImageId};

/// Inclusive-exclusive pixel rectangle touched by a mask mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl DirtyRect {
    pub fn full(width: u32, height: u32) -> Self {
        Self { x0: 0, y0: 0, x1: width, y1: height }
    }

    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }
}

/// Per-image paint layer, same size as its image.
///
/// Starts fully transparent. Daubs are written at full alpha; the overlay
/// opacity is only applied when compositing the preview.
#[derive(Debug, Clone)]
pub struct MaskLayer {
    image_id: ImageId,
    pixels: RgbaImage,
}

impl MaskLayer {
    /// Empty (transparent) layer sized to `image`
    pub fn for_image(image: &Image) -> Self {
        Self {
            image_id: image.id(),
            pixels: RgbaImage::new(image.width(), image.height()),
        }
    }

    /// Layer seeded from a previously committed mask bitmap
    pub fn from_pixels(image_id: ImageId, pixels: RgbaImage) -> Self {
        Self { image_id, pixels }
    }

    pub fn image_id(&self) -> ImageId {
        self.image_id
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Fill a disc of `radius` around `center` (bitmap space) with `color`.
    ///
    /// A pixel is covered when its center lies inside the disc. Returns the
    /// rectangle of pixels that may have changed; it is empty when the disc
    /// falls entirely outside the bitmap.
    pub fn daub(&mut self, center: Pos2, radius: f32, color: Color32) -> DirtyRect {
        let (width, height) = self.pixels.dimensions();
        let radius = radius.max(0.0);
        let clamp_x = |v: f32| v.clamp(0.0, width as f32) as u32;
        let clamp_y = |v: f32| v.clamp(0.0, height as f32) as u32;
        let dirty = DirtyRect {
            x0: clamp_x((center.x - radius).floor()),
            y0: clamp_y((center.y - radius).floor()),
            x1: clamp_x((center.x + radius).ceil() + 1.0),
            y1: clamp_y((center.y + radius).ceil() + 1.0),
        };
        if dirty.is_empty() {
            return dirty;
        }

        let paint = Rgba([color.r(), color.g(), color.b(), 255]);
        let r2 = radius * radius;
        for y in dirty.y0..dirty.y1 {
            let dy = y as f32 + 0.5 - center.y;
            for x in dirty.x0..dirty.x1 {
                let dx = x as f32 + 0.5 - center.x;
                if dx * dx + dy * dy <= r2 {
                    self.pixels.put_pixel(x, y, paint);
                }
            }
        }
        dirty
    }

    /// Wipe every painted pixel back to transparent
    pub fn clear(&mut self) {
        for px in self.pixels.pixels_mut() {
            *px = Rgba([0, 0, 0, 0]);
        }
    }

    /// True when nothing has been painted (every pixel fully transparent)
    pub fn is_blank(&self) -> bool {
        self.pixels.pixels().all(|px| px.0[3] == 0)
    }
}
