#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use maskup::{Image, ImageRef, RasterStore};
use std::io::Cursor;

/// Encoded bytes of a flat grey image in the format implied by `name`
pub fn encoded(name: &str, width: u32, height: u32) -> Vec<u8> {
    let format = ImageFormat::from_path(name).unwrap_or(ImageFormat::Png);
    let pixels = RgbaImage::from_pixel(width, height, Rgba([90, 120, 150, 255]));
    let img = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(pixels).to_rgb8()),
        _ => DynamicImage::ImageRgba8(pixels),
    };
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).unwrap();
    out.into_inner()
}

pub fn image(name: &str, width: u32, height: u32) -> ImageRef {
    Image::new_ref(name, encoded(name, width, height)).unwrap()
}

pub fn store(images: &[(&str, u32, u32)]) -> RasterStore {
    let mut store = RasterStore::new();
    store.load(images.iter().map(|&(name, w, h)| image(name, w, h)).collect());
    store
}
