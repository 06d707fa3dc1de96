use std::ops::RangeInclusive;

use crate::settings::PaintSettings;

/// Brush radius, bounded per image.
///
/// The upper bound scales with the image's shorter side so a brush feels the
/// same size on a thumbnail as on a full-resolution photo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brush {
    size: f32,
    min: f32,
    max: f32,
}

impl Brush {
    /// Brush for a `width`x`height` image, starting at its maximum size
    pub fn for_image(width: u32, height: u32, settings: &PaintSettings) -> Self {
        let min = settings.min_brush.max(1.0);
        let shorter = width.min(height) as f32;
        let max = (shorter * settings.brush_fraction).round().max(min);
        Self { size: max, min, max }
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn range(&self) -> RangeInclusive<f32> {
        self.min..=self.max
    }

    /// Set the radius, clamped into [`Brush::range`]. Returns the applied size.
    pub fn set_size(&mut self, size: f32) -> f32 {
        self.size = if size.is_finite() { size.clamp(self.min, self.max) } else { self.max };
        self.size
    }
}

impl Default for Brush {
    fn default() -> Self {
        let settings = PaintSettings::default();
        Self {
            size: settings.min_brush,
            min: settings.min_brush,
            max: settings.min_brush,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_is_seven_percent_of_the_shorter_side() {
        let brush = Brush::for_image(800, 600, &PaintSettings::default());
        assert_eq!(brush.range(), 5.0..=42.0);
        assert_eq!(brush.size(), 42.0);
    }

    #[test]
    fn tiny_images_still_allow_the_minimum_brush() {
        let brush = Brush::for_image(20, 10, &PaintSettings::default());
        assert_eq!(brush.range(), 5.0..=5.0);
    }

    #[test]
    fn set_size_clamps() {
        let mut brush = Brush::for_image(400, 300, &PaintSettings::default());
        assert_eq!(brush.set_size(1.0), 5.0);
        assert_eq!(brush.set_size(500.0), 21.0);
        assert_eq!(brush.set_size(12.0), 12.0);
        assert_eq!(brush.set_size(f32::NAN), 21.0);
    }
}
