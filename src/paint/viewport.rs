use egui::{Pos2, Rect, Vec2};

/// Maps pointer positions from the on-screen rect the image is drawn into
/// onto native bitmap pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    display: Rect,
    bitmap: Vec2,
}

impl Viewport {
    /// Image drawn 1:1 at the origin
    pub fn identity(width: u32, height: u32) -> Self {
        let bitmap = Vec2::new(width as f32, height as f32);
        Self {
            display: Rect::from_min_size(Pos2::ZERO, bitmap),
            bitmap,
        }
    }

    pub fn new(display: Rect, width: u32, height: u32) -> Self {
        Self {
            display,
            bitmap: Vec2::new(width as f32, height as f32),
        }
    }

    pub fn display(&self) -> Rect {
        self.display
    }

    /// Bitmap pixels per displayed point, per axis
    pub fn scale(&self) -> Vec2 {
        let size = self.display.size();
        let axis = |bitmap: f32, shown: f32| if shown > 0.0 { bitmap / shown } else { 1.0 };
        Vec2::new(axis(self.bitmap.x, size.x), axis(self.bitmap.y, size.y))
    }

    pub fn to_bitmap(&self, screen: Pos2) -> Pos2 {
        let scale = self.scale();
        let local = screen - self.display.min;
        Pos2::new(local.x * scale.x, local.y * scale.y)
    }
}
