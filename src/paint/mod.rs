//! Mask painting: pointer input in, mask mutations and a live preview out.

mod brush;
mod viewport;

pub use brush::Brush;
pub use viewport::Viewport;

use egui::{Pos2, Rect};
use image::RgbaImage;
use thiserror::Error;

use crate::composite::{composite, composite_region};
use crate::raster::ImageRef;
use crate::settings::PaintSettings;
use crate::store::RasterStore;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaintError {
    #[error("No image is active")]
    NoActiveImage,

    #[error("Image index {index} is out of range ({len} images)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Where the engine is in the begin/continue/end stroke cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StrokeState {
    #[default]
    Idle,
    Painting {
        daubs: usize,
    },
}

struct ActiveImage {
    index: usize,
    image: ImageRef,
    generation: u64,
    viewport: Viewport,
    composite: RgbaImage,
    version: u64,
}

/// Turns strokes into mask edits for the active image and keeps its preview
/// composite current.
///
/// Holds no image data of its own beyond the preview; masks live in the
/// [`RasterStore`] passed to every call.
pub struct PaintEngine {
    settings: PaintSettings,
    brush: Brush,
    stroke: StrokeState,
    active: Option<ActiveImage>,
    versions: u64,
}

impl PaintEngine {
    pub fn new(settings: PaintSettings) -> Self {
        Self {
            settings,
            brush: Brush::default(),
            stroke: StrokeState::Idle,
            active: None,
            versions: 0,
        }
    }

    pub fn settings(&self) -> &PaintSettings {
        &self.settings
    }

    /// Make image `index` the paint target.
    ///
    /// A stroke still in progress on the previous image is committed first.
    /// The preview is rebuilt from the image and its mask before returning, so
    /// nothing from the previous image can be shown afterwards.
    pub fn activate(&mut self, store: &mut RasterStore, index: usize) -> Result<(), PaintError> {
        if self.is_painting() {
            // The previous image may be gone after a reset; its stroke dies with it.
            if let Err(err) = self.end_stroke(store) {
                log::debug!("Dropped unfinished stroke: {}", err);
            }
        }
        self.stroke = StrokeState::Idle;
        self.active = None;

        let image = store
            .image(index)
            .cloned()
            .ok_or(PaintError::IndexOutOfRange { index, len: store.len() })?;
        let layer = store.mask_layer_mut(image.id()).ok_or(PaintError::NoActiveImage)?;

        let preview = composite(image.pixels(), layer.pixels(), self.settings.overlay_opacity);
        self.brush = Brush::for_image(image.width(), image.height(), &self.settings);
        self.versions += 1;
        log::debug!("Activated {} ({}x{})", image.name(), image.width(), image.height());

        self.active = Some(ActiveImage {
            index,
            viewport: Viewport::identity(image.width(), image.height()),
            generation: store.generation(),
            composite: preview,
            version: self.versions,
            image,
        });
        Ok(())
    }

    /// Forget the active image, e.g. after the project was reset
    pub fn reset(&mut self) {
        self.active = None;
        self.stroke = StrokeState::Idle;
    }

    /// Tell the engine where the active image is drawn on screen
    pub fn set_display_rect(&mut self, display: Rect) {
        if let Some(active) = &mut self.active {
            active.viewport = Viewport::new(display, active.image.width(), active.image.height());
        }
    }

    /// Start a stroke and paint its first daub at `pos` (screen space)
    pub fn begin_stroke(&mut self, store: &mut RasterStore, pos: Pos2) -> Result<(), PaintError> {
        self.ensure_active(store)?;
        self.stroke = StrokeState::Painting { daubs: 0 };
        self.daub(store, pos)
    }

    /// Paint another daub if a stroke is in progress; ignored otherwise
    pub fn continue_stroke(&mut self, store: &mut RasterStore, pos: Pos2) -> Result<(), PaintError> {
        if !self.is_painting() {
            return Ok(());
        }
        self.ensure_active(store)?;
        self.daub(store, pos)
    }

    /// Finish the stroke and commit the mask to the image's annotation.
    ///
    /// Does nothing when no stroke is in progress.
    pub fn end_stroke(&mut self, store: &mut RasterStore) -> Result<(), PaintError> {
        let StrokeState::Painting { daubs } = self.stroke else {
            return Ok(());
        };
        self.stroke = StrokeState::Idle;
        self.ensure_active(store)?;

        let id = self.active_id().ok_or(PaintError::NoActiveImage)?;
        let pixels = store
            .mask_layer_mut(id)
            .ok_or(PaintError::NoActiveImage)?
            .pixels()
            .clone();
        store.commit_mask(id, Some(pixels));
        log::debug!("Committed stroke of {} daubs on image {}", daubs, id);
        Ok(())
    }

    /// Wipe the active image's mask and commit "no mask"
    pub fn clear(&mut self, store: &mut RasterStore) -> Result<(), PaintError> {
        self.stroke = StrokeState::Idle;
        self.ensure_active(store)?;
        let Some(active) = self.active.as_mut() else {
            return Err(PaintError::NoActiveImage);
        };

        let id = active.image.id();
        let layer = store.mask_layer_mut(id).ok_or(PaintError::NoActiveImage)?;
        layer.clear();
        active.composite = active.image.pixels().clone();
        self.versions += 1;
        active.version = self.versions;

        store.commit_mask(id, None);
        log::debug!("Cleared mask of image {}", id);
        Ok(())
    }

    pub fn brush(&self) -> &Brush {
        &self.brush
    }

    pub fn set_brush_size(&mut self, size: f32) -> f32 {
        self.brush.set_size(size)
    }

    pub fn stroke_state(&self) -> StrokeState {
        self.stroke
    }

    pub fn is_painting(&self) -> bool {
        matches!(self.stroke, StrokeState::Painting { .. })
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active.as_ref().map(|a| a.index)
    }

    pub fn active_image(&self) -> Option<&ImageRef> {
        self.active.as_ref().map(|a| &a.image)
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.active.as_ref().map(|a| a.viewport)
    }

    /// Current preview: the active image with its mask overlaid
    pub fn composite(&self) -> Option<&RgbaImage> {
        self.active.as_ref().map(|a| &a.composite)
    }

    /// Changes whenever [`PaintEngine::composite`] changes
    pub fn composite_version(&self) -> u64 {
        self.active.as_ref().map_or(0, |a| a.version)
    }

    fn active_id(&self) -> Option<crate::raster::ImageId> {
        self.active.as_ref().map(|a| a.image.id())
    }

    /// Drop the active image if the store no longer holds it
    fn ensure_active(&mut self, store: &RasterStore) -> Result<(), PaintError> {
        let live = match &self.active {
            Some(active) => active.generation == store.generation() && store.contains(active.image.id()),
            None => false,
        };
        if !live {
            self.reset();
            return Err(PaintError::NoActiveImage);
        }
        Ok(())
    }

    fn daub(&mut self, store: &mut RasterStore, pos: Pos2) -> Result<(), PaintError> {
        let Some(active) = self.active.as_mut() else {
            return Err(PaintError::NoActiveImage);
        };
        let layer = store
            .mask_layer_mut(active.image.id())
            .ok_or(PaintError::NoActiveImage)?;

        let center = active.viewport.to_bitmap(pos);
        let dirty = layer.daub(center, self.brush.size(), self.settings.paint_color());
        if !dirty.is_empty() {
            composite_region(
                active.image.pixels(),
                layer.pixels(),
                self.settings.overlay_opacity,
                &mut active.composite,
                dirty,
            );
            self.versions += 1;
            active.version = self.versions;
        }
        if let StrokeState::Painting { daubs } = &mut self.stroke {
            *daubs += 1;
        }
        Ok(())
    }
}
