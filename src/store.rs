use image::RgbaImage;
use std::collections::HashMap;
use std::sync::Arc;

use crate::export::{ExportJob, Sample};
use crate::mask::MaskLayer;
use crate::raster::{ImageId, ImageRef};

/// Prompt and committed mask for one image.
///
/// `mask` is the bitmap as of the last completed stroke. `None` means "no
/// mask", which exports the same way as an unpainted one.
#[derive(Debug, Clone, Default)]
pub struct Annotation {
    pub prompt: String,
    pub mask: Option<Arc<RgbaImage>>,
}

/// Live session state: the image collection, their paint layers and their
/// annotations.
///
/// Only the paint engine mutates masks. Export works on [`RasterStore::snapshot`].
#[derive(Debug, Default)]
pub struct RasterStore {
    images: Vec<ImageRef>,
    masks: HashMap<ImageId, MaskLayer>,
    annotations: HashMap<ImageId, Annotation>,
    generation: u64,
}

impl RasterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole project with a freshly ingested collection
    pub fn load(&mut self, images: Vec<ImageRef>) {
        self.reset();
        log::info!("Loaded {} images", images.len());
        self.images = images;
    }

    /// Drop every image, mask and annotation at once
    pub fn reset(&mut self) {
        self.images.clear();
        self.masks.clear();
        self.annotations.clear();
        self.generation += 1;
    }

    /// Bumped on every reset; lets holders of an image index detect that the
    /// collection underneath them changed
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn images(&self) -> &[ImageRef] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn image(&self, index: usize) -> Option<&ImageRef> {
        self.images.get(index)
    }

    pub fn contains(&self, id: ImageId) -> bool {
        self.images.iter().any(|img| img.id() == id)
    }

    pub fn annotation(&self, id: ImageId) -> Option<&Annotation> {
        self.annotations.get(&id)
    }

    pub fn prompt(&self, id: ImageId) -> &str {
        self.annotations.get(&id).map(|a| a.prompt.as_str()).unwrap_or("")
    }

    /// Update the prompt, keeping whatever mask is committed.
    ///
    /// Ignored for ids that are not in the collection.
    pub fn set_prompt(&mut self, id: ImageId, prompt: impl Into<String>) {
        if let Some(annotation) = self.annotation_mut(id) {
            annotation.prompt = prompt.into();
        }
    }

    /// Record `mask` as the image's exportable mask (or drop it with `None`)
    pub fn commit_mask(&mut self, id: ImageId, mask: Option<RgbaImage>) {
        if let Some(annotation) = self.annotation_mut(id) {
            annotation.mask = mask.map(Arc::new);
        }
    }

    /// Paint layer for `id`, created on first use.
    ///
    /// A new layer starts from the committed mask if there is one, otherwise
    /// transparent.
    pub fn mask_layer_mut(&mut self, id: ImageId) -> Option<&mut MaskLayer> {
        let image = self.images.iter().find(|img| img.id() == id)?;
        let committed = self.annotations.get(&id).and_then(|a| a.mask.clone());
        let layer = self.masks.entry(id).or_insert_with(|| match committed {
            Some(mask) => MaskLayer::from_pixels(id, (*mask).clone()),
            None => MaskLayer::for_image(image),
        });
        Some(layer)
    }

    pub fn mask_layer(&self, id: ImageId) -> Option<&MaskLayer> {
        self.masks.get(&id)
    }

    /// Number of images with a committed mask
    pub fn annotated_count(&self) -> usize {
        self.annotations.values().filter(|a| a.mask.is_some()).count()
    }

    /// Immutable copy of the collection for an export run.
    ///
    /// Shares the image and mask bitmaps by reference count, so later painting
    /// (which replaces committed masks rather than editing them) cannot leak
    /// into the job.
    pub fn snapshot(&self) -> ExportJob {
        let samples = self
            .images
            .iter()
            .map(|image| {
                let annotation = self.annotations.get(&image.id());
                Sample {
                    image: Arc::clone(image),
                    prompt: annotation.map(|a| a.prompt.clone()).unwrap_or_default(),
                    mask: annotation.and_then(|a| a.mask.clone()),
                }
            })
            .collect();
        ExportJob::new(samples)
    }

    fn annotation_mut(&mut self, id: ImageId) -> Option<&mut Annotation> {
        if !self.contains(id) {
            log::warn!("Ignoring annotation update for unknown image {}", id);
            return None;
        }
        Some(self.annotations.entry(id).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Image;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    fn image(name: &str, width: u32, height: u32) -> ImageRef {
        let mut bytes = Cursor::new(Vec::new());
        RgbaImage::from_pixel(width, height, Rgba([1, 2, 3, 255]))
            .write_to(&mut bytes, ImageFormat::Png)
            .unwrap();
        Image::new_ref(name, bytes.into_inner()).unwrap()
    }

    #[test]
    fn prompt_edits_keep_the_committed_mask() {
        let mut store = RasterStore::new();
        let img = image("a.png", 4, 4);
        let id = img.id();
        store.load(vec![img]);

        store.commit_mask(id, Some(RgbaImage::new(4, 4)));
        store.set_prompt(id, "a red door");

        let annotation = store.annotation(id).unwrap();
        assert_eq!(annotation.prompt, "a red door");
        assert!(annotation.mask.is_some());
        assert_eq!(store.annotated_count(), 1);
    }

    #[test]
    fn reset_clears_everything_and_bumps_generation() {
        let mut store = RasterStore::new();
        let img = image("a.png", 4, 4);
        let id = img.id();
        store.load(vec![img]);
        store.set_prompt(id, "x");
        store.mask_layer_mut(id).unwrap();
        let generation = store.generation();

        store.reset();

        assert!(store.is_empty());
        assert!(store.annotation(id).is_none());
        assert!(store.mask_layer(id).is_none());
        assert!(store.generation() > generation);
    }

    #[test]
    fn updates_for_unknown_images_are_not_retained() {
        let mut store = RasterStore::new();
        store.load(vec![image("a.png", 2, 2)]);
        let stranger = ImageId::new();

        store.set_prompt(stranger, "orphan");
        store.commit_mask(stranger, Some(RgbaImage::new(2, 2)));

        assert!(store.annotation(stranger).is_none());
        assert!(store.mask_layer_mut(stranger).is_none());
    }

    #[test]
    fn snapshot_is_isolated_from_later_commits() {
        let mut store = RasterStore::new();
        let img = image("a.png", 2, 2);
        let id = img.id();
        store.load(vec![img]);
        store.set_prompt(id, "before");

        let job = store.snapshot();
        store.set_prompt(id, "after");
        store.commit_mask(id, Some(RgbaImage::new(2, 2)));

        assert_eq!(job.samples()[0].prompt, "before");
        assert!(job.samples()[0].mask.is_none());
    }
}
