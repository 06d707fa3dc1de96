use std::path::PathBuf;
use std::sync::Arc;

use crate::raster::{Image, ImageRef, IngestionError, is_image_name};

/// Turns dropped files and command-line paths into decoded images
#[derive(Default)]
pub struct FileHandler {
    dropped_files: Vec<egui::DroppedFile>,
}

impl FileHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect newly dropped files from the UI context.
    /// Returns true if any arrived this frame.
    pub fn check_for_dropped_files(&mut self, ctx: &egui::Context) -> bool {
        let mut new_dropped_files = false;

        ctx.input(|i| {
            if !i.raw.dropped_files.is_empty() {
                self.dropped_files = i.raw.dropped_files.clone();
                new_dropped_files = true;
            }
        });

        new_dropped_files
    }

    /// Decode the pending drop. Non-image files are skipped; the first
    /// undecodable image fails the whole batch.
    pub fn take_dropped_images(&mut self) -> Result<Vec<ImageRef>, IngestionError> {
        let files = std::mem::take(&mut self.dropped_files);
        let mut images = Vec::new();

        for file in files {
            if !is_image_file(&file) {
                log::warn!("Dropped file is not a supported type: {}", display_name(&file));
                continue;
            }
            let image = if let Some(bytes) = &file.bytes {
                log::info!("Processing image from memory: {} ({} bytes)", file.name, bytes.len());
                Image::decode(display_name(&file), bytes.to_vec())?
            } else if let Some(path) = &file.path {
                log::info!("Processing image from path: {}", path.display());
                Image::open(path)?
            } else {
                log::warn!("Dropped file has no accessible data: {}", display_name(&file));
                continue;
            };
            images.push(Arc::new(image));
        }

        Ok(images)
    }
}

/// Load images named on the command line, skipping non-images
pub fn load_paths(paths: &[PathBuf]) -> Result<Vec<ImageRef>, IngestionError> {
    paths
        .iter()
        .filter(|path| {
            let keep = is_image_name(&path.to_string_lossy());
            if !keep {
                log::warn!("Skipping non-image file: {}", path.display());
            }
            keep
        })
        .map(|path| Image::open(path).map(Arc::new))
        .collect()
}

/// Check if a file is an image based on MIME type or extension
fn is_image_file(file: &egui::DroppedFile) -> bool {
    if !file.mime.is_empty() {
        file.mime.starts_with("image/")
    } else if let Some(path) = &file.path {
        is_image_name(&path.to_string_lossy())
    } else {
        is_image_name(&file.name)
    }
}

fn display_name(file: &egui::DroppedFile) -> String {
    if !file.name.is_empty() {
        file.name.clone()
    } else if let Some(name) = file.path.as_ref().and_then(|p| p.file_name()) {
        name.to_string_lossy().into_owned()
    } else {
        "unknown".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_type_wins_over_extension() {
        let file = egui::DroppedFile {
            name: "photo.txt".into(),
            mime: "image/png".into(),
            ..Default::default()
        };
        assert!(is_image_file(&file));
    }

    #[test]
    fn dropped_bytes_without_mime_are_judged_by_name() {
        let file = egui::DroppedFile {
            name: "notes.md".into(),
            bytes: Some(Arc::from(b"# hi".to_vec())),
            ..Default::default()
        };
        assert!(!is_image_file(&file));

        let mut handler = FileHandler::new();
        handler.dropped_files = vec![file];
        assert!(handler.take_dropped_images().unwrap().is_empty());
    }

    #[test]
    fn missing_command_line_file_is_an_ingestion_error() {
        let err = load_paths(&[PathBuf::from("/definitely/not/here.png")]).unwrap_err();
        assert!(matches!(err, IngestionError::Read { .. }));
    }
}
