//! Dataset export: a snapshot of the session turned into an archive or a
//! published remote dataset.

pub mod archive;
pub mod hub;
pub mod publish;
pub mod remote;

pub use archive::{ArchiveError, package, write_archive};
pub use hub::HubClient;
pub use publish::{MetadataRecord, Progress, PublishEvent, PublishTarget, Publisher, publish};
pub use remote::{RemoteError, RemoteFile, RemoteStore};

use image::RgbaImage;
use std::sync::Arc;
use thiserror::Error;

use crate::binarize::{encode_png, export_mask};
use crate::raster::ImageRef;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Error creating ZIP file: {0}")]
    ArchiveAssembly(#[from] ArchiveError),

    #[error("Dataset {repo} already exists. Refusing to modify it.")]
    RemoteConflict { repo: String },

    #[error("Error uploading to {repo}: {source}")]
    RemoteUpload {
        repo: String,
        #[source]
        source: RemoteError,
    },

    #[error("Failed to encode mask for {name}: {source}")]
    MaskEncoding {
        name: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Invalid export target: {0}")]
    InvalidTarget(String),
}

/// One image with its prompt and committed mask, as frozen at export start
#[derive(Debug, Clone)]
pub struct Sample {
    pub image: ImageRef,
    pub prompt: String,
    pub mask: Option<Arc<RgbaImage>>,
}

impl Sample {
    /// Binarized mask as PNG bytes; all black when the image was never painted
    pub fn mask_png(&self) -> Result<Vec<u8>, image::ImageError> {
        let mask = export_mask(self.mask.as_deref(), self.image.width(), self.image.height());
        encode_png(&mask)
    }
}

/// Immutable, ordered set of samples an export works from
#[derive(Debug, Clone, Default)]
pub struct ExportJob {
    samples: Vec<Sample>,
}

impl ExportJob {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Split `name` into stem and extension (including the dot).
///
/// The extension starts at the last `.`; names without one have none.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(dot) if !name[dot + 1..].contains('/') => name.split_at(dot),
        _ => (name, ""),
    }
}

/// `photo.jpg` -> `photo_mask.png`
pub fn mask_file_name(name: &str) -> String {
    format!("{}_mask.png", split_extension(name).0)
}

/// `photo.jpg` -> `photo_prompt.txt`
pub fn prompt_file_name(name: &str) -> String {
    format!("{}_prompt.txt", split_extension(name).0)
}

/// Canonical remote name for the `index`-th sample (1-based): `IMG_3.jpg`
pub fn canonical_image_name(index: usize, original: &str) -> String {
    format!("IMG_{}{}", index, split_extension(original).1)
}

/// Split a dataset id into `(namespace, name)`.
///
/// Only `owner/name` with both parts non-empty is accepted.
pub fn split_repo_name(repo: &str) -> Option<(&str, &str)> {
    let (namespace, name) = repo.split_once('/')?;
    if namespace.is_empty() || name.is_empty() || name.contains('/') {
        return None;
    }
    Some((namespace, name))
}
