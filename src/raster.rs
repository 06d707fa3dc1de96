use image::{ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while turning raw file bytes into an [`Image`]
#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("Failed to read {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },
}

/// Opaque identifier handed out to every ingested image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(Uuid);

impl ImageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ImageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An ingested source image. Never mutated once created.
///
/// Keeps both the file bytes exactly as they were ingested (exported verbatim)
/// and the decoded RGBA raster used for display and mask sizing.
pub struct Image {
    id: ImageId,
    name: String,
    bytes: Arc<[u8]>,
    pixels: RgbaImage,
}

pub type ImageRef = Arc<Image>;

impl Image {
    /// Decode `bytes` and wrap them as a new image with a fresh id
    pub fn decode(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, IngestionError> {
        let name = name.into();
        let decoded = match image::load_from_memory(&bytes) {
            Ok(decoded) => decoded,
            Err(source) => return Err(IngestionError::Decode { name, source }),
        };
        log::debug!("Decoded {}: {}x{}", name, decoded.width(), decoded.height());

        Ok(Self {
            id: ImageId::new(),
            name,
            bytes: bytes.into(),
            pixels: decoded.to_rgba8(),
        })
    }

    /// Read a file from disk and decode it, naming the image after the file
    pub fn open(path: &std::path::Path) -> Result<Self, IngestionError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        match std::fs::read(path) {
            Ok(bytes) => Self::decode(name, bytes),
            Err(source) => Err(IngestionError::Read { name, source }),
        }
    }

    pub fn new_ref(name: impl Into<String>, bytes: Vec<u8>) -> Result<ImageRef, IngestionError> {
        Self::decode(name, bytes).map(Arc::new)
    }

    pub fn id(&self) -> ImageId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The original file bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
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

    /// Format sniffed from the original bytes, if the `image` crate knows it
    pub fn format(&self) -> Option<ImageFormat> {
        image::guess_format(&self.bytes).ok()
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("bytes_len", &self.bytes.len())
            .field("size", &(self.width(), self.height()))
            .finish()
    }
}

/// Whether a file name looks like something [`Image::decode`] can handle
pub fn is_image_name(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((_, ext)) => matches!(
            ext.to_ascii_lowercase().as_str(),
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp" | "tif" | "tiff"
        ),
        None => false,
    }
}
