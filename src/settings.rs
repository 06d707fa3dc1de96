use egui::Color32;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_HUB_ENDPOINT: &str = "https://huggingface.co";
pub const DEFAULT_CAPTION_ENDPOINT: &str = "https://api.moondream.ai/v1/caption";
pub const DEFAULT_SPLIT_FOLDER: &str = "train";
pub const DEFAULT_ARCHIVE_NAME: &str = "maskup_dataset.zip";

/// Secret token for a remote service. Never printed, never persisted.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into().trim().to_owned())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("Credential(<empty>)")
        } else {
            f.write_str("Credential(<redacted>)")
        }
    }
}

/// Look and feel of the paint brush and the preview overlay
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PaintSettings {
    /// RGB of the paint; daubs always land on the mask at full alpha
    pub color: [u8; 3],
    /// Opacity of the mask when drawn over the image in the preview
    pub overlay_opacity: f32,
    pub min_brush: f32,
    /// Largest brush radius as a fraction of the image's shorter side
    pub brush_fraction: f32,
}

impl PaintSettings {
    pub fn paint_color(&self) -> Color32 {
        let [r, g, b] = self.color;
        Color32::from_rgb(r, g, b)
    }
}

impl Default for PaintSettings {
    fn default() -> Self {
        Self {
            color: [0xC4, 0x40, 0xDB],
            overlay_opacity: 0.5,
            min_brush: 5.0,
            brush_fraction: 0.07,
        }
    }
}

/// Everything the user can configure; persisted between runs by eframe
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)] // new fields fall back to their defaults when loading old state
pub struct Settings {
    pub paint: PaintSettings,
    pub hub_endpoint: String,
    pub caption_endpoint: String,
    /// Remote folder all samples and the metadata ledger are uploaded under
    pub split_folder: String,
    pub archive_name: String,
    /// Where downloaded archives are written
    pub output_dir: PathBuf,
    /// Last dataset name used, to save retyping
    pub dataset_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            paint: PaintSettings::default(),
            hub_endpoint: DEFAULT_HUB_ENDPOINT.to_owned(),
            caption_endpoint: DEFAULT_CAPTION_ENDPOINT.to_owned(),
            split_folder: DEFAULT_SPLIT_FOLDER.to_owned(),
            archive_name: DEFAULT_ARCHIVE_NAME.to_owned(),
            output_dir: PathBuf::from("."),
            dataset_name: String::new(),
        }
    }
}

impl Settings {
    /// Apply `MASKUP_*` environment overrides on top of stored settings
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(endpoint) = std::env::var("MASKUP_HUB_ENDPOINT") {
            log::info!("Using hub endpoint from environment: {}", endpoint);
            self.hub_endpoint = endpoint;
        }
        if let Ok(dir) = std::env::var("MASKUP_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        self
    }

    /// Archive destination: `output_dir/archive_name`
    pub fn archive_path(&self) -> PathBuf {
        self.output_dir.join(&self.archive_name)
    }
}

/// Credential from an environment variable, empty when unset
pub fn credential_from_env(var: &str) -> Credential {
    Credential::new(std::env::var(var).unwrap_or_default())
}
