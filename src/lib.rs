#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod binarize;
pub mod caption;
pub mod composite;
pub mod export;
pub mod file_handler;
pub mod mask;
pub mod paint;
pub mod panels;
pub mod raster;
pub mod settings;
pub mod store;
pub mod task;

pub use app::MaskUpApp;
pub use binarize::binarize;
pub use composite::composite;
pub use export::{ExportError, ExportJob, HubClient, Publisher, RemoteStore, package, publish, write_archive};
pub use mask::MaskLayer;
pub use paint::{PaintEngine, PaintError};
pub use raster::{Image, ImageId, ImageRef, IngestionError};
pub use settings::{Credential, PaintSettings, Settings};
pub use store::{Annotation, RasterStore};
