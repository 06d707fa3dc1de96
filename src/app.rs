use egui::{ColorImage, TextureHandle, TextureOptions};
use std::path::PathBuf;

use crate::caption::{CaptionError, Captioner, MoondreamCaptioner};
use crate::export::{ExportError, HubClient, Progress, PublishEvent, PublishTarget, publish, write_archive};
use crate::file_handler::{self, FileHandler};
use crate::paint::PaintEngine;
use crate::panels;
use crate::raster::{ImageId, ImageRef};
use crate::settings::{Credential, Settings, credential_from_env};
use crate::store::RasterStore;
use crate::task::{BackgroundTask, TaskState};

/// Message shown in place of a toast
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

/// GPU copy of the paint engine's preview, tagged with the version it shows
pub(crate) struct CompositeTexture {
    pub handle: TextureHandle,
    pub version: u64,
}

pub struct MaskUpApp {
    pub(crate) settings: Settings,
    pub(crate) store: RasterStore,
    pub(crate) engine: PaintEngine,
    pub(crate) current_index: usize,
    pub(crate) hub_token: String,
    pub(crate) caption_key: Credential,
    pub(crate) texture: Option<CompositeTexture>,
    pub(crate) archive_task: Option<BackgroundTask<Result<PathBuf, ExportError>>>,
    pub(crate) publish_task: Option<BackgroundTask<Result<Progress, ExportError>>>,
    pub(crate) caption_task: Option<(ImageId, BackgroundTask<Result<String, CaptionError>>)>,
    pub(crate) notice: Option<Notice>,
    file_handler: FileHandler,
}

impl MaskUpApp {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>, paths: Vec<PathBuf>) -> Self {
        let settings = cc
            .storage
            .and_then(|storage| eframe::get_value::<Settings>(storage, eframe::APP_KEY))
            .unwrap_or_default()
            .with_env_overrides();

        let mut app = Self::with_settings(settings);
        if !paths.is_empty() {
            match file_handler::load_paths(&paths) {
                Ok(images) => app.load_images(images),
                Err(err) => app.report(Notice::Error(err.to_string())),
            }
        }
        app
    }

    fn with_settings(settings: Settings) -> Self {
        Self {
            engine: PaintEngine::new(settings.paint.clone()),
            settings,
            store: RasterStore::new(),
            current_index: 0,
            hub_token: credential_from_env("HF_TOKEN").expose().to_owned(),
            caption_key: credential_from_env("MOONDREAM_API_KEY"),
            texture: None,
            archive_task: None,
            publish_task: None,
            caption_task: None,
            notice: None,
            file_handler: FileHandler::new(),
        }
    }

    /// Replace the project with a new collection and show its first image
    pub fn load_images(&mut self, images: Vec<ImageRef>) {
        self.engine.reset();
        self.store.load(images);
        self.texture = None;
        self.go_to(0);
    }

    /// Drop every image and annotation
    pub fn reset_project(&mut self) {
        log::info!("Starting a new project");
        self.engine.reset();
        self.store.reset();
        self.texture = None;
        self.current_index = 0;
        self.caption_task = None;
    }

    pub fn go_to(&mut self, index: usize) {
        if self.store.is_empty() {
            return;
        }
        let index = index.min(self.store.len() - 1);
        match self.engine.activate(&mut self.store, index) {
            Ok(()) => self.current_index = index,
            Err(err) => self.report(Notice::Error(err.to_string())),
        }
    }

    pub fn current_image(&self) -> Option<&ImageRef> {
        self.store.image(self.current_index)
    }

    pub(crate) fn is_exporting_archive(&self) -> bool {
        self.archive_task.is_some()
    }

    pub(crate) fn is_publishing(&self) -> bool {
        self.publish_task.is_some()
    }

    pub(crate) fn is_captioning(&self) -> bool {
        self.caption_task.is_some()
    }

    pub(crate) fn report(&mut self, notice: Notice) {
        match &notice {
            Notice::Success(msg) => log::info!("{}", msg),
            Notice::Error(msg) => log::error!("{}", msg),
        }
        self.notice = Some(notice);
    }

    pub(crate) fn start_archive_export(&mut self, ctx: &egui::Context) {
        if self.is_exporting_archive() || self.store.is_empty() {
            return;
        }
        let job = self.store.snapshot();
        let path = self.settings.archive_path();
        self.archive_task = Some(BackgroundTask::spawn("archive-export", ctx.clone(), move |_| {
            write_archive(&job, &path).map(|_| path)
        }));
    }

    pub(crate) fn start_publish(&mut self, ctx: &egui::Context) {
        if self.is_publishing() || self.store.is_empty() {
            return;
        }
        let job = self.store.snapshot();
        let target = PublishTarget::new(
            self.settings.dataset_name.clone(),
            Credential::new(self.hub_token.clone()),
            self.settings.split_folder.clone(),
        );
        let endpoint = self.settings.hub_endpoint.clone();

        self.publish_task = Some(BackgroundTask::spawn("hub-publish", ctx.clone(), move |progress| {
            progress.set(Progress {
                current: 0,
                total: job.len() + 1,
            });
            let hub = HubClient::new(endpoint).map_err(|source| ExportError::RemoteUpload {
                repo: target.repo.clone(),
                source,
            })?;
            publish(&hub, &target, &job, |event| match event {
                PublishEvent::SampleUploaded { progress: p, .. }
                | PublishEvent::MetadataUploaded { progress: p, .. } => progress.set(*p),
                PublishEvent::Created { .. } => {}
            })
        }));
    }

    pub(crate) fn start_caption(&mut self, ctx: &egui::Context) {
        if self.is_captioning() {
            return;
        }
        let Some(image) = self.current_image() else {
            return;
        };
        let id = image.id();
        let bytes = image.bytes().to_vec();
        let endpoint = self.settings.caption_endpoint.clone();
        let key = self.caption_key.clone();

        let task = BackgroundTask::spawn("caption", ctx.clone(), move |_| {
            MoondreamCaptioner::new(endpoint, key)?.caption(&bytes)
        });
        self.caption_task = Some((id, task));
    }

    /// Pick up finished background work
    fn poll_tasks(&mut self) {
        if let Some(task) = &mut self.archive_task {
            match task.poll() {
                TaskState::Running => {}
                TaskState::Finished(result) => {
                    self.archive_task = None;
                    match result {
                        Ok(path) => self.report(Notice::Success(format!(
                            "Dataset downloaded successfully to {}",
                            path.display()
                        ))),
                        Err(err) => self.report(Notice::Error(err.to_string())),
                    }
                }
                TaskState::Lost => {
                    self.archive_task = None;
                    self.report(Notice::Error("Archive export stopped unexpectedly".into()));
                }
            }
        }

        if let Some(task) = &mut self.publish_task {
            match task.poll() {
                TaskState::Running => {}
                TaskState::Finished(result) => {
                    self.publish_task = None;
                    match result {
                        Ok(_) => self.report(Notice::Success("Dataset uploaded successfully!".into())),
                        Err(err) => self.report(Notice::Error(err.to_string())),
                    }
                }
                TaskState::Lost => {
                    self.publish_task = None;
                    self.report(Notice::Error("Upload stopped unexpectedly".into()));
                }
            }
        }

        if let Some((id, task)) = &mut self.caption_task {
            let id = *id;
            match task.poll() {
                TaskState::Running => {}
                TaskState::Finished(result) => {
                    self.caption_task = None;
                    match result {
                        Ok(caption) => self.store.set_prompt(id, caption),
                        Err(err) => self.report(Notice::Error(format!(
                            "Failed to generate caption: {}",
                            err
                        ))),
                    }
                }
                TaskState::Lost => {
                    self.caption_task = None;
                    self.report(Notice::Error("Failed to generate caption".into()));
                }
            }
        }
    }

    /// Upload the engine's preview if it changed since the last frame
    pub(crate) fn sync_texture(&mut self, ctx: &egui::Context) -> Option<egui::TextureId> {
        let composite = self.engine.composite()?;
        let version = self.engine.composite_version();

        let stale = self.texture.as_ref().is_none_or(|t| t.version != version);
        if stale {
            let size = [composite.width() as usize, composite.height() as usize];
            let image = ColorImage::from_rgba_unmultiplied(size, composite.as_raw());
            if let Some(texture) = &mut self.texture {
                texture.handle.set(image, TextureOptions::LINEAR);
                texture.version = version;
            } else {
                self.texture = Some(CompositeTexture {
                    handle: ctx.load_texture("mask-composite", image, TextureOptions::LINEAR),
                    version,
                });
            }
        }
        self.texture.as_ref().map(|t| t.handle.id())
    }
}

impl eframe::App for MaskUpApp {
    /// Called by the frame work to save settings before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, &self.settings);
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_tasks();

        if self.file_handler.check_for_dropped_files(ctx) {
            match self.file_handler.take_dropped_images() {
                Ok(images) if !images.is_empty() => self.load_images(images),
                Ok(_) => self.report(Notice::Error("No images in the dropped files".into())),
                Err(err) => self.report(Notice::Error(err.to_string())),
            }
        }

        panels::export_panel(self, ctx);
        panels::canvas_panel(self, ctx);

        if self.is_exporting_archive() || self.is_publishing() {
            // Keep the progress bar moving while workers run.
            ctx.request_repaint_after(std::time::Duration::from_millis(200));
        }
    }
}
