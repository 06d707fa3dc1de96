//! Publishing an export job as a new remote dataset.
//!
//! The protocol is strictly sequential: existence check, create, then for
//! every sample its image followed by its mask, and finally the metadata
//! ledger. [`Publisher`] performs one step per `next()` call so a UI can
//! render progress without knowing the sequence.

use serde::{Deserialize, Serialize};

use super::remote::{RemoteError, RemoteFile, RemoteStore};
use super::{ExportError, ExportJob, canonical_image_name, mask_file_name, split_repo_name};
use crate::settings::Credential;

pub const METADATA_FILE: &str = "metadata.jsonl";

/// Which remote dataset to create and where inside it samples go
#[derive(Debug, Clone)]
pub struct PublishTarget {
    pub repo: String,
    pub credential: Credential,
    pub split_folder: String,
}

impl PublishTarget {
    pub fn new(repo: impl Into<String>, credential: Credential, split_folder: impl Into<String>) -> Self {
        Self {
            repo: repo.into().trim().to_owned(),
            credential,
            split_folder: split_folder.into(),
        }
    }

    /// Path of `file_name` inside the split folder
    pub fn remote_path(&self, file_name: &str) -> String {
        let folder = self.split_folder.trim_matches('/');
        if folder.is_empty() {
            file_name.to_owned()
        } else {
            format!("{}/{}", folder, file_name)
        }
    }

    fn validate(&self) -> Result<(), ExportError> {
        if self.repo.is_empty() {
            return Err(ExportError::InvalidTarget("dataset name is empty".into()));
        }
        if split_repo_name(&self.repo).is_none() {
            return Err(ExportError::InvalidTarget(format!(
                "dataset name must be owner/name, got {}",
                self.repo
            )));
        }
        if self.credential.is_empty() {
            return Err(ExportError::InvalidTarget("access token is empty".into()));
        }
        Ok(())
    }
}

/// Upload progress. `total` counts every sample plus the metadata file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

impl Progress {
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.current as f32 / self.total as f32
        }
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.current == self.total
    }
}

/// One line of `metadata.jsonl`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub file_names: [String; 2],
    pub image_file_name: String,
    pub mask_file_name: String,
    pub prompt: String,
}

impl MetadataRecord {
    pub fn new(image_file_name: String, mask_file_name: String, prompt: String) -> Self {
        Self {
            file_names: [image_file_name.clone(), mask_file_name.clone()],
            image_file_name,
            mask_file_name,
            prompt,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PublishEvent {
    /// The existence check passed and the empty dataset was created
    Created { repo: String },
    /// Image and mask of one sample are uploaded
    SampleUploaded {
        image_path: String,
        mask_path: String,
        progress: Progress,
    },
    /// The metadata ledger is uploaded; publishing is complete
    MetadataUploaded { path: String, progress: Progress },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Start,
    Sample(usize),
    Metadata,
    Done,
}

/// Step-wise publisher. Each `next()` performs exactly one protocol step.
///
/// Stops after the first error; whatever was uploaded before stays remote.
pub struct Publisher<'a, S> {
    store: S,
    target: &'a PublishTarget,
    job: &'a ExportJob,
    stage: Stage,
    ledger: String,
    progress: Progress,
}

impl<'a, S: RemoteStore> Publisher<'a, S> {
    pub fn new(store: S, target: &'a PublishTarget, job: &'a ExportJob) -> Self {
        Self {
            store,
            target,
            job,
            stage: Stage::Start,
            ledger: String::new(),
            progress: Progress {
                current: 0,
                total: job.len() + 1,
            },
        }
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    /// Metadata lines accumulated so far
    pub fn ledger(&self) -> &str {
        &self.ledger
    }

    fn step(&mut self) -> Result<Option<PublishEvent>, ExportError> {
        match self.stage {
            Stage::Start => self.create().map(Some),
            Stage::Sample(index) => self.upload_sample(index).map(Some),
            Stage::Metadata => self.upload_metadata().map(Some),
            Stage::Done => Ok(None),
        }
    }

    fn create(&mut self) -> Result<PublishEvent, ExportError> {
        self.target.validate()?;
        let repo = &self.target.repo;
        let credential = &self.target.credential;

        log::info!("Checking whether dataset {} exists", repo);
        if self.store.exists(repo, credential).map_err(|e| self.remote_error(e))? {
            log::warn!("Dataset {} already exists, not touching it", repo);
            return Err(ExportError::RemoteConflict { repo: repo.clone() });
        }

        log::info!("Creating dataset {}", repo);
        self.store.create(repo, credential).map_err(|e| self.remote_error(e))?;

        self.stage = if self.job.is_empty() {
            Stage::Metadata
        } else {
            Stage::Sample(0)
        };
        Ok(PublishEvent::Created { repo: repo.clone() })
    }

    fn upload_sample(&mut self, index: usize) -> Result<PublishEvent, ExportError> {
        let job = self.job;
        let sample = &job.samples()[index];
        let number = index + 1;
        let image_name = canonical_image_name(number, sample.image.name());
        let mask_name = mask_file_name(&image_name);

        let mask = sample.mask_png().map_err(|source| ExportError::MaskEncoding {
            name: sample.image.name().to_owned(),
            source,
        })?;
        let image_file = RemoteFile::new(self.target.remote_path(&image_name), sample.image.bytes().to_vec());
        let mask_file = RemoteFile::new(self.target.remote_path(&mask_name), mask);

        self.upload(&image_file)?;
        self.upload(&mask_file)?;

        let record = MetadataRecord::new(image_name, mask_name, sample.prompt.clone());
        let line = serde_json::to_string(&record).map_err(|e| self.remote_error(e.into()))?;
        self.ledger.push_str(&line);
        self.ledger.push('\n');

        self.progress.current = number;
        self.stage = if number < job.len() {
            Stage::Sample(number)
        } else {
            Stage::Metadata
        };
        log::info!("Uploaded sample {}/{}", number, job.len());

        Ok(PublishEvent::SampleUploaded {
            image_path: image_file.path,
            mask_path: mask_file.path,
            progress: self.progress,
        })
    }

    fn upload_metadata(&mut self) -> Result<PublishEvent, ExportError> {
        let file = RemoteFile::new(self.target.remote_path(METADATA_FILE), self.ledger.clone().into_bytes());
        self.upload(&file)?;

        self.progress.current = self.progress.total;
        self.stage = Stage::Done;
        log::info!("Published {} samples to {}", self.job.len(), self.target.repo);

        Ok(PublishEvent::MetadataUploaded {
            path: file.path,
            progress: self.progress,
        })
    }

    fn upload(&self, file: &RemoteFile) -> Result<(), ExportError> {
        log::debug!("Uploading {} ({} bytes)", file.path, file.bytes.len());
        self.store
            .upload(&self.target.repo, &self.target.credential, file)
            .map_err(|e| self.remote_error(e))
    }

    fn remote_error(&self, source: RemoteError) -> ExportError {
        log::error!("Remote call for {} failed: {}", self.target.repo, source);
        ExportError::RemoteUpload {
            repo: self.target.repo.clone(),
            source,
        }
    }
}

impl<S: RemoteStore> Iterator for Publisher<'_, S> {
    type Item = Result<PublishEvent, ExportError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.step() {
            Ok(event) => event.map(Ok),
            Err(err) => {
                self.stage = Stage::Done;
                Some(Err(err))
            }
        }
    }
}

/// Run the whole protocol, reporting every event to `on_event`
pub fn publish<S: RemoteStore>(
    store: S,
    target: &PublishTarget,
    job: &ExportJob,
    mut on_event: impl FnMut(&PublishEvent),
) -> Result<Progress, ExportError> {
    let mut publisher = Publisher::new(store, target, job);
    for event in publisher.by_ref() {
        on_event(&event?);
    }
    Ok(publisher.progress())
}
