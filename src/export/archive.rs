use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::Path;
use thiserror::Error;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::{ExportError, ExportJob, mask_file_name, prompt_file_name};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("zip: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("{first} and {second} would both be stored as {entry}; rename one of them")]
    NameClash {
        first: String,
        second: String,
        entry: String,
    },

    #[error("mask encoding failed for {name}: {source}")]
    Encode {
        name: String,
        #[source]
        source: image::ImageError,
    },
}

/// Build the dataset archive in memory.
///
/// Per sample, in job order: the original image bytes under the original
/// name, the binarized mask as `<stem>_mask.png` and the prompt as
/// `<stem>_prompt.txt`. Any failure discards the whole archive.
pub fn package(job: &ExportJob) -> Result<Vec<u8>, ExportError> {
    log::info!("Packaging {} samples", job.len());
    check_entry_names(job)?;
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for sample in job.samples() {
        let name = sample.image.name();

        zip.start_file(name, options).map_err(ArchiveError::from)?;
        zip.write_all(sample.image.bytes()).map_err(ArchiveError::from)?;

        let mask = sample.mask_png().map_err(|source| ArchiveError::Encode {
            name: name.to_owned(),
            source,
        })?;
        zip.start_file(mask_file_name(name), options).map_err(ArchiveError::from)?;
        zip.write_all(&mask).map_err(ArchiveError::from)?;

        zip.start_file(prompt_file_name(name), options).map_err(ArchiveError::from)?;
        zip.write_all(sample.prompt.as_bytes()).map_err(ArchiveError::from)?;

        log::debug!("Packed {} ({} bytes)", name, sample.image.bytes().len());
    }

    let bytes = zip.finish().map_err(ArchiveError::from)?.into_inner();
    log::info!("Archive ready ({} bytes)", bytes.len());
    Ok(bytes)
}

/// Every archive entry must be unique; `cat.jpg` and `cat.png` share a mask
/// and prompt file, and `a_mask.png` would shadow the mask of `a.png`.
fn check_entry_names(job: &ExportJob) -> Result<(), ArchiveError> {
    let mut owners: HashMap<String, &str> = HashMap::new();
    for sample in job.samples() {
        let name = sample.image.name();
        for entry in [name.to_owned(), mask_file_name(name), prompt_file_name(name)] {
            if let Some(first) = owners.get(&entry) {
                log::warn!("Archive entry {} claimed by {} and {}", entry, first, name);
                return Err(ArchiveError::NameClash {
                    first: (*first).to_owned(),
                    second: name.to_owned(),
                    entry,
                });
            }
            owners.insert(entry, name);
        }
    }
    Ok(())
}

/// Package `job` and write it to `path`.
///
/// The archive is staged next to the destination and renamed into place, so
/// `path` only ever holds a complete archive.
pub fn write_archive(job: &ExportJob, path: &Path) -> Result<u64, ExportError> {
    let bytes = package(job)?;

    let staging = path.with_extension("zip.part");
    let written = std::fs::write(&staging, &bytes).and_then(|()| std::fs::rename(&staging, path));
    if let Err(err) = written {
        // Best effort; the staging file may not exist.
        let _ = std::fs::remove_file(&staging);
        return Err(ArchiveError::from(err).into());
    }

    log::info!("Wrote {}", path.display());
    Ok(bytes.len() as u64)
}
