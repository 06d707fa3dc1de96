mod common;

use egui::Pos2;
use maskup::binarize::{MASK_OFF, MASK_ON};
use maskup::export::{
    MetadataRecord, Progress, PublishEvent, PublishTarget, RemoteError, RemoteFile, publish::METADATA_FILE,
};
use maskup::settings::Credential;
use maskup::{ExportError, ExportJob, PaintEngine, PaintSettings, Publisher, RemoteStore, publish};
use std::cell::RefCell;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Exists(String),
    Create(String),
    Upload(String),
}

/// In-memory store that records every call in order
#[derive(Default)]
struct RecordingStore {
    already_exists: bool,
    /// Zero-based index of the upload that fails
    fail_upload: Option<usize>,
    calls: RefCell<Vec<Call>>,
    files: RefCell<Vec<RemoteFile>>,
}

impl RecordingStore {
    fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn uploaded(&self, path: &str) -> Vec<u8> {
        self.files
            .borrow()
            .iter()
            .find(|f| f.path == path)
            .map(|f| f.bytes.clone())
            .unwrap_or_else(|| panic!("{} was not uploaded", path))
    }
}

impl RemoteStore for RecordingStore {
    fn exists(&self, repo: &str, credential: &Credential) -> Result<bool, RemoteError> {
        assert_eq!(credential.expose(), "hf_secret");
        self.calls.borrow_mut().push(Call::Exists(repo.to_owned()));
        Ok(self.already_exists)
    }

    fn create(&self, repo: &str, _credential: &Credential) -> Result<(), RemoteError> {
        self.calls.borrow_mut().push(Call::Create(repo.to_owned()));
        Ok(())
    }

    fn upload(&self, _repo: &str, _credential: &Credential, file: &RemoteFile) -> Result<(), RemoteError> {
        let attempt = self.files.borrow().len();
        self.calls.borrow_mut().push(Call::Upload(file.path.clone()));
        if self.fail_upload == Some(attempt) {
            return Err(RemoteError::Api {
                status: 500,
                body: "internal error".into(),
            });
        }
        self.files.borrow_mut().push(file.clone());
        Ok(())
    }
}

fn target() -> PublishTarget {
    PublishTarget::new("me/masks", Credential::new("hf_secret"), "train")
}

/// Two images, the second one painted and captioned
fn job() -> ExportJob {
    let mut store = common::store(&[("cat.jpg", 40, 30), ("dog.png", 80, 60)]);
    let dog = store.image(1).unwrap().id();
    store.set_prompt(dog, "a dog");

    let mut engine = PaintEngine::new(PaintSettings::default());
    engine.activate(&mut store, 1).unwrap();
    engine.begin_stroke(&mut store, Pos2::new(40.0, 30.0)).unwrap();
    engine.end_stroke(&mut store).unwrap();
    store.snapshot()
}

fn upload(path: &str) -> Call {
    Call::Upload(path.to_owned())
}

#[test]
fn existing_dataset_is_left_untouched() {
    let store = RecordingStore {
        already_exists: true,
        ..Default::default()
    };

    let err = publish(&store, &target(), &job(), |_| {}).unwrap_err();

    assert!(matches!(err, ExportError::RemoteConflict { ref repo } if repo == "me/masks"));
    assert_eq!(store.calls(), [Call::Exists("me/masks".into())]);
}

#[test]
fn uploads_follow_the_protocol_order() {
    let store = RecordingStore::default();
    let mut events = Vec::new();

    let progress = publish(&store, &target(), &job(), |e| events.push(e.clone())).unwrap();

    assert_eq!(
        store.calls(),
        [
            Call::Exists("me/masks".into()),
            Call::Create("me/masks".into()),
            upload("train/IMG_1.jpg"),
            upload("train/IMG_1_mask.png"),
            upload("train/IMG_2.png"),
            upload("train/IMG_2_mask.png"),
            upload("train/metadata.jsonl"),
        ]
    );
    assert_eq!(progress, Progress { current: 3, total: 3 });
    assert!(progress.is_complete());

    let steps: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            PublishEvent::SampleUploaded { progress, .. } | PublishEvent::MetadataUploaded { progress, .. } => {
                Some(progress.current)
            }
            PublishEvent::Created { .. } => None,
        })
        .collect();
    assert_eq!(steps, [1, 2, 3]);
    assert_eq!(events.first(), Some(&PublishEvent::Created { repo: "me/masks".into() }));
}

#[test]
fn uploaded_files_carry_the_images_masks_and_ledger() {
    let store = RecordingStore::default();
    let job = job();
    publish(&store, &target(), &job, |_| {}).unwrap();

    assert_eq!(store.uploaded("train/IMG_1.jpg"), job.samples()[0].image.bytes());
    assert_eq!(store.uploaded("train/IMG_2.png"), job.samples()[1].image.bytes());

    let blank = image::load_from_memory(&store.uploaded("train/IMG_1_mask.png")).unwrap().to_rgba8();
    assert_eq!(blank.dimensions(), (40, 30));
    assert!(blank.pixels().all(|px| *px == MASK_OFF));

    let painted = image::load_from_memory(&store.uploaded("train/IMG_2_mask.png")).unwrap().to_rgba8();
    assert_eq!(*painted.get_pixel(40, 30), MASK_ON);
    assert_eq!(*painted.get_pixel(0, 0), MASK_OFF);

    let ledger = String::from_utf8(store.uploaded(&format!("train/{}", METADATA_FILE))).unwrap();
    let records: Vec<MetadataRecord> = ledger
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(
        records,
        [
            MetadataRecord::new("IMG_1.jpg".into(), "IMG_1_mask.png".into(), String::new()),
            MetadataRecord::new("IMG_2.png".into(), "IMG_2_mask.png".into(), "a dog".into()),
        ]
    );
    assert!(ledger.ends_with('\n'));
}

#[test]
fn failed_upload_stops_without_rollback() {
    let store = RecordingStore {
        // Third upload: the second sample's image
        fail_upload: Some(2),
        ..Default::default()
    };
    let target = target();
    let job = job();
    let mut publisher = Publisher::new(&store, &target, &job);

    assert!(matches!(publisher.next(), Some(Ok(PublishEvent::Created { .. }))));
    assert!(matches!(publisher.next(), Some(Ok(PublishEvent::SampleUploaded { .. }))));
    let err = publisher.next().unwrap().unwrap_err();
    assert!(matches!(
        err,
        ExportError::RemoteUpload {
            source: RemoteError::Api { status: 500, .. },
            ..
        }
    ));
    assert!(publisher.next().is_none());

    assert_eq!(publisher.progress(), Progress { current: 1, total: 3 });
    assert_eq!(publisher.ledger().lines().count(), 1);
    assert_eq!(store.calls().last(), Some(&upload("train/IMG_2.png")));
    assert_eq!(store.files.borrow().len(), 2, "earlier uploads stay remote");
}

#[test]
fn incomplete_target_makes_no_remote_calls() {
    let store = RecordingStore::default();

    let nameless = PublishTarget::new("  ", Credential::new("hf_secret"), "train");
    let err = publish(&store, &nameless, &job(), |_| {}).unwrap_err();
    assert!(matches!(err, ExportError::InvalidTarget(_)));

    let tokenless = PublishTarget::new("me/masks", Credential::new(""), "train");
    let err = publish(&store, &tokenless, &job(), |_| {}).unwrap_err();
    assert!(matches!(err, ExportError::InvalidTarget(_)));

    assert!(store.calls().is_empty());
}

#[test]
fn dataset_name_without_owner_makes_no_remote_calls() {
    let store = RecordingStore::default();

    for repo in ["masks", "me/", "/masks", "me/masks/extra"] {
        let target = PublishTarget::new(repo, Credential::new("hf_secret"), "train");
        let err = publish(&store, &target, &job(), |_| {}).unwrap_err();
        assert!(matches!(err, ExportError::InvalidTarget(_)), "{}", repo);
    }

    assert!(store.calls().is_empty());
}

#[test]
fn empty_collection_publishes_an_empty_ledger() {
    let store = RecordingStore::default();

    let progress = publish(&store, &target(), &ExportJob::default(), |_| {}).unwrap();

    assert_eq!(progress, Progress { current: 1, total: 1 });
    assert_eq!(store.calls().last(), Some(&upload("train/metadata.jsonl")));
    assert!(store.uploaded("train/metadata.jsonl").is_empty());
}
