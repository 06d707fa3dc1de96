//! Blocking client for the Hugging Face Hub dataset API.
//!
//! Covers the three calls the publisher needs: repository lookup, repository
//! creation and single-file commits. Files the hub wants in LFS go through
//! the git-lfs batch API before the commit references them by hash.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use super::remote::{RemoteError, RemoteFile, RemoteStore};
use super::split_repo_name;
use crate::settings::Credential;

const LFS_MEDIA_TYPE: &str = "application/vnd.git-lfs+json";
const REVISION: &str = "main";
/// Bytes of each file sent to `preupload` so the hub can sniff its type
const SAMPLE_LEN: usize = 512;

/// HTTP client for one hub endpoint.
pub struct HubClient {
    client: Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct PreuploadResponse {
    files: Vec<PreuploadFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreuploadFile {
    path: String,
    upload_mode: String,
}

#[derive(Debug, Deserialize)]
struct LfsBatchResponse {
    objects: Vec<LfsObject>,
}

#[derive(Debug, Deserialize)]
struct LfsObject {
    #[serde(default)]
    actions: Option<LfsActions>,
    #[serde(default)]
    error: Option<LfsObjectError>,
}

#[derive(Debug, Deserialize)]
struct LfsActions {
    upload: Option<LfsAction>,
    verify: Option<LfsAction>,
}

#[derive(Debug, Deserialize)]
struct LfsAction {
    href: String,
    #[serde(default)]
    header: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct LfsObjectError {
    code: u16,
    message: String,
}

/// Pointer to an LFS object, as referenced from a commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LfsPointer {
    pub oid: String,
    pub size: usize,
}

impl LfsPointer {
    pub fn for_bytes(bytes: &[u8]) -> Self {
        Self {
            oid: hex::encode(Sha256::digest(bytes)),
            size: bytes.len(),
        }
    }
}

impl HubClient {
    /// Create a client for `endpoint`, e.g. `https://huggingface.co`.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .user_agent(concat!("maskup/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, endpoint))
    }

    /// Reuse an existing [`reqwest::blocking::Client`].
    pub fn with_client(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_owned(),
        }
    }

    fn api_url(&self, repo: &str, tail: &str) -> String {
        format!("{}/api/datasets/{}{}", self.endpoint, repo, tail)
    }

    /// Ask the hub whether `file` should be committed inline or through LFS
    fn wants_lfs(&self, repo: &str, credential: &Credential, file: &RemoteFile) -> Result<bool, RemoteError> {
        let sample = &file.bytes[..file.bytes.len().min(SAMPLE_LEN)];
        let body = json!({
            "files": [{
                "path": file.path,
                "size": file.bytes.len(),
                "sample": BASE64.encode(sample),
            }]
        });
        let response = self
            .client
            .post(self.api_url(repo, &format!("/preupload/{}", REVISION)))
            .bearer_auth(credential.expose())
            .json(&body)
            .send()?;
        let parsed: PreuploadResponse = parse_response(response)?;
        Ok(parsed
            .files
            .iter()
            .any(|f| f.path == file.path && f.upload_mode == "lfs"))
    }

    /// Push the object to LFS storage unless the hub already has it
    fn upload_lfs(&self, repo: &str, credential: &Credential, file: &RemoteFile, pointer: &LfsPointer) -> Result<(), RemoteError> {
        let body = json!({
            "operation": "upload",
            "transfers": ["basic"],
            "hash_algo": "sha256",
            "ref": { "name": REVISION },
            "objects": [pointer],
        });
        let response = self
            .client
            .post(format!("{}/datasets/{}.git/info/lfs/objects/batch", self.endpoint, repo))
            .bearer_auth(credential.expose())
            .header(ACCEPT, LFS_MEDIA_TYPE)
            .header(CONTENT_TYPE, LFS_MEDIA_TYPE)
            .json(&body)
            .send()?;
        let batch: LfsBatchResponse = parse_response(response)?;
        let object = batch
            .objects
            .into_iter()
            .next()
            .ok_or_else(|| RemoteError::Lfs(format!("no batch entry for {}", file.path)))?;
        if let Some(err) = object.error {
            return Err(RemoteError::Lfs(format!("{} ({})", err.message, err.code)));
        }
        let Some(actions) = object.actions else {
            log::debug!("LFS object for {} already stored", file.path);
            return Ok(());
        };

        if let Some(upload) = actions.upload {
            let mut request = self.client.put(&upload.href).body(file.bytes.clone());
            for (name, value) in &upload.header {
                request = request.header(name.as_str(), value.as_str());
            }
            ensure_success(request.send()?)?;
        }
        if let Some(verify) = actions.verify {
            let mut request = self
                .client
                .post(&verify.href)
                .bearer_auth(credential.expose())
                .header(CONTENT_TYPE, LFS_MEDIA_TYPE)
                .json(pointer);
            for (name, value) in &verify.header {
                request = request.header(name.as_str(), value.as_str());
            }
            ensure_success(request.send()?)?;
        }
        Ok(())
    }
}

impl RemoteStore for HubClient {
    fn exists(&self, repo: &str, credential: &Credential) -> Result<bool, RemoteError> {
        let response = self
            .client
            .get(self.api_url(repo, ""))
            .bearer_auth(credential.expose())
            .send()?;
        // The hub hides private repositories behind 401 as well as 404.
        match response.status().as_u16() {
            404 | 401 => Ok(false),
            _ => ensure_success(response).map(|_| true),
        }
    }

    fn create(&self, repo: &str, credential: &Credential) -> Result<(), RemoteError> {
        let response = self
            .client
            .post(format!("{}/api/repos/create", self.endpoint))
            .bearer_auth(credential.expose())
            .json(&create_body(repo)?)
            .send()?;
        ensure_success(response).map(|_| ())
    }

    fn upload(&self, repo: &str, credential: &Credential, file: &RemoteFile) -> Result<(), RemoteError> {
        let lfs = if self.wants_lfs(repo, credential, file)? {
            let pointer = LfsPointer::for_bytes(&file.bytes);
            self.upload_lfs(repo, credential, file, &pointer)?;
            Some(pointer)
        } else {
            None
        };

        let response = self
            .client
            .post(self.api_url(repo, &format!("/commit/{}", REVISION)))
            .bearer_auth(credential.expose())
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(commit_payload(file, lfs.as_ref())?)
            .send()?;
        ensure_success(response).map(|_| ())
    }
}

/// Body of `POST /api/repos/create`.
///
/// A bare name would be created under the token owner while every later
/// call addresses the bare id, so only `owner/name` is accepted.
fn create_body(repo: &str) -> Result<serde_json::Value, RemoteError> {
    let (organization, name) = split_repo_name(repo).ok_or_else(|| RemoteError::InvalidRepo(repo.to_owned()))?;
    Ok(json!({
        "type": "dataset",
        "name": name,
        "organization": organization,
    }))
}

/// NDJSON commit with a header line and one file line
fn commit_payload(file: &RemoteFile, lfs: Option<&LfsPointer>) -> Result<String, RemoteError> {
    let header = json!({
        "key": "header",
        "value": { "summary": format!("Upload {}", file.path), "description": "" },
    });
    let operation = match lfs {
        Some(pointer) => json!({
            "key": "lfsFile",
            "value": {
                "path": file.path,
                "algo": "sha256",
                "oid": pointer.oid,
                "size": pointer.size,
            },
        }),
        None => json!({
            "key": "file",
            "value": {
                "path": file.path,
                "encoding": "base64",
                "content": BASE64.encode(&file.bytes),
            },
        }),
    };
    Ok(format!(
        "{}\n{}\n",
        serde_json::to_string(&header)?,
        serde_json::to_string(&operation)?
    ))
}

fn ensure_success(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(RemoteError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

fn parse_response<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
    let response = ensure_success(response)?;
    Ok(response.json::<T>()?)
}
