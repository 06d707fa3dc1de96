use thiserror::Error;

use crate::settings::Credential;

/// Errors from a remote dataset store
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The store answered with a non-2xx status.
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("LFS transfer failed: {0}")]
    Lfs(String),

    #[error("Repository id must be owner/name: {0}")]
    InvalidRepo(String),
}

/// A file destined for the remote repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Path inside the repository, e.g. `train/IMG_1.jpg`
    pub path: String,
    pub bytes: Vec<u8>,
}

impl RemoteFile {
    pub fn new(path: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { path: path.into(), bytes }
    }
}

/// The remote dataset store the publisher talks to.
///
/// Calls are blocking; the publisher issues them strictly one after another.
pub trait RemoteStore {
    fn exists(&self, repo: &str, credential: &Credential) -> Result<bool, RemoteError>;

    fn create(&self, repo: &str, credential: &Credential) -> Result<(), RemoteError>;

    fn upload(&self, repo: &str, credential: &Credential, file: &RemoteFile) -> Result<(), RemoteError>;
}

impl<S: RemoteStore + ?Sized> RemoteStore for &S {
    fn exists(&self, repo: &str, credential: &Credential) -> Result<bool, RemoteError> {
        (**self).exists(repo, credential)
    }

    fn create(&self, repo: &str, credential: &Credential) -> Result<(), RemoteError> {
        (**self).create(repo, credential)
    }

    fn upload(&self, repo: &str, credential: &Credential, file: &RemoteFile) -> Result<(), RemoteError> {
        (**self).upload(repo, credential, file)
    }
}
