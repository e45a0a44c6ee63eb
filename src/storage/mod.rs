//! Remote object storage for finished recordings

pub mod credentials;
pub mod drive;

use async_trait::async_trait;
use std::path::Path;

use crate::error::{RecorderError, Result};

pub use credentials::DriveCredentials;
pub use drive::GoogleDrive;

/// Metadata sent along with an uploaded recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadMetadata {
    pub name: String,
    pub description: String,
    pub parent_folder: Option<String>,
    pub mime_type: String,
}

/// A file that now exists in remote storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub id: String,
    pub name: String,
    pub link: String,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload the local file; the local file is left untouched
    async fn upload(&self, path: &Path, metadata: &UploadMetadata) -> Result<StoredObject>;

    /// Let anyone holding the link read the object (no write access)
    async fn share_publicly(&self, remote_id: &str) -> Result<()>;
}

/// Stand-in used when credentials could not be loaded at startup
///
/// Recording still works; every upload fails and the local file is kept.
pub struct UnavailableStorage {
    reason: String,
}

impl UnavailableStorage {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ObjectStorage for UnavailableStorage {
    async fn upload(&self, _path: &Path, _metadata: &UploadMetadata) -> Result<StoredObject> {
        Err(RecorderError::Credential(self.reason.clone()))
    }

    async fn share_publicly(&self, _remote_id: &str) -> Result<()> {
        Err(RecorderError::Credential(self.reason.clone()))
    }
}

/// MIME type for a recording file name, by extension
pub fn mime_type_for(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("ogg") => "audio/ogg",
        Some("m4a") => "audio/mp4",
        Some("flac") => "audio/flac",
        _ => "application/octet-stream",
    }
}
